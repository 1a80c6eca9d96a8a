use std::net::SocketAddr;
use std::path::PathBuf;

/// A token that could not be turned into an address, count or register value.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("'{0}' is not a valid register address")]
    Address(String),

    #[error("'{0}' is not a valid count")]
    Count(String),

    #[error("'{token}' is not a valid {kind} value")]
    Value { token: String, kind: &'static str },

    #[error("malformed value list '{0}'")]
    ValueList(String),

    #[error("value {0} does not fit in a 16-bit register")]
    OutOfRange(i64),

    #[error("character '{0}' cannot be packed into a register byte")]
    Character(char),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("connection to {addr} timed out after {secs} seconds")]
    ConnectTimeout { addr: SocketAddr, secs: u64 },

    #[error("operation '{operation}' timed out after {secs} seconds")]
    Timeout { operation: String, secs: u64 },

    #[error("Modbus exception: {0}")]
    Exception(String),

    #[error("failed to {operation}: {source}")]
    Modbus {
        operation: String,
        #[source]
        source: tokio_modbus::Error,
    },

    #[error("{what} {value} is out of range for a Modbus request")]
    OutOfRange { what: &'static str, value: usize },
}

/// Everything a single command can fail with. Rendered once, at the
/// interpreter boundary, and never propagated past it.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Invalid arguments. Usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("No IP address specified. Use the IPAddress command.")]
    NotConnected,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("cannot access tag file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unrecognized command '{0}'. Enter Help for a list of commands.")]
    Unrecognized(String),
}
