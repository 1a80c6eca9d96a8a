use clap::Parser;

use crate::client::TcpConnector;

/// CLI entry point
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Interactive and batch Modbus TCP holding register client",
    after_help = "EXAMPLES:\n    mbtcp 192.168.1.10 read 23496\n    mbtcp 192.168.1.10 read 23496F 2\n    mbtcp 192.168.1.10 write 100S [-1,5]\n    mbtcp 192.168.1.10 readtagfile tags.txt values.txt\n    mbtcp 192.168.1.10\n    mbtcp"
)]
pub struct Cli {
    /// Modbus TCP server port
    #[arg(long, env = "MBTCP_PORT", default_value_t = 502, display_order = 1)]
    pub port: u16,

    /// Modbus slave / unit ID
    #[arg(long, env = "MBTCP_UNIT", default_value_t = 1, display_order = 2)]
    pub unit: u8,

    /// Timeout for connections and operations in seconds
    #[arg(long, env = "MBTCP_TIMEOUT", default_value_t = 5, value_parser = validate_timeout, display_order = 3)]
    pub timeout: u64,

    /// Verbose (debug) logging on stderr
    #[arg(long, short, display_order = 4)]
    pub verbose: bool,

    /// [IP address] [command [arguments...]]; no command starts the console
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

impl Cli {
    pub fn connector(&self) -> TcpConnector {
        TcpConnector {
            port: self.port,
            unit: self.unit,
            timeout_secs: self.timeout,
        }
    }

    /// Splits the positional words into an optional leading address and the
    /// command words that follow it.
    pub fn address_and_command(&self) -> (Option<&str>, &[String]) {
        match self.args.split_first() {
            Some((first, rest)) if is_ip_address(first) => (Some(first.as_str()), rest),
            _ => (None, &self.args),
        }
    }
}

/// Anything with exactly four dot-separated parts counts as an address.
pub fn is_ip_address(value: &str) -> bool {
    value.split('.').count() == 4
}

fn validate_timeout(s: &str) -> Result<u64, String> {
    let secs: u64 = s
        .parse()
        .map_err(|_| format!("Invalid timeout '{s}': must be a number of seconds"))?;

    if secs == 0 {
        Err("Invalid timeout 0: must be at least 1 second".to_string())
    } else {
        Ok(secs)
    }
}
