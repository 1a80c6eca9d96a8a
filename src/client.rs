use std::future::Future;
use std::net::SocketAddr;
use tokio::time::{timeout, Duration};
use tokio_modbus::client;
use tokio_modbus::prelude::*;
use tracing::debug;

use crate::error::TransportError;

/// Opens connections to a Modbus server by host name or address.
pub trait Connector {
    type Transport: RegisterTransport;

    fn open(&self, host: &str) -> impl Future<Output = Result<Self::Transport, TransportError>>;
}

/// The holding register operations the interpreter needs from a connection.
pub trait RegisterTransport {
    fn read_holding_registers(
        &mut self,
        address: u32,
        count: usize,
    ) -> impl Future<Output = Result<Vec<u16>, TransportError>>;

    fn write_multiple_registers(
        &mut self,
        address: u32,
        words: &[u16],
    ) -> impl Future<Output = Result<(), TransportError>>;

    fn write_single_register(
        &mut self,
        address: u32,
        word: u16,
    ) -> impl Future<Output = Result<(), TransportError>>;

    fn close(self) -> impl Future<Output = ()>;
}

/// Modbus TCP connection settings shared by every connection the tool opens.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    pub port: u16,
    pub unit: u8,
    pub timeout_secs: u64,
}

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    async fn open(&self, host: &str) -> Result<TcpTransport, TransportError> {
        let socket_addr = resolve(host, self.port).await?;
        debug!(%socket_addr, unit = self.unit, "connecting to Modbus TCP server");

        let connect_timeout = Duration::from_secs(self.timeout_secs);
        match timeout(connect_timeout, client::tcp::connect(socket_addr)).await {
            Ok(Ok(mut ctx)) => {
                ctx.set_slave(Slave(self.unit));
                debug!(%socket_addr, "connected");
                Ok(TcpTransport {
                    ctx,
                    peer: socket_addr,
                    timeout_secs: self.timeout_secs,
                })
            }
            Ok(Err(source)) => Err(TransportError::Connect {
                addr: socket_addr,
                source,
            }),
            Err(_) => Err(TransportError::ConnectTimeout {
                addr: socket_addr,
                secs: self.timeout_secs,
            }),
        }
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    let resolve_error = |source| TransportError::Resolve {
        host: host.to_string(),
        source,
    };
    tokio::net::lookup_host((host, port))
        .await
        .map_err(resolve_error)?
        .next()
        .ok_or_else(|| {
            resolve_error(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no addresses found",
            ))
        })
}

pub struct TcpTransport {
    ctx: client::Context,
    peer: SocketAddr,
    timeout_secs: u64,
}

impl RegisterTransport for TcpTransport {
    async fn read_holding_registers(
        &mut self,
        address: u32,
        count: usize,
    ) -> Result<Vec<u16>, TransportError> {
        let address = request_address(address)?;
        let count = u16::try_from(count).map_err(|_| TransportError::OutOfRange {
            what: "register count",
            value: count,
        })?;
        debug!(address, count, "read holding registers");
        modbus_operation_with_timeout(
            || self.ctx.read_holding_registers(address, count),
            "read holding registers",
            self.timeout_secs,
        )
        .await
    }

    async fn write_multiple_registers(
        &mut self,
        address: u32,
        words: &[u16],
    ) -> Result<(), TransportError> {
        let address = request_address(address)?;
        debug!(address, count = words.len(), "write multiple registers");
        modbus_operation_with_timeout(
            || self.ctx.write_multiple_registers(address, words),
            "write registers",
            self.timeout_secs,
        )
        .await
    }

    async fn write_single_register(&mut self, address: u32, word: u16) -> Result<(), TransportError> {
        let address = request_address(address)?;
        debug!(address, word, "write single register");
        modbus_operation_with_timeout(
            || self.ctx.write_single_register(address, word),
            "write register",
            self.timeout_secs,
        )
        .await
    }

    async fn close(self) {
        // Dropping the context shuts the socket down
        debug!(peer = %self.peer, "closing connection");
        drop(self.ctx);
    }
}

fn request_address(address: u32) -> Result<u16, TransportError> {
    u16::try_from(address).map_err(|_| TransportError::OutOfRange {
        what: "register address",
        value: address as usize,
    })
}

// Generic helper for handling Modbus response errors with timeout
pub fn handle_modbus_response_with_timeout<T, E>(
    result: Result<Result<Result<T, E>, tokio_modbus::Error>, tokio::time::error::Elapsed>,
    operation: &str,
    timeout_secs: u64,
) -> Result<T, TransportError>
where
    E: std::fmt::Debug,
{
    match result {
        Ok(Ok(Ok(data))) => Ok(data),
        Ok(Ok(Err(exception))) => Err(TransportError::Exception(format!("{exception:?}"))),
        Ok(Err(source)) => Err(TransportError::Modbus {
            operation: operation.to_string(),
            source,
        }),
        Err(_) => Err(TransportError::Timeout {
            operation: operation.to_string(),
            secs: timeout_secs,
        }),
    }
}

// Helper function to perform Modbus operations with timeout
pub async fn modbus_operation_with_timeout<T, E, F, Fut>(
    operation: F,
    operation_name: &str,
    timeout_secs: u64,
) -> Result<T, TransportError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Result<T, E>, tokio_modbus::Error>>,
    E: std::fmt::Debug,
{
    let op_timeout = Duration::from_secs(timeout_secs);
    let result = timeout(op_timeout, operation()).await;
    handle_modbus_response_with_timeout(result, operation_name, timeout_secs)
}
