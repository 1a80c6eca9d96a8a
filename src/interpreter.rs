//! Command dispatch over a single optional Modbus connection.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::client::{Connector, RegisterTransport};
use crate::codec::{self, Values};
use crate::command::{Command, CommandKind, ReadRequest, WriteRequest};
use crate::error::{CommandError, TransportError};
use crate::tags;

pub const VERSION: &str = concat!("mbtcp ", env!("CARGO_PKG_VERSION"));

const HELP: &str = "
    Commands: (Not case sensitive.)
        Help
          - Displays this list of commands.
        Version
          - Displays the program version.
        IPAddress <ip address>
          - Sets the IP address for the target device.
        Read <register>[format][count] [count]
          - Read 4x holding registers. Formats: I=unsigned (default),
            S=signed, F=float (2 registers each), M=string (2 chars each).
        Read_Holding_Registers <register> [count]
          - Read raw unsigned holding registers.
        Write <register>[format] <value>|[v1,v2,...]
          - Write holding registers using the same formats as Read.
        Write_Single_Register <register> <value>
          - Write one unsigned holding register.
        Write_Multiple_Registers <register> [v1,v2,...]
          - Write consecutive unsigned holding registers.
        ReadTagFile <tag file> [output file]
          - Read every tag (one Read argument per line) in the tag file.
        ShowTiming [on|off]
          - Report how long each register operation took.
        Quit
          - Leave console application.
";

const TAG_FILE_USAGE: &str = "ReadTagFile <tag file> [output file]";
const SHOW_TIMING_USAGE: &str = "ShowTiming [on|off]";
const IP_ADDRESS_USAGE: &str = "IPAddress <ip address>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The result of one successfully executed command.
#[derive(Debug, PartialEq, Eq)]
pub struct Outcome {
    pub lines: Vec<String>,
    pub flow: Flow,
}

impl Outcome {
    fn lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            flow: Flow::Continue,
        }
    }

    fn line(line: impl Into<String>) -> Self {
        Self::lines(vec![line.into()])
    }
}

/// The one live connection and the host it was opened for.
struct Session<T> {
    host: String,
    transport: T,
}

pub struct Interpreter<C: Connector> {
    connector: C,
    session: Option<Session<C::Transport>>,
    show_timing: bool,
}

impl<C: Connector> Interpreter<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            session: None,
            show_timing: false,
        }
    }

    /// Executes `line` and writes its output, or its error as `ERROR - ...`.
    /// Errors never escape; only a failing writer does.
    pub async fn run(&mut self, line: &str, out: &mut impl Write) -> std::io::Result<Flow> {
        match self.execute(line).await {
            Ok(outcome) => {
                for line in &outcome.lines {
                    writeln!(out, "{line}")?;
                }
                Ok(outcome.flow)
            }
            Err(e) => {
                debug!(command = line, error = ?e, "command failed");
                writeln!(out, "ERROR - {e}")?;
                Ok(Flow::Continue)
            }
        }
    }

    pub async fn execute(&mut self, line: &str) -> Result<Outcome, CommandError> {
        let Some(command) = Command::parse(line) else {
            return Ok(Outcome::lines(Vec::new()));
        };
        self.dispatch(command).await
    }

    async fn dispatch(&mut self, command: Command) -> Result<Outcome, CommandError> {
        let args = command.args.as_str();
        let show_timing = self.show_timing;
        match command.kind {
            CommandKind::IpAddress => self.set_address(args).await,
            CommandKind::Read => {
                let transport = self.transport()?;
                let request = ReadRequest::parse(args)?;
                timed_read(transport, &request, show_timing).await
            }
            CommandKind::ReadHoldingRegisters => {
                let transport = self.transport()?;
                let request = ReadRequest::parse_legacy(args)?;
                timed_read(transport, &request, show_timing).await
            }
            CommandKind::Write => {
                let transport = self.transport()?;
                let request = WriteRequest::parse(args)?;
                timed_write(transport, &request, show_timing).await
            }
            CommandKind::WriteMultipleRegisters => {
                let transport = self.transport()?;
                let request = WriteRequest::parse_legacy(args)?;
                timed_write(transport, &request, show_timing).await
            }
            CommandKind::WriteSingleRegister => {
                let transport = self.transport()?;
                let (address, word) = WriteRequest::parse_single(args)?;
                let start = Instant::now();
                transport.write_single_register(address, word).await?;
                Ok(with_timing(
                    vec![format!("Wrote register {address} with value {word}")],
                    start.elapsed(),
                    show_timing,
                ))
            }
            CommandKind::ReadTagFile => {
                let transport = self.transport()?;
                read_tag_file(transport, args, show_timing).await
            }
            CommandKind::ShowTiming => self.set_show_timing(args),
            CommandKind::Version => Ok(Outcome::line(VERSION)),
            CommandKind::Help => Ok(Outcome::line(HELP)),
            CommandKind::Quit => Ok(Outcome {
                lines: Vec::new(),
                flow: Flow::Quit,
            }),
            CommandKind::Unrecognized => Err(CommandError::Unrecognized(command.verb)),
        }
    }

    /// Opens a connection to `host`, replacing the current one on success.
    /// A failed open leaves the existing connection in place.
    async fn set_address(&mut self, args: &str) -> Result<Outcome, CommandError> {
        let mut words = args.split_whitespace();
        let (Some(host), None) = (words.next(), words.next()) else {
            return Err(CommandError::Usage(IP_ADDRESS_USAGE));
        };
        let transport = self.connector.open(host).await?;
        if let Some(previous) = self.session.take() {
            debug!(host = %previous.host, "replacing connection");
            previous.transport.close().await;
        }
        debug!(host, "connection established");
        self.session = Some(Session {
            host: host.to_string(),
            transport,
        });
        Ok(Outcome::lines(Vec::new()))
    }

    fn transport(&mut self) -> Result<&mut C::Transport, CommandError> {
        self.session
            .as_mut()
            .map(|s| &mut s.transport)
            .ok_or(CommandError::NotConnected)
    }

    fn set_show_timing(&mut self, args: &str) -> Result<Outcome, CommandError> {
        self.show_timing = match args.to_ascii_lowercase().as_str() {
            "on" => true,
            "off" => false,
            "" => !self.show_timing,
            _ => return Err(CommandError::Usage(SHOW_TIMING_USAGE)),
        };
        let state = if self.show_timing { "on" } else { "off" };
        Ok(Outcome::line(format!("ShowTiming set to {state}.")))
    }

    /// Closes the connection, if any.
    pub async fn shutdown(mut self) {
        if let Some(session) = self.session.take() {
            session.transport.close().await;
        }
    }
}

async fn timed_read<T: RegisterTransport>(
    transport: &mut T,
    request: &ReadRequest,
    show_timing: bool,
) -> Result<Outcome, CommandError> {
    let start = Instant::now();
    let values = read_values(transport, request).await?;
    Ok(with_timing(vec![values.to_string()], start.elapsed(), show_timing))
}

async fn timed_write<T: RegisterTransport>(
    transport: &mut T,
    request: &WriteRequest,
    show_timing: bool,
) -> Result<Outcome, CommandError> {
    let start = Instant::now();
    transport
        .write_multiple_registers(request.address, &request.words)
        .await?;
    Ok(with_timing(
        vec![format!(
            "Wrote {} register(s) starting at address {}",
            request.words.len(),
            request.address
        )],
        start.elapsed(),
        show_timing,
    ))
}

async fn read_tag_file<T: RegisterTransport>(
    transport: &mut T,
    args: &str,
    show_timing: bool,
) -> Result<Outcome, CommandError> {
    let words: Vec<&str> = args.split_whitespace().collect();
    let (input, output) = match words.as_slice() {
        [input] => (Path::new(*input), None),
        [input, output] => (Path::new(*input), Some(Path::new(*output))),
        _ => return Err(CommandError::Usage(TAG_FILE_USAGE)),
    };

    let start = Instant::now();
    let mut lines = tags::read_tag_file(transport, input, output).await?;
    let elapsed = start.elapsed();
    if let Some(output) = output {
        lines.push(format!("Tag values written to {}", output.display()));
    }
    Ok(with_timing(lines, elapsed, show_timing))
}

fn with_timing(mut lines: Vec<String>, elapsed: Duration, show_timing: bool) -> Outcome {
    debug!(elapsed_ms = elapsed.as_secs_f64() * 1000.0, "register operation finished");
    if show_timing {
        lines.push(format!("Executed in {:7.3} seconds.", elapsed.as_secs_f64()));
    }
    Outcome::lines(lines)
}

/// Fetches the registers for `request` and decodes them.
pub async fn read_values<T: RegisterTransport>(
    transport: &mut T,
    request: &ReadRequest,
) -> Result<Values, TransportError> {
    let words = transport
        .read_holding_registers(request.address, request.raw_count)
        .await?;
    Ok(codec::decode(&words, request.format))
}
