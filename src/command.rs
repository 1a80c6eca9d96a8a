//! Splits command lines into a verb and its arguments, and parses the
//! arguments of register access commands.

use crate::codec::{self, Format};
use crate::error::{CommandError, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    IpAddress,
    Read,
    ReadHoldingRegisters,
    Write,
    WriteSingleRegister,
    WriteMultipleRegisters,
    ReadTagFile,
    ShowTiming,
    Version,
    Help,
    Quit,
    Unrecognized,
}

impl CommandKind {
    fn from_verb(verb: &str) -> Self {
        match verb.to_ascii_lowercase().as_str() {
            "ipaddress" => Self::IpAddress,
            "read" => Self::Read,
            "read_holding_registers" => Self::ReadHoldingRegisters,
            "write" => Self::Write,
            "write_single_register" => Self::WriteSingleRegister,
            "write_multiple_registers" => Self::WriteMultipleRegisters,
            "readtagfile" => Self::ReadTagFile,
            "showtiming" => Self::ShowTiming,
            "version" => Self::Version,
            "help" => Self::Help,
            "quit" => Self::Quit,
            _ => Self::Unrecognized,
        }
    }
}

/// One command line: the verb as typed plus everything after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub verb: String,
    pub args: String,
}

impl Command {
    /// Returns `None` for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (verb, args) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));
        Some(Self {
            kind: CommandKind::from_verb(verb),
            verb: verb.to_string(),
            args: args.trim().to_string(),
        })
    }
}

pub const READ_USAGE: &str = "Read <register>[format][count] [count]";
pub const READ_HOLDING_USAGE: &str = "Read_Holding_Registers <register> [count]";
pub const WRITE_USAGE: &str = "Write <register>[format] <value>|[v1,v2,...]";
pub const WRITE_SINGLE_USAGE: &str = "Write_Single_Register <register> <value>";
pub const WRITE_MULTIPLE_USAGE: &str = "Write_Multiple_Registers <register> [v1,v2,...]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub address: u32,
    pub format: Format,
    /// Registers to fetch, already scaled for the format
    pub raw_count: usize,
}

impl ReadRequest {
    /// Parses `<register>[format][count] [count]`.
    pub fn parse(args: &str) -> Result<Self, CommandError> {
        let words: Vec<&str> = args.split_whitespace().collect();
        if words.is_empty() || words.len() > 2 {
            return Err(CommandError::Usage(READ_USAGE));
        }
        let token = AddressToken::parse(words[0])?;
        let count = match (token.count, words.get(1)) {
            (Some(_), Some(_)) => return Err(CommandError::Usage(READ_USAGE)),
            (Some(count), None) => Some(count),
            (None, Some(word)) => Some(parse_count(word)?),
            (None, None) => None,
        };
        let raw_count = match count {
            Some(count) => token.format.raw_count(count)?,
            None => token.format.default_raw_count(),
        };
        Ok(Self {
            address: token.address,
            format: token.format,
            raw_count,
        })
    }

    /// Parses the legacy `<register> [count]` form: integers only, no format.
    pub fn parse_legacy(args: &str) -> Result<Self, CommandError> {
        let words: Vec<&str> = args.split_whitespace().collect();
        if words.is_empty() || words.len() > 2 {
            return Err(CommandError::Usage(READ_HOLDING_USAGE));
        }
        let address = parse_address(words[0])?;
        let raw_count = match words.get(1) {
            Some(word) => parse_count(word)?,
            None => 1,
        };
        Ok(Self {
            address,
            format: Format::Unsigned,
            raw_count,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub address: u32,
    pub words: Vec<u16>,
}

impl WriteRequest {
    /// Parses `<register>[format] <values>`. For packed strings the values are
    /// the rest of the line, verbatim.
    pub fn parse(args: &str) -> Result<Self, CommandError> {
        let (head, values) = args
            .split_once(char::is_whitespace)
            .map(|(head, rest)| (head, rest.trim()))
            .ok_or(CommandError::Usage(WRITE_USAGE))?;
        if values.is_empty() {
            return Err(CommandError::Usage(WRITE_USAGE));
        }
        let token = AddressToken::parse(head)?;
        if token.count.is_some() {
            return Err(CommandError::Usage(WRITE_USAGE));
        }
        let values = codec::parse_values(values, token.format)?;
        Ok(Self {
            address: token.address,
            words: codec::encode(&values),
        })
    }

    /// `<register> <value>` for a single unsigned register.
    pub fn parse_single(args: &str) -> Result<(u32, u16), CommandError> {
        let words: Vec<&str> = args.split_whitespace().collect();
        if words.len() != 2 {
            return Err(CommandError::Usage(WRITE_SINGLE_USAGE));
        }
        let address = parse_address(words[0])?;
        let value = words[1].parse::<i64>().map_err(|_| ParseError::Value {
            token: words[1].to_string(),
            kind: "integer",
        })?;
        Ok((address, codec::register_word(value)?))
    }

    /// Legacy `<register> [v1,v2,...]`: unsigned integers, exactly two tokens.
    pub fn parse_legacy(args: &str) -> Result<Self, CommandError> {
        let words: Vec<&str> = args.split_whitespace().collect();
        if words.len() != 2 {
            return Err(CommandError::Usage(WRITE_MULTIPLE_USAGE));
        }
        let address = parse_address(words[0])?;
        let values = codec::parse_values(words[1], Format::Unsigned)?;
        Ok(Self {
            address,
            words: codec::encode(&values),
        })
    }
}

/// `<digits>[format letter][<digits>]`, e.g. `23496`, `100F`, `23496I4`.
#[derive(Debug, PartialEq, Eq)]
struct AddressToken {
    address: u32,
    format: Format,
    count: Option<usize>,
}

impl AddressToken {
    fn parse(token: &str) -> Result<Self, ParseError> {
        let split = token
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(token.len());
        let (digits, rest) = token.split_at(split);
        let address = parse_address(digits).map_err(|_| ParseError::Address(token.to_string()))?;

        let mut chars = rest.chars();
        let format = match chars.next() {
            None => return Ok(Self { address, format: Format::Unsigned, count: None }),
            Some(c) => Format::from_suffix(c).ok_or_else(|| ParseError::Address(token.to_string()))?,
        };
        let count = match chars.as_str() {
            "" => None,
            inline => Some(parse_count(inline)?),
        };
        Ok(Self { address, format, count })
    }
}

fn parse_address(token: &str) -> Result<u32, ParseError> {
    token
        .parse()
        .map_err(|_| ParseError::Address(token.to_string()))
}

fn parse_count(token: &str) -> Result<usize, ParseError> {
    match token.parse::<usize>() {
        Ok(count) if count > 0 => Ok(count),
        _ => Err(ParseError::Count(token.to_string())),
    }
}
