//! Conversion between raw holding register words and typed values.

use std::fmt;

use crate::error::ParseError;

/// How a run of registers is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Unsigned,
    Signed,
    /// IEEE-754 single precision, two registers per value, high word first
    Float,
    /// Two characters per register, high byte first, NUL terminated
    PackedString,
}

impl Format {
    pub fn from_suffix(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'I' => Some(Self::Unsigned),
            'S' => Some(Self::Signed),
            'F' => Some(Self::Float),
            'M' => Some(Self::PackedString),
            _ => None,
        }
    }

    /// Number of raw registers needed for `count` typed elements.
    pub fn raw_count(self, count: usize) -> Result<usize, ParseError> {
        match self {
            Self::Float => count
                .checked_mul(2)
                .ok_or_else(|| ParseError::Count(count.to_string())),
            Self::PackedString => Ok((count / 2).max(1)),
            Self::Unsigned | Self::Signed => Ok(count),
        }
    }

    /// Raw register count when no element count was given.
    pub fn default_raw_count(self) -> usize {
        match self {
            Self::Float => 2,
            _ => 1,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Unsigned | Self::Signed => "integer",
            Self::Float => "float",
            Self::PackedString => "string",
        }
    }
}

/// Decoded register contents.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Unsigned(Vec<u16>),
    Signed(Vec<i16>),
    Float(Vec<f32>),
    Text(String),
}

impl fmt::Display for Values {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(v) => write_list(f, v, |f, x| write!(f, "{x}")),
            Self::Signed(v) => write_list(f, v, |f, x| write!(f, "{x}")),
            // Debug keeps the trailing ".0" on whole floats
            Self::Float(v) => write_list(f, v, |f, x| write!(f, "{x:?}")),
            Self::Text(s) => f.write_str(s),
        }
    }
}

fn write_list<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    item: impl Fn(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    f.write_str("[")?;
    for (i, x) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item(f, x)?;
    }
    f.write_str("]")
}

pub fn decode(words: &[u16], format: Format) -> Values {
    match format {
        Format::Unsigned => Values::Unsigned(words.to_vec()),
        Format::Signed => Values::Signed(words.iter().map(|&w| w as i16).collect()),
        // A trailing unpaired word is dropped
        Format::Float => Values::Float(
            words
                .chunks_exact(2)
                .map(|pair| f32::from_bits(((pair[0] as u32) << 16) | pair[1] as u32))
                .collect(),
        ),
        Format::PackedString => Values::Text(decode_text(words)),
    }
}

fn decode_text(words: &[u16]) -> String {
    let mut text = String::with_capacity(words.len() * 2);
    for &word in words {
        let [high, low] = word.to_be_bytes();
        if high == 0 {
            break;
        }
        text.push(char::from(high));
        if low == 0 {
            break;
        }
        text.push(char::from(low));
    }
    text
}

pub fn encode(values: &Values) -> Vec<u16> {
    match values {
        Values::Unsigned(v) => v.clone(),
        Values::Signed(v) => v.iter().map(|&x| x as u16).collect(),
        Values::Float(v) => v
            .iter()
            .flat_map(|x| {
                let bits = x.to_bits();
                [(bits >> 16) as u16, bits as u16]
            })
            .collect(),
        Values::Text(s) => s
            .chars()
            .collect::<Vec<_>>()
            .chunks(2)
            .map(|pair| {
                let high = pair[0] as u16;
                let low = pair.get(1).map_or(0, |&c| c as u16);
                (high << 8) | low
            })
            .collect(),
    }
}

/// Parse user input for a write into typed values.
///
/// Integer formats accept a single value or a comma separated list, optionally
/// wrapped in `[...]`; negative integers wrap to their two's-complement word.
/// Text is taken verbatim. Any bad token fails the whole list.
pub fn parse_values(input: &str, format: Format) -> Result<Values, ParseError> {
    if format == Format::PackedString {
        return parse_text(input);
    }

    let tokens = split_value_list(input)?;
    match format {
        Format::Float => tokens
            .iter()
            .map(|t| {
                t.parse::<f32>().map_err(|_| ParseError::Value {
                    token: t.to_string(),
                    kind: format.name(),
                })
            })
            .collect::<Result<_, _>>()
            .map(Values::Float),
        _ => tokens
            .iter()
            .map(|t| {
                let value = t.parse::<i64>().map_err(|_| ParseError::Value {
                    token: t.to_string(),
                    kind: format.name(),
                })?;
                register_word(value)
            })
            .collect::<Result<_, _>>()
            .map(Values::Unsigned),
    }
}

/// Wrap a signed integer into a register word (`-1` becomes `65535`).
pub fn register_word(value: i64) -> Result<u16, ParseError> {
    let wrapped = if value < 0 { value + 65536 } else { value };
    u16::try_from(wrapped).map_err(|_| ParseError::OutOfRange(value))
}

fn split_value_list(input: &str) -> Result<Vec<&str>, ParseError> {
    let trimmed = input.trim();
    let inner = match (trimmed.strip_prefix('['), trimmed.ends_with(']')) {
        (Some(rest), true) => &rest[..rest.len() - 1],
        (None, false) => trimmed,
        _ => return Err(ParseError::ValueList(input.to_string())),
    };
    let tokens: Vec<&str> = inner.split(',').map(str::trim).collect();
    if tokens.iter().any(|t| t.is_empty()) {
        return Err(ParseError::ValueList(input.to_string()));
    }
    Ok(tokens)
}

fn parse_text(input: &str) -> Result<Values, ParseError> {
    if input.is_empty() {
        return Err(ParseError::ValueList(input.to_string()));
    }
    if let Some(c) = input.chars().find(|&c| c as u32 > 0xFF) {
        return Err(ParseError::Character(c));
    }
    Ok(Values::Text(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_suffixes() {
        assert_eq!(Format::from_suffix('I'), Some(Format::Unsigned));
        assert_eq!(Format::from_suffix('s'), Some(Format::Signed));
        assert_eq!(Format::from_suffix('F'), Some(Format::Float));
        assert_eq!(Format::from_suffix('m'), Some(Format::PackedString));
        assert_eq!(Format::from_suffix('X'), None);
        assert_eq!(Format::from_suffix('4'), None);
    }

    #[test]
    fn test_raw_count() {
        assert_eq!(Format::Unsigned.raw_count(4), Ok(4));
        assert_eq!(Format::Signed.raw_count(3), Ok(3));
        assert_eq!(Format::Float.raw_count(2), Ok(4));
        assert_eq!(Format::PackedString.raw_count(10), Ok(5));
        assert_eq!(Format::PackedString.raw_count(7), Ok(3));
        assert_eq!(Format::PackedString.raw_count(1), Ok(1));
        assert_eq!(
            Format::Float.raw_count(usize::MAX / 2 + 1),
            Err(ParseError::Count((usize::MAX / 2 + 1).to_string()))
        );
        assert_eq!(Format::Float.default_raw_count(), 2);
        assert_eq!(Format::Unsigned.default_raw_count(), 1);
    }

    #[test]
    fn test_decode_signed() {
        assert_eq!(
            decode(&[0, 32767, 32768, 65535], Format::Signed),
            Values::Signed(vec![0, 32767, -32768, -1])
        );
    }

    #[test]
    fn test_signed_wraparound_round_trip() {
        for v in [i16::MIN, -12345, -1, 0, 1, 12345, i16::MAX] {
            let words = encode(&Values::Signed(vec![v]));
            assert_eq!(decode(&words, Format::Signed), Values::Signed(vec![v]));
        }
    }

    #[test]
    fn test_decode_float_big_endian() {
        assert_eq!(decode(&[16256, 0], Format::Float), Values::Float(vec![1.0]));
        assert_eq!(
            decode(&[0x4049, 0x0FDB], Format::Float),
            Values::Float(vec![std::f32::consts::PI])
        );
    }

    #[test]
    fn test_decode_float_drops_unpaired_word() {
        let decoded = decode(&[16256, 0, 16384, 0, 16256], Format::Float);
        assert_eq!(decoded, Values::Float(vec![1.0, 2.0]));
        assert_eq!(decode(&[16256], Format::Float), Values::Float(vec![]));
    }

    #[test]
    fn test_float_round_trip_is_bit_exact() {
        let floats = vec![1.5f32, -2.75, 0.0, -0.0, f32::MAX, f32::MIN_POSITIVE, 1e-40];
        let words = encode(&Values::Float(floats.clone()));
        assert_eq!(words.len(), floats.len() * 2);
        match decode(&words, Format::Float) {
            Values::Float(back) => {
                for (a, b) in floats.iter().zip(back.iter()) {
                    assert_eq!(a.to_bits(), b.to_bits());
                }
            }
            other => panic!("unexpected decode {other:?}"),
        }
    }

    #[test]
    fn test_decode_text() {
        // "Hello" packed with a NUL low byte on the last register
        let words = [0x4865, 0x6C6C, 0x6F00, 0x5858];
        assert_eq!(
            decode(&words, Format::PackedString),
            Values::Text("Hello".to_string())
        );
    }

    #[test]
    fn test_decode_text_stops_at_nul_high_byte() {
        let words = [0x4142, 0x0043, 0x4445];
        assert_eq!(
            decode(&words, Format::PackedString),
            Values::Text("AB".to_string())
        );
        assert_eq!(
            decode(&[0x0000, 0x4142], Format::PackedString),
            Values::Text(String::new())
        );
        assert_eq!(decode(&[], Format::PackedString), Values::Text(String::new()));
    }

    #[test]
    fn test_encode_text_pads_odd_length() {
        assert_eq!(encode(&Values::Text("ABC".into())), vec![0x4142, 0x4300]);
        assert_eq!(encode(&Values::Text("AB".into())), vec![0x4142]);
    }

    #[test]
    fn test_encode_float_high_word_first() {
        assert_eq!(encode(&Values::Float(vec![1.0])), vec![16256, 0]);
    }

    #[test]
    fn test_parse_values_integers() {
        assert_eq!(
            parse_values("[10,20,30]", Format::Unsigned),
            Ok(Values::Unsigned(vec![10, 20, 30]))
        );
        assert_eq!(
            parse_values("[10, 20, 30]", Format::Unsigned),
            Ok(Values::Unsigned(vec![10, 20, 30]))
        );
        assert_eq!(parse_values("42", Format::Unsigned), Ok(Values::Unsigned(vec![42])));
        assert_eq!(
            parse_values("-1,-32768", Format::Signed),
            Ok(Values::Unsigned(vec![65535, 32768]))
        );
    }

    #[test]
    fn test_parse_values_failures_are_whole_list() {
        assert!(matches!(
            parse_values("[1,x,3]", Format::Unsigned),
            Err(ParseError::Value { .. })
        ));
        assert!(matches!(
            parse_values("[1,2", Format::Unsigned),
            Err(ParseError::ValueList(_))
        ));
        assert!(matches!(
            parse_values("1,,2", Format::Unsigned),
            Err(ParseError::ValueList(_))
        ));
        assert!(matches!(
            parse_values("[]", Format::Unsigned),
            Err(ParseError::ValueList(_))
        ));
        assert_eq!(
            parse_values("70000", Format::Unsigned),
            Err(ParseError::OutOfRange(70000))
        );
        assert!(matches!(
            parse_values("1.5", Format::Unsigned),
            Err(ParseError::Value { .. })
        ));
    }

    #[test]
    fn test_parse_values_floats_and_text() {
        assert_eq!(
            parse_values("[1.5, -2]", Format::Float),
            Ok(Values::Float(vec![1.5, -2.0]))
        );
        assert_eq!(
            parse_values("pump 1", Format::PackedString),
            Ok(Values::Text("pump 1".into()))
        );
        assert_eq!(
            parse_values("\u{263A}", Format::PackedString),
            Err(ParseError::Character('\u{263A}'))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Values::Unsigned(vec![15]).to_string(), "[15]");
        assert_eq!(Values::Unsigned(vec![1, 2, 3]).to_string(), "[1, 2, 3]");
        assert_eq!(Values::Signed(vec![-1]).to_string(), "[-1]");
        assert_eq!(Values::Float(vec![1.0]).to_string(), "[1.0]");
        assert_eq!(Values::Float(vec![1.0, 2.5]).to_string(), "[1.0, 2.5]");
        assert_eq!(Values::Float(vec![]).to_string(), "[]");
        assert_eq!(Values::Text("Hi".into()).to_string(), "Hi");
    }
}
