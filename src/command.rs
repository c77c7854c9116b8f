use std::num::IntErrorKind;

use thiserror::Error;

use crate::sensor::Field;

/// How the integer after `.val=` is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumericPolicy {
    /// The whole payload must be an optionally signed decimal integer.
    #[default]
    Strict,
    /// Leading-digits parse: `"21abc"` is 21 and `"abc"` is 0.
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub field: Field,
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("{field} value out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        field: Field,
        value: i32,
        min: i32,
        max: i32,
    },

    #[error("malformed {field} value: {payload:?}")]
    MalformedValue { field: Field, payload: String },
}

/// Parses `<prefix><integer>` and checks the value against the field's range.
pub fn parse_command(message: &str, policy: NumericPolicy) -> Result<Command, Rejection> {
    let Some((field, payload)) = Field::ALL
        .iter()
        .find_map(|f| message.strip_prefix(f.prefix()).map(|rest| (*f, rest)))
    else {
        return Err(Rejection::UnknownCommand(message.to_owned()));
    };

    let value = match policy {
        NumericPolicy::Strict => parse_strict(payload),
        NumericPolicy::Lenient => Some(parse_leading_int(payload)),
    }
    .ok_or_else(|| Rejection::MalformedValue {
        field,
        payload: payload.to_owned(),
    })?;

    let range = field.valid_range();
    if !range.contains(&value) {
        return Err(Rejection::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        });
    }

    Ok(Command { field, value })
}

/// Overflow saturates so the range check rejects it instead of the parse.
fn parse_strict(payload: &str) -> Option<i32> {
    match payload.parse::<i32>() {
        Ok(v) => Some(v),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i32::MAX),
            IntErrorKind::NegOverflow => Some(i32::MIN),
            _ => None,
        },
    }
}

fn parse_leading_int(payload: &str) -> i32 {
    let mut bytes = payload
        .bytes()
        .skip_while(|b| b.is_ascii_whitespace() || *b == 0x0b)
        .peekable();

    let negative = match bytes.peek() {
        Some(b'-') => {
            bytes.next();
            true
        }
        Some(b'+') => {
            bytes.next();
            false
        }
        _ => false,
    };

    let magnitude = bytes
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });

    let signed = if negative { -magnitude } else { magnitude };
    signed.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
