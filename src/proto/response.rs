use bytes::Bytes;
use std::{fmt, str::FromStr};

use super::ProtoError;

/// A single reply frame as received from the instrument.
///
/// SCPI instruments answer either with a newline terminated ASCII line
/// or with an IEEE 488.2 definite-length arbitrary block (`#<n><len><data>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Line(String),
    Block(Bytes),
}

/// One field of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric fields become `Number`, anything else is kept as trimmed text.
    pub fn parse(field: &str) -> Self {
        let field = field.trim();
        match field.parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(field.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    /// Integral numbers only, `1.5` is rejected.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Answer to `*IDN?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub firmware: String,
}

impl TryFrom<&str> for Ident {
    type Error = ProtoError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let values: Vec<&str> = value.trim().split(',').map(str::trim).collect();
        if values.len() == 4 {
            Ok(Self {
                manufacturer: String::from(values[0]),
                model: String::from(values[1]),
                serial: String::from(values[2]),
                firmware: String::from(values[3]),
            })
        } else {
            Err(ProtoError::Parse(format!("Invalid data for *IDN? response: {}", value)))
        }
    }
}

/// One entry of the instrument's error queue, as returned by `:SYST:ERR?`.
///
/// A code of zero is the "no error" sentinel which marks an empty queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub code: i32,
    pub message: String,
}

impl ErrorEntry {
    pub fn is_error(&self) -> bool {
        self.code != 0
    }
}

impl FromStr for ErrorEntry {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Some firmware answers a bare code without message.
        let (code, message) = s.trim().split_once(',').unwrap_or((s.trim(), ""));
        let code = code
            .trim()
            .parse::<i32>()
            .map_err(|_| ProtoError::Parse(format!("Invalid error code: {}", code)))?;
        Ok(Self {
            code,
            message: strip_quotes(message.trim()).to_string(),
        })
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}
