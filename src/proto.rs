use std::time::Duration;

use self::response::Reply;

pub mod adapter;
pub mod codec;
pub mod command;
pub mod response;
pub mod transfer;

#[cfg(test)]
pub mod fake;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("I/O error: {:?}", _0)]
    Io(#[from] std::io::Error),

    #[error("Serial I/O error: {:?}", _0)]
    Serial(#[from] tokio_serial::Error),

    #[error("Connection was closed")]
    Abort,
    #[error("No response within {:?}", _0)]
    Timeout(Duration),
    #[error("Malformed response: {}", _0)]
    Parse(String),
    #[error("Unexpected response: {:?}", _0)]
    Unexpected(Reply),
    #[error("Error queue still reports errors after {limit} reads")]
    ErrorQueueNotDrained { limit: usize },
}

pub type Result<T> = std::result::Result<T, ProtoError>;
