use log::error;

use crate::proto::response::ErrorEntry;

/// Receives error entries drained from the instrument's error queue.
pub trait ErrorSink: Send + Sync {
    fn report(&self, instrument: &str, entry: &ErrorEntry);
}

/// Forwards instrument errors to the `log` facade at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, instrument: &str, entry: &ErrorEntry) {
        error!("{}: {}: {}", instrument, entry.code, entry.message);
    }
}
