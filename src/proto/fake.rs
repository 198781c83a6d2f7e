use async_trait::async_trait;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use super::adapter::{Adapter, ConfigurableTransfer};
use super::transfer::TransferConfig;
use super::{ProtoError, Result};

/// In-memory transport: replays canned response bytes and records
/// everything written to it.
pub(crate) struct FakeBuffer {
    response_buf: Vec<u8>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl FakeBuffer {
    pub(crate) fn new(response_buf: impl Into<Vec<u8>>) -> Self {
        Self {
            response_buf: response_buf.into(),
            written: Arc::default(),
        }
    }

    /// Handle to the bytes written so far, usable after the buffer was moved.
    pub(crate) fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        self.written.clone()
    }
}

impl tokio::io::AsyncRead for FakeBuffer {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        if !self.response_buf.is_empty() {
            let c = buf.remaining().min(self.response_buf.len());
            buf.put_slice(&self.response_buf[0..c]);
            self.response_buf.drain(0..c);
        }
        std::task::Poll::Ready(Ok(()))
    }
}

impl tokio::io::AsyncWrite for FakeBuffer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::result::Result<usize, std::io::Error>> {
        if let Ok(mut written) = self.written.lock() {
            written.extend_from_slice(buf);
        }
        std::task::Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }
}

/// Scripted adapter answering each read with the next canned line.
pub(crate) struct MockAdapter {
    replies: VecDeque<String>,
    configurable: bool,
    transfer: TransferConfig,
    pub(crate) writes: Vec<String>,
    pub(crate) reads: usize,
    pub(crate) configured: Vec<TransferConfig>,
}

impl MockAdapter {
    pub(crate) fn new(replies: &[&str]) -> Self {
        Self {
            replies: replies.iter().map(|r| r.to_string()).collect(),
            configurable: false,
            transfer: TransferConfig::default(),
            writes: Vec::new(),
            reads: 0,
            configured: Vec::new(),
        }
    }

    /// Also expose the transfer configuration capability.
    pub(crate) fn configurable(mut self) -> Self {
        self.configurable = true;
        self
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    async fn write(&mut self, command: &str) -> Result<()> {
        self.writes.push(command.to_string());
        Ok(())
    }

    async fn read(&mut self) -> Result<String> {
        self.reads += 1;
        self.replies.pop_front().ok_or(ProtoError::Abort)
    }

    fn transfer(&mut self) -> Option<&mut dyn ConfigurableTransfer> {
        if self.configurable {
            Some(self)
        } else {
            None
        }
    }
}

impl ConfigurableTransfer for MockAdapter {
    fn configure(&mut self, config: TransferConfig) {
        self.configured.push(config);
        self.transfer = config;
    }

    fn transfer_config(&self) -> TransferConfig {
        self.transfer
    }
}
