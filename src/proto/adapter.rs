//! Transport abstraction between the driver and the instrument.
//!
//! The driver only needs to write a command and read back a line. Adapters
//! which can change how multi-value responses are framed additionally expose
//! [`ConfigurableTransfer`] through [`Adapter::transfer`].

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use log::debug;
use std::{io, pin::Pin, time::Duration};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_serial::SerialPortBuilderExt;
use tokio_util::codec::Decoder;

use super::codec::ScpiCodec;
use super::response::{Reply, Value};
use super::transfer::{decode_block, parse_ascii, TransferConfig};
use super::{ProtoError, Result};

#[async_trait]
pub trait Adapter: Send {
    /// Send a command, no response is awaited.
    async fn write(&mut self, command: &str) -> Result<()>;

    /// Read the next response line.
    async fn read(&mut self) -> Result<String>;

    async fn ask(&mut self, command: &str) -> Result<String> {
        self.write(command).await?;
        self.read().await
    }

    /// Send a query and split the response into fields, honouring the
    /// transfer configuration if the adapter exposes one.
    async fn values(&mut self, command: &str) -> Result<Vec<Value>> {
        let config = self
            .transfer()
            .map(|t| t.transfer_config())
            .unwrap_or_default();
        let line = self.ask(command).await?;
        Ok(parse_ascii(&line, &config))
    }

    /// Transfer configuration capability, if the adapter has one.
    fn transfer(&mut self) -> Option<&mut dyn ConfigurableTransfer> {
        None
    }
}

pub trait ConfigurableTransfer: Send {
    fn configure(&mut self, config: TransferConfig);

    fn transfer_config(&self) -> TransferConfig;
}

trait AsyncReadWrite<S>: futures::Sink<S> + futures::Stream {}

impl<T, S> AsyncReadWrite<S> for T where T: futures::Sink<S> + futures::Stream {}

/// Adapter for instruments speaking SCPI over a byte stream,
/// e.g. a serial line or the raw SCPI socket on port 5025.
#[allow(clippy::type_complexity)]
pub struct ScpiAdapter {
    stream: Pin<
        Box<
            dyn AsyncReadWrite<
                    String,
                    Error = io::Error,
                    Item = std::result::Result<Reply, io::Error>,
                > + Send,
        >,
    >,
    transfer: TransferConfig,
    timeout: Option<Duration>,
    // Replies to timed out queries which may still arrive.
    stale: usize,
}

impl ScpiAdapter {
    pub fn serial(com: impl AsRef<str>, baudrate: u32) -> Result<Self> {
        #[allow(unused_mut)]
        let mut port = tokio_serial::new(com.as_ref(), baudrate).open_native_async()?;

        #[cfg(unix)]
        port.set_exclusive(false)?;

        Ok(Self::from_transport(port))
    }

    pub async fn tcp(host: impl AsRef<str>, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host.as_ref(), port)).await?;
        stream.set_nodelay(true)?;
        Ok(Self::from_transport(stream))
    }

    /// Wrap any bidirectional byte stream.
    pub fn from_transport<T>(io: T) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self {
            stream: Box::pin(ScpiCodec::default().framed(io)),
            transfer: TransferConfig::default(),
            timeout: None,
            stale: 0,
        }
    }

    /// Give up waiting for a response after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn next_frame(&mut self) -> Result<Reply> {
        let next = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.stream.next())
                .await
                .map_err(|_| ProtoError::Timeout(timeout))?,
            None => self.stream.next().await,
        };
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(ioerr)) => Err(ioerr.into()),
            None => Err(ProtoError::Abort),
        }
    }

    /// Next reply belonging to the last query. Late replies to queries
    /// which timed out earlier are dropped first.
    async fn next_reply(&mut self) -> Result<Reply> {
        loop {
            let reply = match self.next_frame().await {
                Err(ProtoError::Timeout(timeout)) => {
                    self.stale += 1;
                    return Err(ProtoError::Timeout(timeout));
                }
                other => other?,
            };
            if self.stale == 0 {
                return Ok(reply);
            }
            self.stale -= 1;
            debug!("SCPI dropped late reply {:?}", reply);
        }
    }
}

#[async_trait]
impl Adapter for ScpiAdapter {
    async fn write(&mut self, command: &str) -> Result<()> {
        debug!("SCPI write '{}'", command);
        self.stream.send(command.to_string()).await?;
        Ok(())
    }

    async fn read(&mut self) -> Result<String> {
        match self.next_reply().await? {
            Reply::Line(line) => {
                debug!("SCPI read '{}'", line);
                Ok(line)
            }
            reply => Err(ProtoError::Unexpected(reply)),
        }
    }

    async fn values(&mut self, command: &str) -> Result<Vec<Value>> {
        self.write(command).await?;
        match self.next_reply().await? {
            Reply::Line(line) => {
                debug!("SCPI read '{}'", line);
                Ok(parse_ascii(&line, &self.transfer))
            }
            Reply::Block(data) if self.transfer.is_binary => {
                debug!("SCPI read block of {} bytes", data.len());
                decode_block(&data, &self.transfer)
            }
            reply => Err(ProtoError::Unexpected(reply)),
        }
    }

    fn transfer(&mut self) -> Option<&mut dyn ConfigurableTransfer> {
        Some(self)
    }
}

impl ConfigurableTransfer for ScpiAdapter {
    fn configure(&mut self, config: TransferConfig) {
        debug!("SCPI transfer configured: {:?}", config);
        self.transfer = config;
    }

    fn transfer_config(&self) -> TransferConfig {
        self.transfer
    }
}
