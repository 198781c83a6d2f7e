//!
//! This library provides SCPI communication with a Keysight 3446xA digital multimeter.
//!
//! <br>
//!
//! # Details
//!
//! - The instrument is reached through an [`Adapter`]. [`ScpiAdapter`] talks
//!   to the raw SCPI socket (LAN, port 5025) or to a serial line.
//!
//! - Basic setup and connection
//!
//!   ```no_run
//!   use k3446xctrl::{Device, DeviceOptions, ScpiAdapter, DEFAULT_SCPI_PORT};
//!   #[tokio::main]
//!   async fn main() -> k3446xctrl::Result<()> {
//!       let adapter = ScpiAdapter::tcp("192.168.0.50", DEFAULT_SCPI_PORT).await?;
//!       let mut device = Device::new(adapter, DeviceOptions::default());
//!       eprintln!("Connected to: {}\n", device.ident().await?.model);
//!       println!("{} V", device.voltage_dc().await?);
//!       device.check_errors().await?;
//!       Ok(())
//!   }
//!   ```
//!
//! # Supported devices
//!
//!  * Keysight 34460A
//!  * Keysight 34461A
//!  * Keysight 34465A
//!  * Keysight 34470A
//!

pub mod device;
pub mod proto;
pub mod sink;

pub use device::{Device, DeviceOptions};
pub use proto::adapter::{Adapter, ConfigurableTransfer, ScpiAdapter};
pub use proto::{ProtoError, Result};
pub use sink::{ErrorSink, LogSink};

#[cfg(unix)]
pub const DEFAULT_TTY: &str = "/dev/ttyUSB0";
#[cfg(windows)]
pub const DEFAULT_TTY: &str = "COM1";

/// Default baudrate for RS-232 connections.
pub const DEFAULT_BAUDRATE: u32 = 9600;

/// Raw SCPI socket port of Keysight LAN instruments.
pub const DEFAULT_SCPI_PORT: u16 = 5025;

/// Upper bound of `:SYST:ERR?` queries per error queue drain.
/// The 3446xA queue holds at most 20 entries.
pub const DEFAULT_ERROR_QUEUE_LIMIT: usize = 32;
