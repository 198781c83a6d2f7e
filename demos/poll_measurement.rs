use std::time::Duration;

use k3446xctrl::{Device, DeviceOptions, ScpiAdapter, DEFAULT_SCPI_PORT};

#[tokio::main]
async fn main() -> k3446xctrl::Result<()> {
    env_logger::init();

    let adapter = ScpiAdapter::tcp("192.168.0.50", DEFAULT_SCPI_PORT)
        .await?
        .with_timeout(Duration::from_secs(5));
    let mut device = Device::new(adapter, DeviceOptions::default());

    loop {
        let volts = device.voltage_dc().await?;
        println!("Value: {} V", volts);

        // Instrument errors are logged by the default sink.
        device.check_errors().await?;
    }
}
