use k3446xctrl::{Device, DeviceOptions, ScpiAdapter, DEFAULT_SCPI_PORT};

#[tokio::main]
async fn main() -> k3446xctrl::Result<()> {
    let adapter = ScpiAdapter::tcp("192.168.0.50", DEFAULT_SCPI_PORT).await?;
    let mut device = Device::new(adapter, DeviceOptions::default());
    eprintln!("Connected to: {}\n", device.ident().await?.model);
    Ok(())
}
