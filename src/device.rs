use log::info;
use std::fmt;

use super::proto::{
    adapter::Adapter,
    command::Command,
    response::{ErrorEntry, Ident, Value},
    transfer::TransferConfig,
    ProtoError,
};
use super::sink::{ErrorSink, LogSink};
use crate::proto::Result;
use crate::DEFAULT_ERROR_QUEUE_LIMIT;

pub const DEFAULT_NAME: &str = "Keysight 3446xA digital multimeter";

pub struct DeviceOptions {
    name: String,
    error_queue_limit: usize,
    sink: Box<dyn ErrorSink>,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            error_queue_limit: DEFAULT_ERROR_QUEUE_LIMIT,
            sink: Box::new(LogSink),
        }
    }
}

impl fmt::Debug for DeviceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceOptions")
            .field("name", &self.name)
            .field("error_queue_limit", &self.error_queue_limit)
            .finish_non_exhaustive()
    }
}

impl DeviceOptions {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Maximum number of `:SYST:ERR?` queries issued by one
    /// [`Device::check_errors`] call. At least one query is always made.
    pub fn with_error_queue_limit(mut self, limit: usize) -> Self {
        self.error_queue_limit = limit.max(1);
        self
    }

    pub fn with_sink(mut self, sink: impl ErrorSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }
}

pub struct Device<A> {
    adapter: A,
    name: String,
    error_queue_limit: usize,
    sink: Box<dyn ErrorSink>,
}

impl<A: Adapter> Device<A> {
    /// Adapters with a configurable transfer format are switched to
    /// comma separated ASCII floats. Others are used as they are.
    pub fn new(mut adapter: A, options: DeviceOptions) -> Self {
        if let Some(transfer) = adapter.transfer() {
            let config = TransferConfig::ascii_float32();
            transfer.configure(config);
            info!("{}: transfer format set to {:?}", options.name, config);
        }

        Self {
            adapter,
            name: options.name,
            error_queue_limit: options.error_queue_limit,
            sink: options.sink,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn into_inner(self) -> A {
        self.adapter
    }

    pub async fn write(&mut self, command: impl AsRef<str>) -> Result<()> {
        self.adapter.write(command.as_ref()).await
    }

    pub async fn ask(&mut self, command: impl AsRef<str>) -> Result<String> {
        self.adapter.ask(command.as_ref()).await
    }

    pub async fn values(&mut self, command: impl AsRef<str>) -> Result<Vec<Value>> {
        self.adapter.values(command.as_ref()).await
    }

    pub async fn ident(&mut self) -> Result<Ident> {
        let line = self.adapter.ask(&Command::Id.to_string()).await?;
        Ident::try_from(line.as_str())
    }

    pub async fn reset(&mut self) -> Result<()> {
        self.adapter.write(&Command::Reset.to_string()).await
    }

    pub async fn clear(&mut self) -> Result<()> {
        self.adapter.write(&Command::ClearStatus.to_string()).await
    }

    pub async fn current_dc(&mut self) -> Result<f64> {
        self.measurement(Command::MeasureCurrentDc).await
    }

    pub async fn current_ac(&mut self) -> Result<f64> {
        self.measurement(Command::MeasureCurrentAc).await
    }

    pub async fn voltage_dc(&mut self) -> Result<f64> {
        self.measurement(Command::MeasureVoltageDc).await
    }

    pub async fn voltage_ac(&mut self) -> Result<f64> {
        self.measurement(Command::MeasureVoltageAc).await
    }

    pub async fn enable(&mut self) -> Result<()> {
        self.adapter
            .write(&Command::SetOutput(true).to_string())
            .await
    }

    pub async fn disable(&mut self) -> Result<()> {
        self.adapter
            .write(&Command::SetOutput(false).to_string())
            .await
    }

    pub async fn is_enabled(&mut self) -> Result<bool> {
        let value = self.single_value(Command::GetOutput).await?;
        value.as_i64().map(|state| state != 0).ok_or_else(|| {
            ProtoError::Parse(format!("{}: integer expected, got {}", Command::GetOutput, value))
        })
    }

    /// Every non-zero entry is reported to the error sink and returned.
    /// Fails if the "no error" sentinel is not seen within the query limit.
    pub async fn check_errors(&mut self) -> Result<Vec<ErrorEntry>> {
        let query = Command::NextError.to_string();
        let mut errors = Vec::new();
        for _ in 0..self.error_queue_limit {
            let entry: ErrorEntry = self.adapter.ask(&query).await?.parse()?;
            if !entry.is_error() {
                return Ok(errors);
            }
            self.sink.report(&self.name, &entry);
            errors.push(entry);
        }
        Err(ProtoError::ErrorQueueNotDrained {
            limit: self.error_queue_limit,
        })
    }

    async fn single_value(&mut self, command: Command) -> Result<Value> {
        let mut values = self.adapter.values(&command.to_string()).await?;
        match values.len() {
            1 => Ok(values.remove(0)),
            n => Err(ProtoError::Parse(format!("{}: one value expected, got {}", command, n))),
        }
    }

    async fn measurement(&mut self, command: Command) -> Result<f64> {
        let value = self.single_value(command).await?;
        value.as_f64().ok_or_else(|| {
            ProtoError::Parse(format!("{}: number expected, got {}", command, value))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::proto::adapter::{ConfigurableTransfer, ScpiAdapter};
    use crate::proto::fake::{FakeBuffer, MockAdapter};

    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<String>>>);

    impl RecordingSink {
        fn entries(&self) -> Vec<String> {
            self.0.lock().expect("lock").clone()
        }
    }

    impl ErrorSink for RecordingSink {
        fn report(&self, instrument: &str, entry: &ErrorEntry) {
            self.0
                .lock()
                .expect("lock")
                .push(format!("{}: {}: {}", instrument, entry.code, entry.message));
        }
    }

    fn device(replies: &[&str]) -> Device<MockAdapter> {
        Device::new(MockAdapter::new(replies), DeviceOptions::default())
    }

    #[tokio::test]
    async fn test_measurements() {
        let mut dev = device(&["+1.25E-03"]);
        assert_eq!(dev.current_dc().await.expect("current_dc"), 1.25e-3);
        assert_eq!(dev.adapter().writes, vec![":MEASure:CURRent:DC"]);
        assert_eq!(dev.adapter().reads, 1);

        let mut dev = device(&["0.5"]);
        assert_eq!(dev.current_ac().await.expect("current_ac"), 0.5);
        assert_eq!(dev.adapter().writes, vec![":MEASure:CURRent:AC"]);
        assert_eq!(dev.adapter().reads, 1);

        let mut dev = device(&["+4.99871200E+00"]);
        assert_eq!(dev.voltage_dc().await.expect("voltage_dc"), 4.998712);
        assert_eq!(dev.adapter().writes, vec![":MEASure:VOLTage:DC"]);
        assert_eq!(dev.adapter().reads, 1);

        let mut dev = device(&["230.1"]);
        assert_eq!(dev.voltage_ac().await.expect("voltage_ac"), 230.1);
        assert_eq!(dev.adapter().writes, vec![":MEASure:VOLTage:AC"]);
        assert_eq!(dev.adapter().reads, 1);
    }

    #[tokio::test]
    async fn test_malformed_measurement() {
        let mut dev = device(&["OVLD"]);
        assert!(matches!(dev.voltage_dc().await, Err(ProtoError::Parse(_))));

        let mut dev = device(&["1.0,2.0"]);
        assert!(matches!(dev.voltage_dc().await, Err(ProtoError::Parse(_))));

        let mut dev = device(&[]);
        assert!(matches!(dev.current_dc().await, Err(ProtoError::Abort)));
    }

    #[tokio::test]
    async fn test_enable_disable() {
        let mut dev = device(&[]);
        dev.enable().await.expect("enable");
        assert_eq!(dev.adapter().writes, vec![":OUTP 1"]);
        assert_eq!(dev.adapter().reads, 0);

        let mut dev = device(&[]);
        dev.disable().await.expect("disable");
        assert_eq!(dev.adapter().writes, vec![":OUTP 0"]);
        assert_eq!(dev.adapter().reads, 0);
    }

    #[tokio::test]
    async fn test_is_enabled() {
        let mut dev = device(&["1", "0", "1"]);
        assert!(dev.is_enabled().await.expect("status"));
        assert!(!dev.is_enabled().await.expect("status"));
        assert!(dev.is_enabled().await.expect("status"));
        assert_eq!(dev.adapter().writes, vec![":OUTP?"; 3]);

        let mut dev = device(&["ON"]);
        assert!(matches!(dev.is_enabled().await, Err(ProtoError::Parse(_))));
    }

    #[tokio::test]
    async fn test_check_errors_empty_queue() {
        let sink = RecordingSink::default();
        let mut dev = Device::new(
            MockAdapter::new(&["0,No error"]),
            DeviceOptions::default().with_sink(sink.clone()),
        );
        assert!(dev.check_errors().await.expect("errors").is_empty());
        assert_eq!(dev.adapter().writes, vec![":SYST:ERR?"]);
        assert!(sink.entries().is_empty());
    }

    #[tokio::test]
    async fn test_check_errors_drains_queue() {
        let sink = RecordingSink::default();
        let mut dev = Device::new(
            MockAdapter::new(&["-113,Undefined header", "0,No error"]),
            DeviceOptions::default().with_sink(sink.clone()),
        );
        let errors = dev.check_errors().await.expect("errors");
        assert_eq!(
            errors,
            vec![ErrorEntry {
                code: -113,
                message: "Undefined header".to_string()
            }]
        );
        assert_eq!(dev.adapter().writes.len(), 2);

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].contains("-113"));
        assert!(entries[0].contains("Undefined header"));
        assert!(entries[0].starts_with(DEFAULT_NAME));
    }

    #[tokio::test]
    async fn test_check_errors_is_bounded() {
        let sink = RecordingSink::default();
        let mut dev = Device::new(
            MockAdapter::new(&["-100,Command error"; 5]),
            DeviceOptions::default()
                .with_sink(sink.clone())
                .with_error_queue_limit(3),
        );
        assert!(matches!(
            dev.check_errors().await,
            Err(ProtoError::ErrorQueueNotDrained { limit: 3 })
        ));
        assert_eq!(dev.adapter().writes.len(), 3);
        assert_eq!(sink.entries().len(), 3);
    }

    #[tokio::test]
    async fn test_check_errors_malformed() {
        let mut dev = device(&["No error"]);
        assert!(matches!(dev.check_errors().await, Err(ProtoError::Parse(_))));
    }

    #[tokio::test]
    async fn test_check_errors_bare_sentinel() {
        let sink = RecordingSink::default();
        let mut dev = Device::new(
            MockAdapter::new(&["-113,Undefined header", "+0"]),
            DeviceOptions::default().with_sink(sink.clone()),
        );
        assert_eq!(dev.check_errors().await.expect("errors").len(), 1);
        assert_eq!(dev.adapter().writes.len(), 2);
        assert_eq!(sink.entries().len(), 1);
    }

    #[test]
    fn test_transfer_configured_once() {
        let dev = Device::new(MockAdapter::new(&[]).configurable(), DeviceOptions::default());
        assert_eq!(dev.adapter().configured, vec![TransferConfig::ascii_float32()]);
        assert_eq!(dev.adapter().transfer_config(), TransferConfig::ascii_float32());
        assert!(dev.adapter().writes.is_empty());

        let mut adapter = ScpiAdapter::from_transport(FakeBuffer::new(Vec::new()));
        adapter.configure(TransferConfig {
            separator: ';',
            ..TransferConfig::default()
        });
        let dev = Device::new(adapter, DeviceOptions::default());
        assert_eq!(dev.adapter().transfer_config(), TransferConfig::ascii_float32());
    }

    #[test]
    fn test_transfer_capability_missing() {
        let dev = device(&[]);
        assert!(dev.adapter().configured.is_empty());
        assert!(dev.adapter().writes.is_empty());
        assert_eq!(dev.name(), DEFAULT_NAME);
    }

    #[tokio::test]
    async fn test_ident_reset_clear() {
        let mut dev = device(&[
            "Keysight Technologies,34465A,MY57500001,A.03.01-03.15-03.01-00.52-02-01",
        ]);
        let ident = dev.ident().await.expect("ident");
        assert_eq!(ident.model, "34465A");
        dev.reset().await.expect("reset");
        dev.clear().await.expect("clear");
        assert_eq!(dev.adapter().writes, vec!["*IDN?", "*RST", "*CLS"]);
        assert_eq!(dev.adapter().reads, 1);
    }

    #[tokio::test]
    async fn test_over_scpi_stream() {
        let fake = FakeBuffer::new(
            &b"+1.50000000E-03\n1\n-221,\"Settings conflict\"\n+0,\"No error\"\n"[..],
        );
        let written = fake.written();
        let sink = RecordingSink::default();
        let mut dev = Device::new(
            ScpiAdapter::from_transport(fake),
            DeviceOptions::default()
                .with_name("bench dmm")
                .with_sink(sink.clone()),
        );

        assert_eq!(dev.current_dc().await.expect("current_dc"), 1.5e-3);
        assert!(dev.is_enabled().await.expect("status"));
        assert_eq!(dev.check_errors().await.expect("errors").len(), 1);
        assert_eq!(sink.entries(), vec!["bench dmm: -221: Settings conflict"]);
        assert_eq!(
            &written.lock().expect("lock")[..],
            &b":MEASure:CURRent:DC\n:OUTP?\n:SYST:ERR?\n:SYST:ERR?\n"[..]
        );
    }
}
