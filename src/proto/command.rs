use std::fmt;

/// Every command string the driver sends to the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // IEEE 488.2 common commands
    Id,
    Reset,
    ClearStatus,
    // Measurements
    MeasureCurrentDc,
    MeasureCurrentAc,
    MeasureVoltageDc,
    MeasureVoltageAc,
    // Output relay
    GetOutput,
    SetOutput(bool),
    // Error queue
    NextError,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Id => f.write_str("*IDN?"),
            Command::Reset => f.write_str("*RST"),
            Command::ClearStatus => f.write_str("*CLS"),
            Command::MeasureCurrentDc => f.write_str(":MEASure:CURRent:DC"),
            Command::MeasureCurrentAc => f.write_str(":MEASure:CURRent:AC"),
            Command::MeasureVoltageDc => f.write_str(":MEASure:VOLTage:DC"),
            Command::MeasureVoltageAc => f.write_str(":MEASure:VOLTage:AC"),
            Command::GetOutput => f.write_str(":OUTP?"),
            Command::SetOutput(on) => write!(f, ":OUTP {}", u8::from(*on)),
            Command::NextError => f.write_str(":SYST:ERR?"),
        }
    }
}
