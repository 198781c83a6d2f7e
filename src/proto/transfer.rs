use byteorder::{BigEndian, ByteOrder};

use super::{response::Value, ProtoError, Result};

/// Element type of binary block transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Float32,
    Float64,
}

impl DataType {
    pub fn size(&self) -> usize {
        match self {
            DataType::Int8 => 1,
            DataType::Int16 => 2,
            DataType::Int32 | DataType::Float32 => 4,
            DataType::Float64 => 8,
        }
    }
}

/// How multi-value responses are framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    pub is_binary: bool,
    pub datatype: DataType,
    pub separator: char,
}

impl TransferConfig {
    /// ASCII framing, comma separated, 32-bit float elements.
    pub const fn ascii_float32() -> Self {
        Self {
            is_binary: false,
            datatype: DataType::Float32,
            separator: ',',
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self::ascii_float32()
    }
}

/// Split an ASCII response into fields.
///
/// An empty line yields no values.
pub fn parse_ascii(line: &str, config: &TransferConfig) -> Vec<Value> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }
    line.split(config.separator).map(Value::parse).collect()
}

/// Decode the payload of a definite-length block.
///
/// Elements are in the instrument's default (big-endian) byte order.
pub fn decode_block(data: &[u8], config: &TransferConfig) -> Result<Vec<Value>> {
    let size = config.datatype.size();
    if data.len() % size != 0 {
        return Err(ProtoError::Parse(format!(
            "Block of {} bytes is not a multiple of {:?} ({} bytes)",
            data.len(),
            config.datatype,
            size
        )));
    }

    Ok(data
        .chunks_exact(size)
        .map(|elem| {
            let n = match config.datatype {
                DataType::Int8 => f64::from(elem[0] as i8),
                DataType::Int16 => f64::from(BigEndian::read_i16(elem)),
                DataType::Int32 => f64::from(BigEndian::read_i32(elem)),
                DataType::Float32 => f64::from(BigEndian::read_f32(elem)),
                DataType::Float64 => BigEndian::read_f64(elem),
            };
            Value::Number(n)
        })
        .collect())
}
