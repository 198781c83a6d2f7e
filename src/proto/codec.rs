use bytes::{BufMut, BytesMut};
use std::{io, str};
use tokio_util::codec::{Decoder, Encoder};

use super::response::Reply;

/// Upper bound for a single reply. Keeps a misbehaving peer from
/// growing the read buffer without limit.
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Frames SCPI program messages and responses.
pub struct ScpiCodec {
    write_termination: &'static str,
}

impl Default for ScpiCodec {
    fn default() -> Self {
        Self {
            write_termination: "\n",
        }
    }
}

impl ScpiCodec {
    /// Header of a definite-length block: number of bytes taken by
    /// `#<n><len>` and the payload length, if enough bytes are buffered.
    pub(crate) fn block_header(src: &BytesMut) -> io::Result<Option<(usize, usize)>> {
        if src.len() < 2 {
            return Ok(None);
        }
        let digits = (src[1] as char)
            .to_digit(10)
            .ok_or_else(|| invalid_data("Block header length digit expected"))?
            as usize;
        if digits == 0 {
            return Err(invalid_data("Indefinite-length blocks are not supported"));
        }
        if src.len() < 2 + digits {
            return Ok(None);
        }
        let len = str::from_utf8(&src[2..2 + digits])
            .map_err(invalid_data)?
            .parse::<usize>()
            .map_err(invalid_data)?;
        if len > MAX_FRAME_LEN {
            return Err(invalid_data(format!("Block of {} bytes exceeds limit", len)));
        }
        Ok(Some((2 + digits, len)))
    }

    fn decode_block(src: &mut BytesMut) -> io::Result<Option<Reply>> {
        let (header, len) = match Self::block_header(src)? {
            Some(h) => h,
            None => return Ok(None),
        };
        // Payload is followed by the response terminator.
        if src.len() < header + len + 1 {
            src.reserve(header + len + 1 - src.len());
            return Ok(None);
        }
        if src[header + len] != b'\n' {
            return Err(invalid_data("Block is not followed by a line terminator"));
        }
        let _ = src.split_to(header);
        let payload = src.split_to(len).freeze();
        let _ = src.split_to(1);
        Ok(Some(Reply::Block(payload)))
    }

    fn decode_line(src: &mut BytesMut) -> io::Result<Option<Reply>> {
        match src.iter().position(|b| *b == b'\n') {
            Some(n) => {
                let line = src.split_to(n + 1);
                let line = str::from_utf8(&line[..n]).map_err(invalid_data)?;
                Ok(Some(Reply::Line(line.trim_end_matches('\r').to_string())))
            }
            None if src.len() > MAX_FRAME_LEN => {
                Err(invalid_data("Response line exceeds limit"))
            }
            None => Ok(None),
        }
    }
}

fn invalid_data<E>(err: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, err)
}

impl Decoder for ScpiCodec {
    type Item = Reply;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match src.first().copied() {
            None => Ok(None),
            Some(b'#') => Self::decode_block(src),
            Some(_) => Self::decode_line(src),
        }
    }
}

impl Encoder<String> for ScpiCodec {
    type Error = io::Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.contains('\n') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Command must not contain a line terminator",
            ));
        }
        dst.reserve(item.len() + self.write_termination.len());
        dst.put_slice(item.as_bytes());
        dst.put_slice(self.write_termination.as_bytes());
        Ok(())
    }
}
