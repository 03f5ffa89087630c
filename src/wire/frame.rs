//! Length-prefixed frame codec
//!
//! ```text
//! offset  size  field
//! 0       4     magic "ECTL"
//! 4       1     version (1)
//! 5       1     kind
//! 6       2     reserved, zero
//! 8       4     payload length, u32 little-endian
//! 12      len   bincode payload
//! ```

use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ControlError, Result};

pub const MAGIC: [u8; 4] = *b"ECTL";
pub const PROTOCOL_VERSION: u8 = 1;
pub const HEADER_LEN: usize = 12;
pub const MAX_PAYLOAD: usize = 64 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    Hello = 1,
    HelloAck = 2,
    Measurement = 3,
    ControlOutput = 4,
}

impl FrameKind {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(FrameKind::Hello),
            2 => Ok(FrameKind::HelloAck),
            3 => Ok(FrameKind::Measurement),
            4 => Ok(FrameKind::ControlOutput),
            other => Err(ControlError::Frame(format!("unknown frame kind {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: FrameKind,
    pub len: u32,
}

impl FrameHeader {
    pub fn encode(&self) -> Result<[u8; HEADER_LEN]> {
        let mut buf = [0u8; HEADER_LEN];
        let mut cursor = Cursor::new(&mut buf[..]);
        cursor.write_all(&MAGIC)?;
        cursor.write_u8(PROTOCOL_VERSION)?;
        cursor.write_u8(self.kind as u8)?;
        cursor.write_u16::<LittleEndian>(0)?;
        cursor.write_u32::<LittleEndian>(self.len)?;
        Ok(buf)
    }

    pub fn decode(buf: &[u8; HEADER_LEN]) -> Result<Self> {
        if buf[..4] != MAGIC {
            return Err(ControlError::Frame(format!("bad magic {:02x?}", &buf[..4])));
        }
        let mut cursor = Cursor::new(&buf[4..]);
        let version = cursor.read_u8()?;
        if version != PROTOCOL_VERSION {
            return Err(ControlError::Frame(format!(
                "unsupported protocol version {}",
                version
            )));
        }
        let kind = FrameKind::from_u8(cursor.read_u8()?)?;
        let _reserved = cursor.read_u16::<LittleEndian>()?;
        let len = cursor.read_u32::<LittleEndian>()?;
        if len as usize > MAX_PAYLOAD {
            return Err(ControlError::Frame(format!(
                "payload of {} bytes exceeds limit of {}",
                len, MAX_PAYLOAD
            )));
        }
        Ok(Self { kind, len })
    }
}

/// Serialize `payload` and write one complete frame, then flush.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, kind: FrameKind, payload: &T) -> Result<()> {
    let body = bincode::serialize(payload)?;
    if body.len() > MAX_PAYLOAD {
        return Err(ControlError::Frame(format!(
            "payload of {} bytes exceeds limit of {}",
            body.len(),
            MAX_PAYLOAD
        )));
    }
    let header = FrameHeader {
        kind,
        len: body.len() as u32,
    }
    .encode()?;

    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&header);
    frame.extend_from_slice(&body);
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame. `Ok(None)` on a clean end of stream before the header.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<(FrameKind, Vec<u8>)>> {
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(ControlError::Frame(format!(
                    "stream closed after {} header bytes",
                    filled
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let header = FrameHeader::decode(&header)?;
    let mut body = vec![0u8; header.len as usize];
    reader.read_exact(&mut body).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            ControlError::Frame(format!("stream closed inside a {} byte payload", header.len))
        } else {
            e.into()
        }
    })?;
    Ok(Some((header.kind, body)))
}

/// Read one frame of kind `expected` and decode its payload.
pub fn read_expected<R: Read, T: DeserializeOwned>(
    reader: &mut R,
    expected: FrameKind,
) -> Result<Option<T>> {
    match read_frame(reader)? {
        None => Ok(None),
        Some((kind, body)) if kind == expected => Ok(Some(bincode::deserialize(&body)?)),
        Some((kind, _)) => Err(ControlError::Protocol(format!(
            "expected {:?} frame, received {:?}",
            expected, kind
        ))),
    }
}
