// Protocol middleware layer
//
// Wire types for ONC RPC, MOUNT v3 and NFS v3, with serialization helpers
// built on xdr-codec primitives.

pub mod v3;

use std::io::Cursor;

use thiserror::Error;
use xdr_codec::Unpack;

// Re-export commonly used types
pub use v3::{MountMessage, NfsMessage, RpcMessage};

/// Malformed or unsupported wire data
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("XDR error: {0}")]
    Xdr(String),

    #[error("invalid {what} discriminant: {value}")]
    InvalidDiscriminant { what: &'static str, value: u32 },

    #[error("message too short: {0}")]
    Truncated(&'static str),
}

impl From<xdr_codec::Error> for ProtocolError {
    fn from(e: xdr_codec::Error) -> Self {
        ProtocolError::Xdr(e.to_string())
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Types that can be read off the wire
pub trait Decode: Sized {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self>;
}

/// Sequential XDR decoder over a byte slice
pub struct XdrReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> XdrReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    pub fn read_u32(&mut self) -> ProtocolResult<u32> {
        let (value, _) = u32::unpack(&mut self.cursor)?;
        Ok(value)
    }

    pub fn read_i32(&mut self) -> ProtocolResult<i32> {
        let (value, _) = i32::unpack(&mut self.cursor)?;
        Ok(value)
    }

    pub fn read_u64(&mut self) -> ProtocolResult<u64> {
        let (value, _) = u64::unpack(&mut self.cursor)?;
        Ok(value)
    }

    pub fn read_bool(&mut self) -> ProtocolResult<bool> {
        let (value, _) = bool::unpack(&mut self.cursor)?;
        Ok(value)
    }

    /// Variable-length opaque data of at most `max` bytes
    pub fn read_opaque(&mut self, max: usize) -> ProtocolResult<Vec<u8>> {
        let (value, _) = xdr_codec::unpack_opaque_flex(&mut self.cursor, Some(max))?;
        Ok(value)
    }

    /// String of at most `max` bytes
    pub fn read_string(&mut self, max: usize) -> ProtocolResult<String> {
        let (value, _) = xdr_codec::unpack_string(&mut self.cursor, Some(max))?;
        Ok(value)
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// Unconsumed input
    pub fn remaining(&self) -> &'a [u8] {
        let data = *self.cursor.get_ref();
        &data[self.position().min(data.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xdr_codec::Pack;

    #[test]
    fn test_reader_sequence() {
        let mut buf = Vec::new();
        7u32.pack(&mut buf).unwrap();
        (-2i32).pack(&mut buf).unwrap();
        u64::MAX.pack(&mut buf).unwrap();
        true.pack(&mut buf).unwrap();
        xdr_codec::pack_opaque_flex(&[1u8, 2, 3], Some(64), &mut buf).unwrap();
        xdr_codec::pack_string("name", Some(255), &mut buf).unwrap();
        buf.extend_from_slice(&[0xaa, 0xbb]);

        let mut reader = XdrReader::new(&buf);
        assert_eq!(reader.read_u32().unwrap(), 7);
        assert_eq!(reader.read_i32().unwrap(), -2);
        assert_eq!(reader.read_u64().unwrap(), u64::MAX);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_opaque(64).unwrap(), vec![1, 2, 3]);
        assert_eq!(reader.read_string(255).unwrap(), "name");
        assert_eq!(reader.remaining(), &[0xaa, 0xbb]);
        assert_eq!(reader.position(), buf.len() - 2);
    }

    #[test]
    fn test_reader_rejects_oversized_opaque() {
        let mut buf = Vec::new();
        xdr_codec::pack_opaque_flex(&[0u8; 65], None, &mut buf).unwrap();

        assert!(XdrReader::new(&buf).read_opaque(64).is_err());
    }

    #[test]
    fn test_reader_truncated_input() {
        let mut reader = XdrReader::new(&[0, 0]);
        assert!(matches!(reader.read_u32(), Err(ProtocolError::Xdr(_))));
    }
}
