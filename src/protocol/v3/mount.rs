// MOUNT v3 Protocol Middleware (RFC 1813, Appendix I)

use bytes::BytesMut;
use xdr_codec::Pack;

use crate::protocol::{ProtocolResult, XdrReader};
use crate::session::{AuthFlavor, MountStatus};

/// Maximum bytes in a path name
pub const MNTPATHLEN: usize = 1024;

/// Maximum bytes in a host name
pub const MNTNAMLEN: usize = 255;

/// Maximum bytes in a V3 file handle
pub const FHSIZE3: usize = 64;

/// Wrapper for MOUNT messages providing serialization helpers
pub struct MountMessage;

impl MountMessage {
    /// Deserialize the dirpath argument of MNT and UMNT
    pub fn deserialize_dirpath(data: &[u8]) -> ProtocolResult<String> {
        XdrReader::new(data).read_string(MNTPATHLEN)
    }

    /// Serialize a successful mountres3: handle plus accepted auth flavors
    pub fn serialize_mount_ok(fhandle: &[u8], auth_flavors: &[AuthFlavor]) -> ProtocolResult<BytesMut> {
        let mut buf = Vec::new();
        (MountStatus::Ok as u32).pack(&mut buf)?;
        xdr_codec::pack_opaque_flex(fhandle, Some(FHSIZE3), &mut buf)?;
        (auth_flavors.len() as u32).pack(&mut buf)?;
        for flavor in auth_flavors {
            (*flavor as u32).pack(&mut buf)?;
        }
        Ok(BytesMut::from(&buf[..]))
    }

    /// Serialize a failed mountres3 (status only)
    pub fn serialize_mount_error(status: MountStatus) -> ProtocolResult<BytesMut> {
        let mut buf = Vec::new();
        (status as u32).pack(&mut buf)?;
        Ok(BytesMut::from(&buf[..]))
    }

    /// Serialize a mountlist; this server does not track mounts
    pub fn serialize_empty_mountlist() -> ProtocolResult<BytesMut> {
        let mut buf = Vec::new();
        false.pack(&mut buf)?;
        Ok(BytesMut::from(&buf[..]))
    }

    /// Serialize an exports list with one entry per directory, open to all
    pub fn serialize_exports(dirs: &[&str]) -> ProtocolResult<BytesMut> {
        let mut buf = Vec::new();
        for dir in dirs {
            true.pack(&mut buf)?;
            xdr_codec::pack_string(dir, Some(MNTPATHLEN), &mut buf)?;
            // groups: empty list
            false.pack(&mut buf)?;
        }
        false.pack(&mut buf)?;
        Ok(BytesMut::from(&buf[..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(bytes: &[u8]) -> Vec<u32> {
        bytes
            .chunks(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn test_deserialize_dirpath() {
        let mut buf = Vec::new();
        xdr_codec::pack_string("/export", None, &mut buf).unwrap();
        assert_eq!(MountMessage::deserialize_dirpath(&buf).unwrap(), "/export");
    }

    #[test]
    fn test_deserialize_dirpath_too_long() {
        let mut buf = Vec::new();
        let long = "a".repeat(MNTPATHLEN + 1);
        xdr_codec::pack_string(&long, None, &mut buf).unwrap();
        assert!(MountMessage::deserialize_dirpath(&buf).is_err());
    }

    #[test]
    fn test_mount_ok_layout() {
        let res = MountMessage::serialize_mount_ok(&[0xab; 32], &[AuthFlavor::Null]).unwrap();
        let w = words(&res);
        assert_eq!(w[0], 0);
        assert_eq!(w[1], 32);
        assert_eq!(&w[10..], &[1, 0]);
    }

    #[test]
    fn test_exports_layout() {
        let res = MountMessage::serialize_exports(&["/"]).unwrap();
        // follows, len("/"), "/" padded, no groups, end of list
        assert_eq!(words(&res), vec![1, 1, 0x2f00_0000, 0, 0]);
    }
}
