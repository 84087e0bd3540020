// NFS WRITE Procedure (Procedure 7)
//
// Writes data to a regular file. Data is synced before the reply, so every
// write is reported as FILE_SYNC regardless of the requested stability.

use std::io::{Seek, SeekFrom, Write};

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;
use xdr_codec::Pack;

use crate::fsal::{FsError, OpenFlags};
use crate::protocol::ProtocolResult;
use crate::protocol::v3::nfs::{NfsMessage, WRITE3args, nfsstat3, stable_how, wcc_data};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::{Target, WRITE_VERIFIER, status_for};

/// Handle NFS WRITE procedure (procedure 7)
///
/// # Arguments
/// * `xid` - Transaction ID from the request
/// * `args_data` - Serialized WRITE3args (file handle, offset, stability, data)
/// * `handler` - Session handler resolving the handle
///
/// # Returns
/// Serialized RPC reply with the byte count and write verifier
pub async fn handle_write(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS WRITE called (xid={})", xid);

    let args: WRITE3args = NfsMessage::deserialize_args(args_data)?;
    debug!(
        "WRITE: offset={}, count={}, stable={:?}, data_len={}",
        args.offset,
        args.count,
        args.stable,
        args.data.len()
    );

    let target = match Target::resolve(handler, &args.file) {
        Ok(target) => target,
        Err(status) => {
            let res_data = NfsMessage::create_wcc_error_response(status, &wcc_data::default())?;
            return Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?);
        }
    };

    let before = target.wcc_attr();
    let res_data = match write(&target, &args) {
        Ok(count) => {
            debug!("WRITE success: {} bytes to {}", count, target.path);
            serialize_write_ok(&target.wcc_data(before), count)?
        }
        Err(status) => {
            debug!("WRITE failed for {}: {:?}", target.path, status);
            NfsMessage::create_wcc_error_response(status, &target.wcc_data(before))?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn write(target: &Target, args: &WRITE3args) -> Result<u32, nfsstat3> {
    if !target.is_writable() {
        return Err(nfsstat3::NFS3ERR_ROFS);
    }

    let info = target.stat().map_err(|e| status_for(&e))?;
    if info.is_dir() {
        return Err(nfsstat3::NFS3ERR_ISDIR);
    }

    // count and the opaque length must agree; write the smaller
    let len = (args.count as usize).min(args.data.len());
    let data = &args.data[..len];

    let mut file = target
        .fs
        .open_file(&target.path, OpenFlags::read_write(), 0)
        .map_err(|e| status_for(&e))?;
    file.seek(SeekFrom::Start(args.offset))
        .map_err(|_| nfsstat3::NFS3ERR_IO)?;
    file.write_all(data)
        .map_err(|e| status_for(&FsError::from(e)))?;
    file.sync().map_err(|e| status_for(&e))?;

    Ok(len as u32)
}

fn serialize_write_ok(file_wcc: &wcc_data, count: u32) -> ProtocolResult<BytesMut> {
    let mut buf = Vec::new();
    nfsstat3::NFS3_OK.pack(&mut buf)?;
    file_wcc.pack(&mut buf)?;
    count.pack(&mut buf)?;
    stable_how::FILE_SYNC.pack(&mut buf)?;
    WRITE_VERIFIER.pack(&mut buf)?;
    Ok(BytesMut::from(&buf[..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfs::test_support::{self, handle, pack, session, u32_at, u64_at};
    use std::fs;

    fn args(file: crate::protocol::v3::nfs::fhandle3, offset: u64, data: &[u8]) -> WRITE3args {
        WRITE3args {
            file,
            offset,
            count: data.len() as u32,
            stable: stable_how::UNSTABLE,
            data: data.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_write_and_overwrite() {
        let (handler, temp_dir) = session(false);
        fs::write(temp_dir.path().join("f"), b"hello world").unwrap();

        let reply = handle_write(1, &pack(&args(handle(&handler, &["f"]), 6, b"WORLD")), &handler)
            .await
            .unwrap();

        assert_eq!(test_support::status(&reply), 0);
        assert_eq!(fs::read(temp_dir.path().join("f")).unwrap(), b"hello WORLD");

        // count, committed and verifier close the reply
        let tail = reply.len() - 16;
        assert_eq!(u32_at(&reply, tail), 5);
        assert_eq!(u32_at(&reply, tail + 4), stable_how::FILE_SYNC as u32);
        assert_eq!(u64_at(&reply, tail + 8), WRITE_VERIFIER);
    }

    #[tokio::test]
    async fn test_write_extends_file() {
        let (handler, temp_dir) = session(false);
        fs::write(temp_dir.path().join("f"), b"ab").unwrap();

        let reply = handle_write(1, &pack(&args(handle(&handler, &["f"]), 4, b"z")), &handler)
            .await
            .unwrap();

        assert_eq!(test_support::status(&reply), 0);
        assert_eq!(fs::read(temp_dir.path().join("f")).unwrap(), b"ab\0\0z");
    }

    #[tokio::test]
    async fn test_write_read_only_export() {
        let (handler, temp_dir) = session(true);
        fs::write(temp_dir.path().join("f"), b"ab").unwrap();

        let reply = handle_write(1, &pack(&args(handle(&handler, &["f"]), 0, b"z")), &handler)
            .await
            .unwrap();

        assert_eq!(test_support::status(&reply), nfsstat3::NFS3ERR_ROFS as i32);
        assert_eq!(fs::read(temp_dir.path().join("f")).unwrap(), b"ab");
    }

    #[tokio::test]
    async fn test_write_directory() {
        let (handler, _temp_dir) = session(false);

        let reply = handle_write(1, &pack(&args(handle(&handler, &[]), 0, b"z")), &handler)
            .await
            .unwrap();

        assert_eq!(test_support::status(&reply), nfsstat3::NFS3ERR_ISDIR as i32);
    }
}
