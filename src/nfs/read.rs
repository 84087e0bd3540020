// NFS READ Procedure (Procedure 6)
//
// Reads data from a regular file

use std::io::{Read, Seek, SeekFrom};

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;
use xdr_codec::Pack;

use crate::protocol::ProtocolResult;
use crate::protocol::v3::nfs::{
    NFS3_MAXDATA, NfsMessage, READ3args, fattr3, nfsstat3, post_op_attr,
};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::{Target, status_for};

struct ReadResult {
    attrs: post_op_attr,
    data: Vec<u8>,
    eof: bool,
}

/// Handle NFS READ procedure (procedure 6)
///
/// # Arguments
/// * `xid` - Transaction ID from the request
/// * `args_data` - Serialized READ3args (file handle, offset, count)
/// * `handler` - Session handler resolving the handle
///
/// # Returns
/// Serialized RPC reply with up to `count` bytes and an EOF flag
pub async fn handle_read(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS READ called (xid={})", xid);

    let args: READ3args = NfsMessage::deserialize_args(args_data)?;
    debug!("READ: offset={}, count={}", args.offset, args.count);

    let target = match Target::resolve(handler, &args.file) {
        Ok(target) => target,
        Err(status) => {
            let res_data = NfsMessage::create_attr_error_response(status, post_op_attr::default())?;
            return Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?);
        }
    };

    let res_data = match read(&target, args.offset, args.count) {
        Ok(result) => {
            debug!(
                "READ success: {} bytes from {}, eof={}",
                result.data.len(),
                target.path,
                result.eof
            );
            serialize_read_ok(&result)?
        }
        Err(status) => {
            debug!("READ failed for {}: {:?}", target.path, status);
            NfsMessage::create_attr_error_response(status, target.post_op_attr())?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn read(target: &Target, offset: u64, count: u32) -> Result<ReadResult, nfsstat3> {
    let info = target.stat().map_err(|e| status_for(&e))?;
    if info.is_dir() {
        return Err(nfsstat3::NFS3ERR_ISDIR);
    }
    let attrs: fattr3 = target.fattr3(&info);

    let wanted = count.min(NFS3_MAXDATA) as usize;
    let mut data = vec![0u8; wanted];
    let mut filled = 0;

    if offset < info.size && wanted > 0 {
        let mut file = target.fs.open(&target.path).map_err(|e| status_for(&e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|_| nfsstat3::NFS3ERR_IO)?;

        while filled < wanted {
            match file.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => return Err(nfsstat3::NFS3ERR_IO),
            }
        }
    }
    data.truncate(filled);

    let eof = offset.saturating_add(filled as u64) >= info.size;
    Ok(ReadResult {
        attrs: post_op_attr(Some(attrs)),
        data,
        eof,
    })
}

fn serialize_read_ok(result: &ReadResult) -> ProtocolResult<BytesMut> {
    let mut buf = Vec::new();
    nfsstat3::NFS3_OK.pack(&mut buf)?;
    result.attrs.pack(&mut buf)?;
    (result.data.len() as u32).pack(&mut buf)?;
    result.eof.pack(&mut buf)?;
    xdr_codec::pack_opaque_flex(&result.data, None, &mut buf)?;
    Ok(BytesMut::from(&buf[..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfs::test_support::{self, REPLY_HEADER, handle, pack, session, u32_at};
    use crate::protocol::v3::nfs::{FATTR3_SIZE, range_args};
    use std::fs;

    /// (count, eof, data) of a successful READ reply
    fn parse(reply: &[u8]) -> (u32, bool, Vec<u8>) {
        let base = REPLY_HEADER + 8 + FATTR3_SIZE;
        let count = u32_at(reply, base);
        let eof = u32_at(reply, base + 4) == 1;
        let len = u32_at(reply, base + 8) as usize;
        (count, eof, reply[base + 12..base + 12 + len].to_vec())
    }

    #[tokio::test]
    async fn test_read_whole_file() {
        let (handler, temp_dir) = session(false);
        fs::write(temp_dir.path().join("f"), b"hello world").unwrap();
        let args = range_args {
            file: handle(&handler, &["f"]),
            offset: 0,
            count: 4096,
        };

        let reply = handle_read(1, &pack(&args), &handler).await.unwrap();

        assert_eq!(test_support::status(&reply), 0);
        assert_eq!(parse(&reply), (11, true, b"hello world".to_vec()));
    }

    #[tokio::test]
    async fn test_read_partial_range() {
        let (handler, temp_dir) = session(false);
        fs::write(temp_dir.path().join("f"), b"hello world").unwrap();
        let args = range_args {
            file: handle(&handler, &["f"]),
            offset: 6,
            count: 3,
        };

        let reply = handle_read(1, &pack(&args), &handler).await.unwrap();

        assert_eq!(parse(&reply), (3, false, b"wor".to_vec()));
    }

    #[tokio::test]
    async fn test_read_past_end() {
        let (handler, temp_dir) = session(false);
        fs::write(temp_dir.path().join("f"), b"abc").unwrap();
        let args = range_args {
            file: handle(&handler, &["f"]),
            offset: 100,
            count: 10,
        };

        let reply = handle_read(1, &pack(&args), &handler).await.unwrap();

        assert_eq!(parse(&reply), (0, true, Vec::new()));
    }

    #[tokio::test]
    async fn test_read_directory() {
        let (handler, _temp_dir) = session(false);
        let args = range_args {
            file: handle(&handler, &[]),
            offset: 0,
            count: 10,
        };

        let reply = handle_read(1, &pack(&args), &handler).await.unwrap();

        assert_eq!(test_support::status(&reply), nfsstat3::NFS3ERR_ISDIR as i32);
    }
}
