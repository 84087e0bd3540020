// NFS COMMIT Procedure (Procedure 21)
//
// WRITE replies are always FILE_SYNC, so there is never uncommitted data;
// COMMIT only reports the file's attributes and the write verifier.

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;
use xdr_codec::Pack;

use crate::protocol::ProtocolResult;
use crate::protocol::v3::nfs::{COMMIT3args, NfsMessage, nfsstat3, wcc_data};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::{Target, WRITE_VERIFIER, status_for};

/// Handle NFS COMMIT procedure (procedure 21)
pub async fn handle_commit(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS COMMIT called (xid={})", xid);

    let args: COMMIT3args = NfsMessage::deserialize_args(args_data)?;
    debug!("COMMIT: offset={}, count={}", args.offset, args.count);

    let target = match Target::resolve(handler, &args.file) {
        Ok(target) => target,
        Err(status) => {
            let res_data = NfsMessage::create_wcc_error_response(status, &wcc_data::default())?;
            return Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?);
        }
    };

    let before = target.wcc_attr();
    let res_data = match target.stat() {
        Ok(_) => serialize_commit_ok(&target.wcc_data(before))?,
        Err(e) => {
            debug!("COMMIT failed for {}: {}", target.path, e);
            NfsMessage::create_wcc_error_response(status_for(&e), &target.wcc_data(before))?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn serialize_commit_ok(file_wcc: &wcc_data) -> ProtocolResult<BytesMut> {
    let mut buf = Vec::new();
    nfsstat3::NFS3_OK.pack(&mut buf)?;
    file_wcc.pack(&mut buf)?;
    WRITE_VERIFIER.pack(&mut buf)?;
    Ok(BytesMut::from(&buf[..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfs::test_support::{self, handle, pack, session, u64_at};
    use crate::protocol::v3::nfs::range_args;
    use std::fs;

    #[tokio::test]
    async fn test_commit_returns_write_verifier() {
        let (handler, temp_dir) = session(false);
        fs::write(temp_dir.path().join("f"), b"x").unwrap();
        let args = range_args {
            file: handle(&handler, &["f"]),
            offset: 0,
            count: 0,
        };

        let reply = handle_commit(1, &pack(&args), &handler).await.unwrap();

        assert_eq!(test_support::status(&reply), 0);
        assert_eq!(u64_at(&reply, reply.len() - 8), WRITE_VERIFIER);
    }

    #[tokio::test]
    async fn test_commit_missing_file() {
        let (handler, _temp_dir) = session(false);
        let args = range_args {
            file: handle(&handler, &["missing"]),
            offset: 0,
            count: 0,
        };

        let reply = handle_commit(1, &pack(&args), &handler).await.unwrap();

        assert_eq!(test_support::status(&reply), nfsstat3::NFS3ERR_NOENT as i32);
    }
}
