// NFS GETATTR Procedure (Procedure 1)
//
// Returns file attributes for a given file handle

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;
use xdr_codec::Pack;

use crate::protocol::ProtocolResult;
use crate::protocol::v3::nfs::{GETATTR3args, NfsMessage, fattr3, nfsstat3};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::{Target, status_for};

/// Handle NFS GETATTR procedure (procedure 1)
///
/// # Arguments
/// * `xid` - Transaction ID from the request
/// * `args_data` - Serialized GETATTR3args (contains file handle)
/// * `handler` - Session handler resolving the handle
///
/// # Returns
/// Serialized RPC reply message with file attributes
pub async fn handle_getattr(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS GETATTR called (xid={})", xid);

    let args: GETATTR3args = NfsMessage::deserialize_args(args_data)?;

    let res_data = match getattr(handler, &args) {
        Ok(attrs) => {
            debug!(
                "GETATTR success: type={:?}, size={}, mode={:o}",
                attrs.type_, attrs.size, attrs.mode
            );
            serialize_getattr_ok(&attrs)?
        }
        Err(status) => {
            debug!("GETATTR failed: {:?}", status);
            NfsMessage::create_status_response(status)?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn getattr(handler: &dyn NfsHandler, args: &GETATTR3args) -> Result<fattr3, nfsstat3> {
    let target = Target::resolve(handler, &args.object)?;
    target.attributes().map_err(|e| status_for(&e))
}

fn serialize_getattr_ok(attrs: &fattr3) -> ProtocolResult<BytesMut> {
    let mut buf = Vec::new();
    nfsstat3::NFS3_OK.pack(&mut buf)?;
    attrs.pack(&mut buf)?;
    Ok(BytesMut::from(&buf[..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfs::test_support::{self, REPLY_HEADER, handle, pack, session, u32_at, u64_at};
    use crate::protocol::v3::nfs::{fhandle3, handle_args};
    use std::fs;

    #[tokio::test]
    async fn test_getattr_root() {
        let (handler, _temp_dir) = session(false);
        let args = handle_args {
            object: handle(&handler, &[]),
        };

        let reply = handle_getattr(12345, &pack(&args), &handler)
            .await
            .expect("GETATTR should succeed for root");

        assert_eq!(test_support::status(&reply), 0);
        // ftype3 follows the status
        assert_eq!(u32_at(&reply, REPLY_HEADER + 4), 2);
    }

    #[tokio::test]
    async fn test_getattr_file_size_and_fileid() {
        let (handler, temp_dir) = session(false);
        fs::write(temp_dir.path().join("data.txt"), b"0123456789").unwrap();
        let args = handle_args {
            object: handle(&handler, &["data.txt"]),
        };

        let reply = handle_getattr(1, &pack(&args), &handler).await.unwrap();

        let attrs = REPLY_HEADER + 4;
        assert_eq!(u32_at(&reply, attrs), 1);
        assert_eq!(u64_at(&reply, attrs + 20), 10);
        assert_eq!(
            u64_at(&reply, attrs + 52),
            crate::nfs::fileid_for(&test_support::components(&["data.txt"]))
        );
    }

    #[tokio::test]
    async fn test_getattr_unknown_handle_is_stale() {
        let (handler, _temp_dir) = session(false);
        let args = handle_args {
            object: fhandle3(vec![0xee; 32]),
        };

        let reply = handle_getattr(1, &pack(&args), &handler).await.unwrap();

        assert_eq!(test_support::status(&reply), nfsstat3::NFS3ERR_STALE as i32);
        assert_eq!(reply.len(), REPLY_HEADER + 4);
    }

    #[tokio::test]
    async fn test_getattr_removed_file() {
        let (handler, _temp_dir) = session(false);
        let args = handle_args {
            object: handle(&handler, &["gone.txt"]),
        };

        let reply = handle_getattr(1, &pack(&args), &handler).await.unwrap();

        assert_eq!(test_support::status(&reply), nfsstat3::NFS3ERR_NOENT as i32);
    }

    #[tokio::test]
    async fn test_getattr_garbage_args() {
        let (handler, _temp_dir) = session(false);
        assert!(handle_getattr(1, &[0, 0], &handler).await.is_err());
    }
}
