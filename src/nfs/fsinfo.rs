// NFS FSINFO Procedure (Procedure 19)
//
// Returns static filesystem information

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;
use xdr_codec::Pack;

use crate::protocol::ProtocolResult;
use crate::protocol::v3::nfs::{FSINFO3args, NFS3_MAXDATA, NfsMessage, nfsstat3, post_op_attr};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::{Target, status_for};

// FSINFO property constants
const FSF3_HOMOGENEOUS: u32 = 0x0008; // PATHCONF is valid for all files
const FSF3_CANSETTIME: u32 = 0x0010; // Server can set time on server

const PREFERRED_IO_SIZE: u32 = 64 * 1024;
const IO_MULTIPLE: u32 = 4096;
const PREFERRED_READDIR_SIZE: u32 = 8192;

/// Handle NFS FSINFO procedure (procedure 19)
///
/// Returns static filesystem information such as maximum sizes and capabilities.
///
/// # Arguments
/// * `xid` - Transaction ID from the request
/// * `args_data` - Serialized FSINFO3args (fsroot handle)
/// * `handler` - Session handler resolving the handle
///
/// # Returns
/// Serialized RPC reply message with filesystem information
pub async fn handle_fsinfo(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS FSINFO called (xid={})", xid);

    let args: FSINFO3args = NfsMessage::deserialize_args(args_data)?;

    let res_data = match fsinfo(handler, &args) {
        Ok(attrs) => serialize_fsinfo_ok(&attrs)?,
        Err(status) => {
            debug!("FSINFO failed: {:?}", status);
            NfsMessage::create_attr_error_response(status, post_op_attr::default())?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn fsinfo(handler: &dyn NfsHandler, args: &FSINFO3args) -> Result<post_op_attr, nfsstat3> {
    let target = Target::resolve(handler, &args.object)?;
    let attrs = target.attributes().map_err(|e| status_for(&e))?;
    Ok(post_op_attr(Some(attrs)))
}

fn serialize_fsinfo_ok(attrs: &post_op_attr) -> ProtocolResult<BytesMut> {
    let mut buf = Vec::new();
    nfsstat3::NFS3_OK.pack(&mut buf)?;
    attrs.pack(&mut buf)?;
    // rtmax, rtpref, rtmult
    NFS3_MAXDATA.pack(&mut buf)?;
    PREFERRED_IO_SIZE.pack(&mut buf)?;
    IO_MULTIPLE.pack(&mut buf)?;
    // wtmax, wtpref, wtmult
    NFS3_MAXDATA.pack(&mut buf)?;
    PREFERRED_IO_SIZE.pack(&mut buf)?;
    IO_MULTIPLE.pack(&mut buf)?;
    PREFERRED_READDIR_SIZE.pack(&mut buf)?;
    // maxfilesize
    u64::MAX.pack(&mut buf)?;
    // time_delta: microsecond timestamps
    0u32.pack(&mut buf)?;
    1000u32.pack(&mut buf)?;
    (FSF3_HOMOGENEOUS | FSF3_CANSETTIME).pack(&mut buf)?;
    Ok(BytesMut::from(&buf[..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfs::test_support::{self, REPLY_HEADER, handle, pack, session, u32_at, u64_at};
    use crate::protocol::v3::nfs::{FATTR3_SIZE, fhandle3, handle_args};

    #[tokio::test]
    async fn test_fsinfo_limits() {
        let (handler, _temp_dir) = session(false);
        let args = handle_args {
            object: handle(&handler, &[]),
        };

        let reply = handle_fsinfo(1, &pack(&args), &handler).await.unwrap();

        assert_eq!(test_support::status(&reply), 0);
        let base = REPLY_HEADER + 8 + FATTR3_SIZE;
        assert_eq!(u32_at(&reply, base), NFS3_MAXDATA);
        assert_eq!(u32_at(&reply, base + 12), NFS3_MAXDATA);
        assert_eq!(u32_at(&reply, base + 24), PREFERRED_READDIR_SIZE);
        assert_eq!(u64_at(&reply, base + 28), u64::MAX);
        assert_eq!(u32_at(&reply, base + 44), 0x18);
        assert_eq!(reply.len(), base + 48);
    }

    #[tokio::test]
    async fn test_fsinfo_stale_handle() {
        let (handler, _temp_dir) = session(false);
        let args = handle_args {
            object: fhandle3(vec![1; 32]),
        };

        let reply = handle_fsinfo(1, &pack(&args), &handler).await.unwrap();

        assert_eq!(test_support::status(&reply), nfsstat3::NFS3ERR_STALE as i32);
    }
}
