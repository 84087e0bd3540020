// NFS ACCESS Procedure (Procedure 4)
//
// Reports which of the requested access rights the server would grant.
// Permission checks are left to the backing store; only the write bits
// are withheld on a read-only export.

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;
use xdr_codec::Pack;

use crate::protocol::ProtocolResult;
use crate::protocol::v3::nfs::{ACCESS3args, NfsMessage, fattr3, nfsstat3, post_op_attr};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::{Target, status_for};

pub const ACCESS3_READ: u32 = 0x0001;
pub const ACCESS3_LOOKUP: u32 = 0x0002;
pub const ACCESS3_MODIFY: u32 = 0x0004;
pub const ACCESS3_EXTEND: u32 = 0x0008;
pub const ACCESS3_DELETE: u32 = 0x0010;
pub const ACCESS3_EXECUTE: u32 = 0x0020;

const WRITE_ACCESS: u32 = ACCESS3_MODIFY | ACCESS3_EXTEND | ACCESS3_DELETE;

/// Handle NFS ACCESS procedure (procedure 4)
pub async fn handle_access(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS ACCESS called (xid={})", xid);

    let args: ACCESS3args = NfsMessage::deserialize_args(args_data)?;

    let res_data = match access(handler, &args) {
        Ok((attrs, granted)) => {
            debug!("ACCESS: requested={:#x}, granted={:#x}", args.access, granted);
            serialize_access_ok(&attrs, granted)?
        }
        Err(status) => {
            debug!("ACCESS failed: {:?}", status);
            NfsMessage::create_attr_error_response(status, post_op_attr::default())?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn access(handler: &dyn NfsHandler, args: &ACCESS3args) -> Result<(fattr3, u32), nfsstat3> {
    let target = Target::resolve(handler, &args.object)?;
    let attrs = target.attributes().map_err(|e| status_for(&e))?;

    let mut granted = args.access;
    if !target.is_writable() {
        granted &= !WRITE_ACCESS;
    }

    Ok((attrs, granted))
}

fn serialize_access_ok(attrs: &fattr3, access: u32) -> ProtocolResult<BytesMut> {
    let mut buf = Vec::new();
    nfsstat3::NFS3_OK.pack(&mut buf)?;
    post_op_attr(Some(*attrs)).pack(&mut buf)?;
    access.pack(&mut buf)?;
    Ok(BytesMut::from(&buf[..]))
}
