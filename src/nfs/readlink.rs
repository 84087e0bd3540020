// NFS READLINK Procedure (Procedure 5)

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;
use xdr_codec::Pack;

use crate::protocol::ProtocolResult;
use crate::protocol::v3::nfs::{
    NFS3_MAXPATHLEN, NfsMessage, READLINK3args, nfsstat3, post_op_attr,
};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::{Target, status_for};

/// Handle NFS READLINK procedure (procedure 5)
pub async fn handle_readlink(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS READLINK called (xid={})", xid);

    let args: READLINK3args = NfsMessage::deserialize_args(args_data)?;

    let target = match Target::resolve(handler, &args.object) {
        Ok(target) => target,
        Err(status) => {
            let res_data = NfsMessage::create_attr_error_response(status, post_op_attr::default())?;
            return Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?);
        }
    };

    let res_data = match target.fs.readlink(&target.path) {
        Ok(data) => serialize_readlink_ok(&target.post_op_attr(), &data)?,
        Err(e) => {
            debug!("READLINK failed for {}: {}", target.path, e);
            NfsMessage::create_attr_error_response(status_for(&e), target.post_op_attr())?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn serialize_readlink_ok(attrs: &post_op_attr, data: &str) -> ProtocolResult<BytesMut> {
    let mut buf = Vec::new();
    nfsstat3::NFS3_OK.pack(&mut buf)?;
    attrs.pack(&mut buf)?;
    xdr_codec::pack_string(data, Some(NFS3_MAXPATHLEN), &mut buf)?;
    Ok(BytesMut::from(&buf[..]))
}
