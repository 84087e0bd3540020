// NFS LINK Procedure (Procedure 15)
//
// Hard links are not supported.

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;

use crate::protocol::v3::nfs::{LINK3args, NfsMessage, nfsstat3, post_op_attr, wcc_data};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::Target;

/// Handle NFS LINK procedure (procedure 15)
pub async fn handle_link(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS LINK called (xid={})", xid);

    let args: LINK3args = NfsMessage::deserialize_args(args_data)?;
    debug!("LINK: name='{}' rejected", args.link.name);

    let file_attributes = Target::resolve(handler, &args.file)
        .map(|file| file.post_op_attr())
        .unwrap_or_default();
    let linkdir_wcc = Target::resolve(handler, &args.link.dir)
        .map(|dir| {
            let before = dir.wcc_attr();
            dir.wcc_data(before)
        })
        .unwrap_or_default();

    let res_data = NfsMessage::create_link_error_response(
        nfsstat3::NFS3ERR_NOTSUPP,
        file_attributes,
        &linkdir_wcc,
    )?;
    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}
