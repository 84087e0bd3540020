// NFS MKNOD Procedure (Procedure 11)
//
// Special files are not supported. Only the directory operand is decoded;
// the device specification that follows it is ignored.

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;

use crate::protocol::v3::nfs::{MKNOD3args, NfsMessage, nfsstat3, wcc_data};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::Target;

/// Handle NFS MKNOD procedure (procedure 11)
pub async fn handle_mknod(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS MKNOD called (xid={})", xid);

    let args: MKNOD3args = NfsMessage::deserialize_args(args_data)?;

    let dir_wcc = match Target::resolve(handler, &args.dir) {
        Ok(dir) => {
            let before = dir.wcc_attr();
            dir.wcc_data(before)
        }
        Err(_) => wcc_data::default(),
    };

    let res_data = NfsMessage::create_wcc_error_response(nfsstat3::NFS3ERR_NOTSUPP, &dir_wcc)?;
    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}
