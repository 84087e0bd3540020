// NFS SYMLINK Procedure (Procedure 10)

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;

use crate::protocol::v3::nfs::{NfsMessage, SYMLINK3args, fattr3, fhandle3, nfsstat3, wcc_data};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::create::{apply_initial_attributes, serialize_create_ok};
use super::{Target, check_name, status_for};

/// Handle NFS SYMLINK procedure (procedure 10)
pub async fn handle_symlink(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS SYMLINK called (xid={})", xid);

    let args: SYMLINK3args = NfsMessage::deserialize_args(args_data)?;
    debug!(
        "SYMLINK: name='{}' -> '{}'",
        args.where_.name, args.symlink_data
    );

    let dir = match Target::resolve(handler, &args.where_.dir) {
        Ok(dir) => dir,
        Err(status) => {
            let res_data = NfsMessage::create_wcc_error_response(status, &wcc_data::default())?;
            return Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?);
        }
    };

    let before = dir.wcc_attr();
    let res_data = match symlink(handler, &dir, &args) {
        Ok((fh, attrs)) => serialize_create_ok(fh, attrs, &dir.wcc_data(before))?,
        Err(status) => {
            debug!("SYMLINK failed: {:?}", status);
            NfsMessage::create_wcc_error_response(status, &dir.wcc_data(before))?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn symlink(
    handler: &dyn NfsHandler,
    dir: &Target,
    args: &SYMLINK3args,
) -> Result<(fhandle3, Option<fattr3>), nfsstat3> {
    check_name(&args.where_.name)?;
    if !dir.is_writable() {
        return Err(nfsstat3::NFS3ERR_ROFS);
    }

    let object = dir.child(&args.where_.name);
    object
        .fs
        .symlink(&args.symlink_data, &object.path)
        .map_err(|e| status_for(&e))?;
    apply_initial_attributes(handler, &object, &args.symlink_attributes)?;

    let fh = fhandle3(handler.to_handle(&object.components).to_vec());
    let attrs = object
        .fs
        .lstat(&object.path)
        .ok()
        .map(|info| object.fattr3(&info));
    Ok((fh, attrs))
}
