// NFS REMOVE Procedure (Procedure 12)
//
// Removes a non-directory entry from a directory

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;

use crate::protocol::v3::nfs::{NfsMessage, REMOVE3args, nfsstat3, wcc_data};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::{Target, check_name, status_for};

/// Handle NFS REMOVE procedure (procedure 12)
pub async fn handle_remove(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS REMOVE called (xid={})", xid);

    let args: REMOVE3args = NfsMessage::deserialize_args(args_data)?;
    debug!("REMOVE: name='{}'", args.name);

    let dir = match Target::resolve(handler, &args.dir) {
        Ok(dir) => dir,
        Err(status) => {
            let res_data = NfsMessage::create_wcc_error_response(status, &wcc_data::default())?;
            return Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?);
        }
    };

    let before = dir.wcc_attr();
    let status = match remove_entry(&dir, &args.name, false) {
        Ok(()) => {
            debug!("REMOVE success: '{}' in {}", args.name, dir.path);
            nfsstat3::NFS3_OK
        }
        Err(status) => {
            debug!("REMOVE failed: '{}' in {}: {:?}", args.name, dir.path, status);
            status
        }
    };

    // REMOVE3resok and REMOVE3resfail share the wcc_data body
    let res_data = NfsMessage::create_wcc_error_response(status, &dir.wcc_data(before))?;
    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

/// Remove `name` from `dir`, which must be a directory entry of the
/// expected kind
pub(super) fn remove_entry(dir: &Target, name: &str, want_dir: bool) -> Result<(), nfsstat3> {
    check_name(name)?;
    if !dir.is_writable() {
        return Err(nfsstat3::NFS3ERR_ROFS);
    }

    let object = dir.child(name);
    let info = object.stat().map_err(|e| status_for(&e))?;
    match (info.is_dir(), want_dir) {
        (true, false) => return Err(nfsstat3::NFS3ERR_ISDIR),
        (false, true) => return Err(nfsstat3::NFS3ERR_NOTDIR),
        _ => {}
    }

    object
        .fs
        .remove(&object.path)
        .map_err(|e| status_for(&e))
}
