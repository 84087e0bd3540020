// NFS MKDIR Procedure (Procedure 9)

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;

use crate::protocol::v3::nfs::{MKDIR3args, NfsMessage, fattr3, fhandle3, nfsstat3, wcc_data};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::create::{apply_initial_attributes, serialize_create_ok};
use super::{Target, check_name, status_for};

const DEFAULT_DIR_MODE: u32 = 0o755;

/// Handle NFS MKDIR procedure (procedure 9)
///
/// Directories are created through the filesystem's `mkdir_all`; backends
/// without directory creation answer NFS3ERR_NOTSUPP.
pub async fn handle_mkdir(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS MKDIR called (xid={})", xid);

    let args: MKDIR3args = NfsMessage::deserialize_args(args_data)?;
    debug!("MKDIR: name='{}'", args.where_.name);

    let dir = match Target::resolve(handler, &args.where_.dir) {
        Ok(dir) => dir,
        Err(status) => {
            let res_data = NfsMessage::create_wcc_error_response(status, &wcc_data::default())?;
            return Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?);
        }
    };

    let before = dir.wcc_attr();
    let res_data = match mkdir(handler, &dir, &args) {
        Ok((fh, attrs)) => serialize_create_ok(fh, attrs, &dir.wcc_data(before))?,
        Err(status) => {
            debug!("MKDIR failed: '{}' in {}: {:?}", args.where_.name, dir.path, status);
            NfsMessage::create_wcc_error_response(status, &dir.wcc_data(before))?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn mkdir(
    handler: &dyn NfsHandler,
    dir: &Target,
    args: &MKDIR3args,
) -> Result<(fhandle3, Option<fattr3>), nfsstat3> {
    check_name(&args.where_.name)?;
    if !dir.is_writable() {
        return Err(nfsstat3::NFS3ERR_ROFS);
    }

    let object = dir.child(&args.where_.name);
    if object.stat().is_ok() {
        return Err(nfsstat3::NFS3ERR_EXIST);
    }

    let perm = args.attributes.mode.unwrap_or(DEFAULT_DIR_MODE);
    object
        .fs
        .mkdir_all(&object.path, perm)
        .map_err(|e| status_for(&e))?;
    apply_initial_attributes(handler, &object, &args.attributes)?;

    let fh = fhandle3(handler.to_handle(&object.components).to_vec());
    Ok((fh, object.attributes().ok()))
}
