// NFS RENAME Procedure (Procedure 14)

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;

use crate::protocol::v3::nfs::{NfsMessage, RENAME3args, nfsstat3, wcc_data};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::{Target, check_name, status_for};

/// Handle NFS RENAME procedure (procedure 14)
///
/// # Arguments
/// * `xid` - Transaction ID from the request
/// * `args_data` - Serialized RENAME3args (source and target directory + name)
/// * `handler` - Session handler resolving both handles
///
/// # Returns
/// Serialized RPC reply carrying wcc_data for both directories
pub async fn handle_rename(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS RENAME called (xid={})", xid);

    let args: RENAME3args = NfsMessage::deserialize_args(args_data)?;
    debug!("RENAME: '{}' -> '{}'", args.from.name, args.to.name);

    let dirs = Target::resolve(handler, &args.from.dir)
        .and_then(|from| Target::resolve(handler, &args.to.dir).map(|to| (from, to)));
    let (from_dir, to_dir) = match dirs {
        Ok(dirs) => dirs,
        Err(status) => {
            let res_data = NfsMessage::create_rename_error_response(
                status,
                &wcc_data::default(),
                &wcc_data::default(),
            )?;
            return Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?);
        }
    };

    let from_before = from_dir.wcc_attr();
    let to_before = to_dir.wcc_attr();

    let status = match rename(&from_dir, &args.from.name, &to_dir, &args.to.name) {
        Ok(()) => {
            debug!(
                "RENAME success: {}/{} -> {}/{}",
                from_dir.path, args.from.name, to_dir.path, args.to.name
            );
            nfsstat3::NFS3_OK
        }
        Err(status) => {
            debug!("RENAME failed: {:?}", status);
            status
        }
    };

    // RENAME3resok and RENAME3resfail carry the same pair of wcc_data
    let res_data = NfsMessage::create_rename_error_response(
        status,
        &from_dir.wcc_data(from_before),
        &to_dir.wcc_data(to_before),
    )?;
    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn rename(from_dir: &Target, from_name: &str, to_dir: &Target, to_name: &str) -> Result<(), nfsstat3> {
    check_name(from_name)?;
    check_name(to_name)?;
    if !from_dir.is_writable() {
        return Err(nfsstat3::NFS3ERR_ROFS);
    }

    let from = from_dir.child(from_name);
    let to = to_dir.child(to_name);
    from.stat().map_err(|e| status_for(&e))?;

    from.fs.rename(&from.path, &to.path).map_err(|e| status_for(&e))
}
