// NFS SETATTR Procedure (Procedure 2)
//
// Changes size, permissions, ownership and timestamps of a file

use std::time::SystemTime;

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;
use xdr_codec::Pack;

use crate::protocol::ProtocolResult;
use crate::protocol::v3::nfs::{NfsMessage, SETATTR3args, nfsstat3, wcc_attr, wcc_data};
use crate::protocol::v3::rpc::RpcMessage;
use crate::fsal::{Capabilities, OpenFlags};
use crate::session::NfsHandler;

use super::{Target, status_for};

/// Handle NFS SETATTR procedure (procedure 2)
pub async fn handle_setattr(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS SETATTR called (xid={})", xid);

    let args: SETATTR3args = NfsMessage::deserialize_args(args_data)?;
    debug!("SETATTR: {:?} guard={:?}", args.new_attributes, args.guard);

    let target = match Target::resolve(handler, &args.object) {
        Ok(target) => target,
        Err(status) => {
            let res_data = NfsMessage::create_wcc_error_response(status, &wcc_data::default())?;
            return Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?);
        }
    };

    let before = target.wcc_attr();
    let res_data = match setattr(handler, &target, &args, before.as_ref()) {
        Ok(()) => {
            debug!("SETATTR success: {}", target.path);
            serialize_setattr_ok(&target.wcc_data(before))?
        }
        Err(status) => {
            debug!("SETATTR failed for {}: {:?}", target.path, status);
            NfsMessage::create_wcc_error_response(status, &target.wcc_data(before))?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn setattr(
    handler: &dyn NfsHandler,
    target: &Target,
    args: &SETATTR3args,
    before: Option<&wcc_attr>,
) -> Result<(), nfsstat3> {
    let attrs = &args.new_attributes;

    if let Some(expected) = args.guard {
        let before = before.ok_or(nfsstat3::NFS3ERR_STALE)?;
        if before.ctime != expected {
            return Err(nfsstat3::NFS3ERR_NOT_SYNC);
        }
    }

    if !target.is_writable() {
        return Err(nfsstat3::NFS3ERR_ROFS);
    }

    if let Some(size) = attrs.size {
        if !target.fs.capabilities().contains(Capabilities::TRUNCATE) {
            return Err(nfsstat3::NFS3ERR_NOTSUPP);
        }
        let info = target.stat().map_err(|e| status_for(&e))?;
        if info.is_dir() {
            return Err(nfsstat3::NFS3ERR_ISDIR);
        }
        let mut file = target
            .fs
            .open_file(&target.path, OpenFlags::read_write(), 0)
            .map_err(|e| status_for(&e))?;
        file.truncate(size).map_err(|e| status_for(&e))?;
    }

    if !attrs.changes_metadata() {
        return Ok(());
    }

    let change = handler
        .change(target.fs.as_ref())
        .ok_or(nfsstat3::NFS3ERR_NOTSUPP)?;

    if let Some(mode) = attrs.mode {
        change.chmod(&target.path, mode).map_err(|e| status_for(&e))?;
    }
    if attrs.uid.is_some() || attrs.gid.is_some() {
        change
            .chown(&target.path, attrs.uid, attrs.gid)
            .map_err(|e| status_for(&e))?;
    }

    let now = SystemTime::now();
    let atime = attrs.atime.resolve(now);
    let mtime = attrs.mtime.resolve(now);
    if atime.is_some() || mtime.is_some() {
        change
            .chtimes(&target.path, atime, mtime)
            .map_err(|e| status_for(&e))?;
    }

    Ok(())
}

fn serialize_setattr_ok(obj_wcc: &wcc_data) -> ProtocolResult<BytesMut> {
    let mut buf = Vec::new();
    nfsstat3::NFS3_OK.pack(&mut buf)?;
    obj_wcc.pack(&mut buf)?;
    Ok(BytesMut::from(&buf[..]))
}
