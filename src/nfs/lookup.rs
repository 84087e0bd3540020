// NFS LOOKUP Procedure (Procedure 3)
//
// Looks up a name in a directory and returns its file handle

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;
use xdr_codec::Pack;

use crate::protocol::ProtocolResult;
use crate::protocol::v3::nfs::{
    LOOKUP3args, NFS3_MAXNAMLEN, NfsMessage, fattr3, fhandle3, nfsstat3, post_op_attr,
};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::{Target, status_for};

/// Handle NFS LOOKUP procedure (procedure 3)
pub async fn handle_lookup(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS LOOKUP called (xid={})", xid);

    let args: LOOKUP3args = NfsMessage::deserialize_args(args_data)?;
    debug!("LOOKUP: name='{}'", args.name);

    let dir = match Target::resolve(handler, &args.dir) {
        Ok(dir) => dir,
        Err(status) => {
            let res_data = NfsMessage::create_attr_error_response(status, post_op_attr::default())?;
            return Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?);
        }
    };

    let res_data = match lookup(handler, &dir, &args.name) {
        Ok((object, obj_attributes)) => {
            debug!("LOOKUP success: '{}' in {}", args.name, dir.path);
            serialize_lookup_ok(&object, &obj_attributes, &dir.post_op_attr())?
        }
        Err(status) => {
            debug!("LOOKUP failed: '{}' in {}: {:?}", args.name, dir.path, status);
            NfsMessage::create_attr_error_response(status, dir.post_op_attr())?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn lookup(
    handler: &dyn NfsHandler,
    dir: &Target,
    name: &str,
) -> Result<(fhandle3, fattr3), nfsstat3> {
    let dir_info = dir.stat().map_err(|e| status_for(&e))?;
    if !dir_info.is_dir() {
        return Err(nfsstat3::NFS3ERR_NOTDIR);
    }
    if name.len() > NFS3_MAXNAMLEN {
        return Err(nfsstat3::NFS3ERR_NAMETOOLONG);
    }

    let mut components = dir.components.clone();
    match name {
        "" | "." => {}
        ".." => {
            components.pop();
        }
        name if name.contains('/') => return Err(nfsstat3::NFS3ERR_NOENT),
        name => components.push(name.to_string()),
    }

    let object = Target::at(dir.fs.clone(), components);
    let attrs = object.attributes().map_err(|e| status_for(&e))?;
    let handle = handler.to_handle(&object.components);

    Ok((fhandle3(handle.to_vec()), attrs))
}

fn serialize_lookup_ok(
    object: &fhandle3,
    obj_attributes: &fattr3,
    dir_attributes: &post_op_attr,
) -> ProtocolResult<BytesMut> {
    let mut buf = Vec::new();
    nfsstat3::NFS3_OK.pack(&mut buf)?;
    object.pack(&mut buf)?;
    post_op_attr(Some(*obj_attributes)).pack(&mut buf)?;
    dir_attributes.pack(&mut buf)?;
    Ok(BytesMut::from(&buf[..]))
}
