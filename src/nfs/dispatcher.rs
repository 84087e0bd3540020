// NFS Procedure Dispatcher
//
// Routes incoming NFS RPC calls to the appropriate procedure handler

use anyhow::Result;
use bytes::BytesMut;
use tracing::{debug, warn};

use crate::protocol::v3::nfs::NFS_V3;
use crate::protocol::v3::rpc::{RpcMessage, rpc_call_msg};
use crate::session::NfsHandler;

use super::procedures::*;
use super::{
    access, commit, create, fsinfo, fsstat, getattr, link, lookup, mkdir, mknod, null, pathconf,
    read, readdir, readdirplus, readlink, remove, rename, rmdir, setattr, symlink, write,
};

/// Dispatch NFS procedure call to appropriate handler
///
/// # Arguments
/// * `call` - Parsed RPC call message
/// * `args_data` - Procedure arguments following the call header
/// * `handler` - Session handler serving the export
///
/// # Returns
/// Serialized RPC reply message. Argument decoding failures are returned as
/// errors so the server can answer GARBAGE_ARGS.
pub async fn dispatch(
    call: &rpc_call_msg,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    let procedure = call.proc_;
    let xid = call.xid;

    debug!(
        "NFS dispatcher: procedure={}, xid={}, version={}",
        procedure, xid, call.vers
    );

    if call.vers != NFS_V3 {
        warn!("Unsupported NFS version: {}", call.vers);
        return Ok(RpcMessage::create_prog_mismatch_reply(xid, NFS_V3, NFS_V3)?);
    }

    match procedure {
        NULL => null::handle_null(xid).await,
        GETATTR => getattr::handle_getattr(xid, args_data, handler).await,
        SETATTR => setattr::handle_setattr(xid, args_data, handler).await,
        LOOKUP => lookup::handle_lookup(xid, args_data, handler).await,
        ACCESS => access::handle_access(xid, args_data, handler).await,
        READLINK => readlink::handle_readlink(xid, args_data, handler).await,
        READ => read::handle_read(xid, args_data, handler).await,
        WRITE => write::handle_write(xid, args_data, handler).await,
        CREATE => create::handle_create(xid, args_data, handler).await,
        MKDIR => mkdir::handle_mkdir(xid, args_data, handler).await,
        SYMLINK => symlink::handle_symlink(xid, args_data, handler).await,
        MKNOD => mknod::handle_mknod(xid, args_data, handler).await,
        REMOVE => remove::handle_remove(xid, args_data, handler).await,
        RMDIR => rmdir::handle_rmdir(xid, args_data, handler).await,
        RENAME => rename::handle_rename(xid, args_data, handler).await,
        LINK => link::handle_link(xid, args_data, handler).await,
        READDIR => readdir::handle_readdir(xid, args_data, handler).await,
        READDIRPLUS => readdirplus::handle_readdirplus(xid, args_data, handler).await,
        FSSTAT => fsstat::handle_fsstat(xid, args_data, handler).await,
        FSINFO => fsinfo::handle_fsinfo(xid, args_data, handler).await,
        PATHCONF => pathconf::handle_pathconf(xid, args_data, handler).await,
        COMMIT => commit::handle_commit(xid, args_data, handler).await,
        _ => {
            warn!("Unknown NFS procedure: {}", procedure);
            Ok(RpcMessage::create_proc_unavail_reply(xid)?)
        }
    }
}
