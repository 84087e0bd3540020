// MOUNT MNT Procedure Handler
//
// Procedure: 1 (MNT)
// Purpose: Mount a directory and return a file handle

use std::net::SocketAddr;

use anyhow::Result;
use bytes::BytesMut;
use tracing::{debug, info, warn};

use crate::protocol::v3::mount::MountMessage;
use crate::protocol::v3::rpc::{RpcMessage, rpc_call_msg};
use crate::session::{MountRequest, MountStatus, NfsHandler};

/// Handle MOUNT MNT procedure
///
/// The session handler decides whether the mount is allowed; on success the
/// reply carries the handle of the export root and the accepted auth flavors.
///
/// Arguments: dirpath (string)
/// Returns: mountres3 (file handle + auth flavors on success)
pub async fn handle(
    call: &rpc_call_msg,
    args_data: &[u8],
    peer: SocketAddr,
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("MOUNT MNT: xid={}", call.xid);

    let dirpath = MountMessage::deserialize_dirpath(args_data)?;
    info!("MOUNT MNT request from {} for path: '{}'", peer, dirpath);

    let response = handler.mount(peer, &MountRequest { dirpath }).await;

    let mount_data = if response.status == MountStatus::Ok {
        let fhandle = handler.to_handle(&[]);
        info!("Mounted export root for {} ({} byte handle)", peer, fhandle.len());
        MountMessage::serialize_mount_ok(&fhandle, &response.auth_flavors)?
    } else {
        warn!("Mount refused for {}: {:?}", peer, response.status);
        MountMessage::serialize_mount_error(response.status)?
    };

    Ok(RpcMessage::create_success_reply_with_data(call.xid, mount_data)?)
}
