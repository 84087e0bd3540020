// MOUNT UMNT / UMNTALL Procedure Handlers
//
// Procedures: 3 (UMNT), 4 (UMNTALL)
// Purpose: Forget a client's mounts. Mounts are not tracked, so both
// procedures only acknowledge the request.

use std::net::SocketAddr;

use anyhow::Result;
use bytes::BytesMut;
use tracing::{debug, info};

use crate::protocol::v3::mount::MountMessage;
use crate::protocol::v3::rpc::{RpcMessage, rpc_call_msg};

/// Handle MOUNT UMNT procedure
///
/// Arguments: dirpath (string)
/// Returns: void (RPC success reply only)
pub fn handle(call: &rpc_call_msg, args_data: &[u8], peer: SocketAddr) -> Result<BytesMut> {
    debug!("MOUNT UMNT: xid={}", call.xid);

    match MountMessage::deserialize_dirpath(args_data) {
        Ok(dirpath) => info!("MOUNT UMNT from {} for path: '{}'", peer, dirpath),
        // UMNT is idempotent; acknowledge even an unreadable path
        Err(e) => debug!("MOUNT UMNT with undecodable dirpath: {}", e),
    }

    Ok(RpcMessage::serialize_reply(&RpcMessage::create_null_reply(call.xid))?)
}

/// Handle MOUNT UMNTALL procedure
pub fn handle_all(call: &rpc_call_msg, peer: SocketAddr) -> Result<BytesMut> {
    info!("MOUNT UMNTALL from {}", peer);
    Ok(RpcMessage::serialize_reply(&RpcMessage::create_null_reply(call.xid))?)
}
