// MOUNT NULL Procedure Handler
//
// Procedure: 0 (NULL)
// Purpose: Test connectivity, does nothing but return success

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;

use crate::protocol::v3::rpc::{RpcMessage, rpc_call_msg};

/// Handle MOUNT NULL procedure
pub fn handle(call: &rpc_call_msg) -> Result<BytesMut> {
    debug!("MOUNT NULL: xid={}", call.xid);

    let reply = RpcMessage::create_null_reply(call.xid);
    Ok(RpcMessage::serialize_reply(&reply)?)
}
