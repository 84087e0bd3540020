// MOUNT Protocol Handlers
//
// Program: 100005 (MOUNT)
// Version: 3 (MOUNTv3)
//
// This module implements the MOUNT protocol, which is a prerequisite for NFS.
// Clients must first mount a directory path to obtain a file handle before
// they can perform NFS operations.

pub mod export;
pub mod mnt;
pub mod null;
pub mod umnt;

use std::net::SocketAddr;

use anyhow::Result;
use bytes::BytesMut;
use tracing::{debug, warn};

use crate::protocol::v3::rpc::{RpcMessage, rpc_call_msg};
use crate::session::NfsHandler;

/// MOUNT program number (RFC 1813)
pub const MOUNT_PROGRAM: u32 = 100005;

/// MOUNT version 3
pub const MOUNT_V3: u32 = 3;

/// MOUNT procedure numbers
pub mod procedures {
    pub const NULL: u32 = 0;
    pub const MNT: u32 = 1;
    pub const DUMP: u32 = 2;
    pub const UMNT: u32 = 3;
    pub const UMNTALL: u32 = 4;
    pub const EXPORT: u32 = 5;
}

/// Dispatch MOUNT procedure call to appropriate handler
///
/// This function routes the RPC call to the correct MOUNT procedure handler
/// based on the procedure number.
pub async fn handle_mount_call(
    call: &rpc_call_msg,
    args_data: &[u8],
    peer: SocketAddr,
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!(
        "Dispatching MOUNT call: proc={}, prog={}, vers={}",
        call.proc_, call.prog, call.vers
    );

    if call.vers != MOUNT_V3 {
        warn!("Expected MOUNT version {}, got {}", MOUNT_V3, call.vers);
        return Ok(RpcMessage::create_prog_mismatch_reply(
            call.xid, MOUNT_V3, MOUNT_V3,
        )?);
    }

    match call.proc_ {
        procedures::NULL => null::handle(call),
        procedures::MNT => mnt::handle(call, args_data, peer, handler).await,
        procedures::DUMP => export::handle_dump(call),
        procedures::UMNT => umnt::handle(call, args_data, peer),
        procedures::UMNTALL => umnt::handle_all(call, peer),
        procedures::EXPORT => export::handle_export(call),
        _ => {
            warn!("Unknown MOUNT procedure: {}", call.proc_);
            Ok(RpcMessage::create_proc_unavail_reply(call.xid)?)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfs::test_support::{session, u32_at};

    #[tokio::test]
    async fn test_wrong_version() {
        let (handler, _temp_dir) = session(false);

        let call = test_support::call(1, procedures::NULL);
        let reply = handle_mount_call(&call, &[], test_support::peer(), &handler)
            .await
            .unwrap();

        // PROG_MISMATCH(3, 3)
        assert_eq!(u32_at(&reply, 20), 2);
        assert_eq!(u32_at(&reply, 24), 3);
        assert_eq!(u32_at(&reply, 28), 3);
    }

    #[tokio::test]
    async fn test_unknown_procedure() {
        let (handler, _temp_dir) = session(false);

        let call = test_support::call(3, 9);
        let reply = handle_mount_call(&call, &[], test_support::peer(), &handler)
            .await
            .unwrap();

        assert_eq!(u32_at(&reply, 20), 3);
    }
}
