// MOUNT DUMP / EXPORT Procedure Handlers
//
// Procedures: 2 (DUMP), 5 (EXPORT)

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;

use crate::protocol::v3::mount::MountMessage;
use crate::protocol::v3::rpc::{RpcMessage, rpc_call_msg};

/// Path under which the single export is advertised
pub const EXPORT_PATH: &str = "/";

/// Handle MOUNT DUMP procedure
///
/// Mounts are not recorded, so the mount list is always empty.
pub fn handle_dump(call: &rpc_call_msg) -> Result<BytesMut> {
    debug!("MOUNT DUMP: xid={}", call.xid);
    let data = MountMessage::serialize_empty_mountlist()?;
    Ok(RpcMessage::create_success_reply_with_data(call.xid, data)?)
}

/// Handle MOUNT EXPORT procedure
pub fn handle_export(call: &rpc_call_msg) -> Result<BytesMut> {
    debug!("MOUNT EXPORT: xid={}", call.xid);
    let data = MountMessage::serialize_exports(&[EXPORT_PATH])?;
    Ok(RpcMessage::create_success_reply_with_data(call.xid, data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::procedures;
    use crate::mount::test_support::call;
    use crate::nfs::test_support::u32_at;

    #[test]
    fn test_dump_is_empty() {
        let reply = handle_dump(&call(3, procedures::DUMP)).unwrap();
        assert_eq!(reply.len(), 28);
        assert_eq!(u32_at(&reply, 24), 0);
    }

    #[test]
    fn test_export_lists_root() {
        let reply = handle_export(&call(3, procedures::EXPORT)).unwrap();

        // value_follows, "/" (len 1 + padding), empty groups, end of list
        assert_eq!(u32_at(&reply, 24), 1);
        assert_eq!(u32_at(&reply, 28), 1);
        assert_eq!(reply[32], b'/');
        assert_eq!(u32_at(&reply, 36), 0);
        assert_eq!(u32_at(&reply, 40), 0);
        assert_eq!(reply.len(), 44);
    }
}
