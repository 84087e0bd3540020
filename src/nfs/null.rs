// NFS NULL Procedure (Procedure 0)
//
// Does nothing but return success. Used to test connectivity and verify
// the NFS service is responding.

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;

use crate::protocol::v3::rpc::RpcMessage;

/// Handle NFS NULL procedure (procedure 0)
pub async fn handle_null(xid: u32) -> Result<BytesMut> {
    debug!("NFS NULL called (xid={})", xid);

    let reply = RpcMessage::create_null_reply(xid);
    Ok(RpcMessage::serialize_reply(&reply)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfs::test_support::REPLY_HEADER;

    #[tokio::test]
    async fn test_null_procedure() {
        let reply = handle_null(12345).await.expect("NULL procedure should succeed");

        assert_eq!(reply.len(), REPLY_HEADER, "Reply should be a bare RPC header");
        assert_eq!(&reply[..4], &12345u32.to_be_bytes());
    }
}
