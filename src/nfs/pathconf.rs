// NFS PATHCONF Procedure (Procedure 20)

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;
use xdr_codec::Pack;

use crate::protocol::ProtocolResult;
use crate::protocol::v3::nfs::{
    NFS3_MAXNAMLEN, NfsMessage, PATHCONF3args, nfsstat3, post_op_attr,
};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::{Target, status_for};

/// Handle NFS PATHCONF procedure (procedure 20)
pub async fn handle_pathconf(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS PATHCONF called (xid={})", xid);

    let args: PATHCONF3args = NfsMessage::deserialize_args(args_data)?;

    let res_data = match Target::resolve(handler, &args.object)
        .and_then(|target| target.attributes().map_err(|e| status_for(&e)))
    {
        Ok(attrs) => serialize_pathconf_ok(&post_op_attr(Some(attrs)))?,
        Err(status) => {
            debug!("PATHCONF failed: {:?}", status);
            NfsMessage::create_attr_error_response(status, post_op_attr::default())?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn serialize_pathconf_ok(attrs: &post_op_attr) -> ProtocolResult<BytesMut> {
    let mut buf = Vec::new();
    nfsstat3::NFS3_OK.pack(&mut buf)?;
    attrs.pack(&mut buf)?;
    // linkmax: no hard links
    1u32.pack(&mut buf)?;
    (NFS3_MAXNAMLEN as u32).pack(&mut buf)?;
    // no_trunc, chown_restricted, case_insensitive, case_preserving
    true.pack(&mut buf)?;
    true.pack(&mut buf)?;
    false.pack(&mut buf)?;
    true.pack(&mut buf)?;
    Ok(BytesMut::from(&buf[..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfs::test_support::{self, REPLY_HEADER, handle, pack, session, u32_at};
    use crate::protocol::v3::nfs::{FATTR3_SIZE, handle_args};

    #[tokio::test]
    async fn test_pathconf() {
        let (handler, _temp_dir) = session(false);
        let args = handle_args {
            object: handle(&handler, &[]),
        };

        let reply = handle_pathconf(1, &pack(&args), &handler).await.unwrap();

        assert_eq!(test_support::status(&reply), 0);
        let base = REPLY_HEADER + 8 + FATTR3_SIZE;
        assert_eq!(u32_at(&reply, base), 1);
        assert_eq!(u32_at(&reply, base + 4), 255);
        assert_eq!(u32_at(&reply, base + 16), 0, "case_insensitive");
        assert_eq!(reply.len(), base + 24);
    }
}
