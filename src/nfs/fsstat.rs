// NFS FSSTAT Procedure (Procedure 18)
//
// Returns dynamic filesystem statistics

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;
use xdr_codec::Pack;

use crate::protocol::ProtocolResult;
use crate::protocol::v3::nfs::{FSSTAT3args, NfsMessage, nfsstat3, post_op_attr};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::{FsStat, NfsHandler};

use super::{Target, status_for};

/// Handle NFS FSSTAT procedure (procedure 18)
///
/// # Arguments
/// * `xid` - Transaction ID from the request
/// * `args_data` - Serialized FSSTAT3args (fsroot handle)
/// * `handler` - Session handler computing the statistics
///
/// # Returns
/// Serialized RPC reply message with space and file counts
pub async fn handle_fsstat(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS FSSTAT called (xid={})", xid);

    let args: FSSTAT3args = NfsMessage::deserialize_args(args_data)?;

    let target = match Target::resolve(handler, &args.object) {
        Ok(target) => target,
        Err(status) => {
            let res_data = NfsMessage::create_attr_error_response(status, post_op_attr::default())?;
            return Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?);
        }
    };

    let res_data = match handler.fs_stat(target.fs.as_ref()).await {
        Ok(stat) => {
            debug!(
                "FSSTAT: total={}, free={}, avail={}",
                stat.total_size, stat.free_size, stat.available_size
            );
            serialize_fsstat_ok(&target.post_op_attr(), &stat)?
        }
        Err(e) => {
            debug!("FSSTAT failed: {}", e);
            NfsMessage::create_attr_error_response(status_for(&e), target.post_op_attr())?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn serialize_fsstat_ok(attrs: &post_op_attr, stat: &FsStat) -> ProtocolResult<BytesMut> {
    let mut buf = Vec::new();
    nfsstat3::NFS3_OK.pack(&mut buf)?;
    attrs.pack(&mut buf)?;
    stat.total_size.pack(&mut buf)?;
    stat.free_size.pack(&mut buf)?;
    stat.available_size.pack(&mut buf)?;
    stat.total_files.pack(&mut buf)?;
    stat.free_files.pack(&mut buf)?;
    stat.available_files.pack(&mut buf)?;
    // invarsec: the values may change at any time
    0u32.pack(&mut buf)?;
    Ok(BytesMut::from(&buf[..]))
}
