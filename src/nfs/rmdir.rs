// NFS RMDIR Procedure (Procedure 13)

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;

use crate::protocol::v3::nfs::{NfsMessage, RMDIR3args, nfsstat3, wcc_data};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::Target;
use super::remove::remove_entry;

/// Handle NFS RMDIR procedure (procedure 13)
pub async fn handle_rmdir(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS RMDIR called (xid={})", xid);

    let args: RMDIR3args = NfsMessage::deserialize_args(args_data)?;
    debug!("RMDIR: name='{}'", args.name);

    let dir = match Target::resolve(handler, &args.dir) {
        Ok(dir) => dir,
        Err(status) => {
            let res_data = NfsMessage::create_wcc_error_response(status, &wcc_data::default())?;
            return Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?);
        }
    };

    let before = dir.wcc_attr();
    let status = remove_entry(&dir, &args.name, true).err().unwrap_or(nfsstat3::NFS3_OK);
    debug!("RMDIR '{}' in {}: {:?}", args.name, dir.path, status);

    let res_data = NfsMessage::create_wcc_error_response(status, &dir.wcc_data(before))?;
    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfs::test_support::{self, dirop, pack, session};
    use std::fs;

    #[tokio::test]
    async fn test_rmdir_empty_directory() {
        let (handler, temp_dir) = session(false);
        fs::create_dir(temp_dir.path().join("d")).unwrap();

        let reply = handle_rmdir(1, &pack(&dirop(&handler, &[], "d")), &handler)
            .await
            .unwrap();

        assert_eq!(test_support::status(&reply), 0);
        assert!(!temp_dir.path().join("d").exists());
    }

    #[tokio::test]
    async fn test_rmdir_not_empty() {
        let (handler, temp_dir) = session(false);
        fs::create_dir(temp_dir.path().join("d")).unwrap();
        fs::write(temp_dir.path().join("d/f"), b"x").unwrap();

        let reply = handle_rmdir(1, &pack(&dirop(&handler, &[], "d")), &handler)
            .await
            .unwrap();

        assert_eq!(
            test_support::status(&reply),
            nfsstat3::NFS3ERR_NOTEMPTY as i32
        );
    }

    #[tokio::test]
    async fn test_rmdir_on_file() {
        let (handler, temp_dir) = session(false);
        fs::write(temp_dir.path().join("f"), b"x").unwrap();

        let reply = handle_rmdir(1, &pack(&dirop(&handler, &[], "f")), &handler)
            .await
            .unwrap();

        assert_eq!(test_support::status(&reply), nfsstat3::NFS3ERR_NOTDIR as i32);
    }
}
