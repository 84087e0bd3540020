// NFS CREATE Procedure (Procedure 8)
//
// Creates a regular file in a directory

use std::time::SystemTime;

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;
use xdr_codec::Pack;

use crate::fsal::OpenFlags;
use crate::protocol::ProtocolResult;
use crate::protocol::v3::nfs::{
    CREATE3args, NfsMessage, createhow3, fattr3, fhandle3, nfsstat3, post_op_attr, post_op_fh3,
    sattr3, wcc_data,
};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::{Target, check_name, status_for};

const DEFAULT_FILE_MODE: u32 = 0o644;

/// Handle NFS CREATE procedure (procedure 8)
pub async fn handle_create(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS CREATE called (xid={})", xid);

    let args: CREATE3args = NfsMessage::deserialize_args(args_data)?;
    debug!("CREATE: name='{}', how={:?}", args.where_.name, args.how);

    let dir = match Target::resolve(handler, &args.where_.dir) {
        Ok(dir) => dir,
        Err(status) => {
            let res_data = NfsMessage::create_wcc_error_response(status, &wcc_data::default())?;
            return Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?);
        }
    };

    let before = dir.wcc_attr();
    let res_data = match create(handler, &dir, &args) {
        Ok((fh, attrs)) => {
            debug!("CREATE success: '{}' in {}", args.where_.name, dir.path);
            serialize_create_ok(fh, attrs, &dir.wcc_data(before))?
        }
        Err(status) => {
            debug!("CREATE failed: '{}' in {}: {:?}", args.where_.name, dir.path, status);
            NfsMessage::create_wcc_error_response(status, &dir.wcc_data(before))?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn create(
    handler: &dyn NfsHandler,
    dir: &Target,
    args: &CREATE3args,
) -> Result<(fhandle3, Option<fattr3>), nfsstat3> {
    check_name(&args.where_.name)?;
    if !dir.is_writable() {
        return Err(nfsstat3::NFS3ERR_ROFS);
    }
    if !dir.stat().map_err(|e| status_for(&e))?.is_dir() {
        return Err(nfsstat3::NFS3ERR_NOTDIR);
    }

    let (flags, attrs) = match args.how {
        createhow3::UNCHECKED(attrs) => (OpenFlags::create(), attrs),
        createhow3::GUARDED(attrs) => (OpenFlags::create_new(), attrs),
        createhow3::EXCLUSIVE(_) => (OpenFlags::create_new(), sattr3::default()),
    };

    let object = dir.child(&args.where_.name);
    let perm = attrs.mode.unwrap_or(DEFAULT_FILE_MODE);
    let mut file = object
        .fs
        .open_file(&object.path, flags, perm)
        .map_err(|e| status_for(&e))?;

    if let Some(size) = attrs.size {
        file.truncate(size).map_err(|e| status_for(&e))?;
    }
    drop(file);

    apply_initial_attributes(handler, &object, &attrs)?;

    let fh = fhandle3(handler.to_handle(&object.components).to_vec());
    Ok((fh, object.attributes().ok()))
}

/// Ownership and timestamps requested at creation time
///
/// The mode is already applied through the open permissions.
pub(super) fn apply_initial_attributes(
    handler: &dyn NfsHandler,
    object: &Target,
    attrs: &sattr3,
) -> Result<(), nfsstat3> {
    let now = SystemTime::now();
    let atime = attrs.atime.resolve(now);
    let mtime = attrs.mtime.resolve(now);
    let owner_changes = attrs.uid.is_some() || attrs.gid.is_some();
    if !owner_changes && atime.is_none() && mtime.is_none() {
        return Ok(());
    }

    let change = handler
        .change(object.fs.as_ref())
        .ok_or(nfsstat3::NFS3ERR_NOTSUPP)?;
    if owner_changes {
        change
            .chown(&object.path, attrs.uid, attrs.gid)
            .map_err(|e| status_for(&e))?;
    }
    if atime.is_some() || mtime.is_some() {
        change
            .chtimes(&object.path, atime, mtime)
            .map_err(|e| status_for(&e))?;
    }
    Ok(())
}

/// Body shared by CREATE, MKDIR and SYMLINK
pub(super) fn serialize_create_ok(
    fh: fhandle3,
    attrs: Option<fattr3>,
    dir_wcc: &wcc_data,
) -> ProtocolResult<BytesMut> {
    let mut buf = Vec::new();
    nfsstat3::NFS3_OK.pack(&mut buf)?;
    post_op_fh3(Some(fh)).pack(&mut buf)?;
    post_op_attr(attrs).pack(&mut buf)?;
    dir_wcc.pack(&mut buf)?;
    Ok(BytesMut::from(&buf[..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfs::test_support::{self, REPLY_HEADER, components, dirop, pack, session};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn args(handler: &crate::session::SessionHandler, name: &str, how: createhow3) -> CREATE3args {
        CREATE3args {
            where_: dirop(handler, &[], name),
            how,
        }
    }

    #[tokio::test]
    async fn test_create_unchecked() {
        let (handler, temp_dir) = session(false);
        let how = createhow3::UNCHECKED(sattr3 {
            mode: Some(0o600),
            ..Default::default()
        });

        let reply = handle_create(1, &pack(&args(&handler, "new.txt", how)), &handler)
            .await
            .unwrap();

        assert_eq!(test_support::status(&reply), 0);
        let metadata = fs::metadata(temp_dir.path().join("new.txt")).unwrap();
        assert!(metadata.is_file());
        // umask may clear bits but never adds group or other access
        assert_eq!(metadata.permissions().mode() & 0o077, 0);

        // handle_follows, then the handle itself
        assert_eq!(test_support::u32_at(&reply, REPLY_HEADER + 4), 1);
        let len = test_support::u32_at(&reply, REPLY_HEADER + 8) as usize;
        let fh = &reply[REPLY_HEADER + 12..REPLY_HEADER + 12 + len];
        assert_eq!(handler.from_handle(fh).unwrap().1, components(&["new.txt"]));
    }

    #[tokio::test]
    async fn test_create_unchecked_keeps_existing() {
        let (handler, temp_dir) = session(false);
        fs::write(temp_dir.path().join("f"), b"data").unwrap();

        let how = createhow3::UNCHECKED(sattr3::default());
        let reply = handle_create(1, &pack(&args(&handler, "f", how)), &handler)
            .await
            .unwrap();

        assert_eq!(test_support::status(&reply), 0);
        assert_eq!(fs::read(temp_dir.path().join("f")).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_create_guarded_existing() {
        let (handler, temp_dir) = session(false);
        fs::write(temp_dir.path().join("f"), b"data").unwrap();

        let how = createhow3::GUARDED(sattr3::default());
        let reply = handle_create(1, &pack(&args(&handler, "f", how)), &handler)
            .await
            .unwrap();

        assert_eq!(test_support::status(&reply), nfsstat3::NFS3ERR_EXIST as i32);
    }

    #[tokio::test]
    async fn test_create_exclusive() {
        let (handler, temp_dir) = session(false);

        let reply = handle_create(
            1,
            &pack(&args(&handler, "excl", createhow3::EXCLUSIVE(42))),
            &handler,
        )
        .await
        .unwrap();

        assert_eq!(test_support::status(&reply), 0);
        assert!(temp_dir.path().join("excl").exists());
    }

    #[tokio::test]
    async fn test_create_invalid_name_and_read_only() {
        let (handler, _temp_dir) = session(false);
        let how = createhow3::UNCHECKED(sattr3::default());
        let reply = handle_create(1, &pack(&args(&handler, "a/b", how)), &handler)
            .await
            .unwrap();
        assert_eq!(test_support::status(&reply), nfsstat3::NFS3ERR_INVAL as i32);

        let (handler, _temp_dir) = session(true);
        let reply = handle_create(1, &pack(&args(&handler, "x", how)), &handler)
            .await
            .unwrap();
        assert_eq!(test_support::status(&reply), nfsstat3::NFS3ERR_ROFS as i32);
    }
}
