// NFS READDIRPLUS Procedure (17)
//
// Read directory entries with attributes and file handles.
// More efficient than READDIR + multiple LOOKUP/GETATTR calls.

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;
use xdr_codec::Pack;

use crate::fsal::HANDLE_SIZE;
use crate::protocol::ProtocolResult;
use crate::protocol::v3::nfs::{
    FATTR3_SIZE, NfsMessage, READDIRPLUS3args, fhandle3, nfsstat3, post_op_attr, post_op_fh3,
};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::readdir::{READDIR_RESOK_OVERHEAD, open_snapshot, xdr_string_size};
use super::{Target, fileid_for};

/// Opaque length and digest of an issued handle, on top of the
/// post_op_fh3 discriminant
const ISSUED_HANDLE_SIZE: usize = 4 + HANDLE_SIZE;

struct DirEntryPlus {
    fileid: u64,
    name: String,
    cookie: u64,
    attributes: post_op_attr,
    handle: post_op_fh3,
}

impl DirEntryPlus {
    /// fileid + name + cookie, the part counted against dircount
    fn directory_size(&self) -> usize {
        8 + xdr_string_size(&self.name) + 8
    }

    /// value_follows + entryplus3
    fn encoded_size(&self) -> usize {
        let attributes = match self.attributes.0 {
            Some(_) => 4 + FATTR3_SIZE,
            None => 4,
        };
        let handle = match &self.handle.0 {
            Some(fh) => 4 + 4 + fh.0.len().div_ceil(4) * 4,
            None => 4,
        };
        4 + self.directory_size() + attributes + handle
    }
}

struct ReaddirPlusPage {
    dir_attributes: post_op_attr,
    verifier: u64,
    entries: Vec<DirEntryPlus>,
    eof: bool,
}

/// Handle NFS READDIRPLUS request
///
/// READDIRPLUS is an enhanced version of READDIR that returns:
/// - Directory entries (fileid, name, cookie)
/// - File attributes for each entry (post_op_attr)
/// - File handle for each entry (post_op_fh3)
///
/// Paging follows READDIR: same snapshots, same cookies.
///
/// # Arguments
/// * `xid` - Transaction ID from RPC call
/// * `args_data` - Serialized READDIRPLUS3args
/// * `handler` - Session handler holding snapshots and issuing handles
///
/// # Returns
/// Serialized RPC reply with READDIRPLUS3res
pub async fn handle_readdirplus(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS READDIRPLUS called (xid={})", xid);

    let args: READDIRPLUS3args = NfsMessage::deserialize_args(args_data)?;
    debug!(
        "READDIRPLUS: cookie={}, cookieverf={:#x}, dircount={}, maxcount={}",
        args.cookie, args.cookieverf, args.dircount, args.maxcount
    );

    let dir = match Target::resolve(handler, &args.dir) {
        Ok(dir) => dir,
        Err(status) => {
            let res_data = NfsMessage::create_attr_error_response(status, post_op_attr::default())?;
            return Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?);
        }
    };

    let res_data = match readdirplus(handler, &dir, &args) {
        Ok(page) => {
            debug!(
                "READDIRPLUS success: {} entries from {}, eof={}",
                page.entries.len(),
                dir.path,
                page.eof
            );
            serialize_readdirplus_ok(&page)?
        }
        Err(status) => {
            debug!("READDIRPLUS failed for {}: {:?}", dir.path, status);
            NfsMessage::create_attr_error_response(status, dir.post_op_attr())?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn readdirplus(
    handler: &dyn NfsHandler,
    dir: &Target,
    args: &READDIRPLUS3args,
) -> Result<ReaddirPlusPage, nfsstat3> {
    let snapshot = open_snapshot(handler, dir, args.cookie, args.cookieverf)?;

    let max_bytes = args.maxcount as usize;
    let max_dir_bytes = args.dircount as usize;
    // Leave room in the registry for the directory itself and for the
    // handles of the previous page
    let max_entries = (handler.handle_limit() / 2).max(1);
    let mut used = READDIR_RESOK_OVERHEAD;
    let mut dir_used = 0;
    let mut entries = Vec::new();
    let mut eof = true;

    for (index, info) in snapshot.listing.iter().enumerate().skip(snapshot.start) {
        if entries.len() == max_entries {
            eof = false;
            break;
        }

        let child = dir.child(&info.name);
        // The entry may have gone since the snapshot; list it without attributes
        let attributes = post_op_attr(child.attributes().ok());

        let mut entry = DirEntryPlus {
            fileid: fileid_for(&child.components),
            name: info.name.clone(),
            cookie: index as u64 + 1,
            attributes,
            handle: post_op_fh3(None),
        };

        let size = entry.encoded_size() + ISSUED_HANDLE_SIZE;
        let fits =
            used + size <= max_bytes && dir_used + entry.directory_size() <= max_dir_bytes;
        if !fits {
            if entries.is_empty() {
                return Err(nfsstat3::NFS3ERR_TOOSMALL);
            }
            eof = false;
            break;
        }

        // Only entries that make it into the reply are registered
        let handle = handler.to_handle(&child.components);
        entry.handle = post_op_fh3(Some(fhandle3(handle.to_vec())));
        used += size;
        dir_used += entry.directory_size();
        entries.push(entry);
    }

    Ok(ReaddirPlusPage {
        dir_attributes: dir.post_op_attr(),
        verifier: snapshot.verifier,
        entries,
        eof,
    })
}

fn serialize_readdirplus_ok(page: &ReaddirPlusPage) -> ProtocolResult<BytesMut> {
    let mut buf = Vec::new();
    nfsstat3::NFS3_OK.pack(&mut buf)?;
    page.dir_attributes.pack(&mut buf)?;
    page.verifier.pack(&mut buf)?;

    for entry in &page.entries {
        true.pack(&mut buf)?;
        entry.fileid.pack(&mut buf)?;
        xdr_codec::pack_string(&entry.name, None, &mut buf)?;
        entry.cookie.pack(&mut buf)?;
        entry.attributes.pack(&mut buf)?;
        entry.handle.pack(&mut buf)?;
    }
    false.pack(&mut buf)?;
    page.eof.pack(&mut buf)?;

    Ok(BytesMut::from(&buf[..]))
}
