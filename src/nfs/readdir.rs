// NFS READDIR Procedure (Procedure 16)
//
// Read directory entries (names and file IDs only). A listing is
// snapshotted on the first call and paged from the snapshot afterwards,
// keyed by the cookie verifier handed out with the first page.

use std::sync::Arc;

use anyhow::Result;
use bytes::BytesMut;
use tracing::debug;
use xdr_codec::Pack;

use crate::fsal::Listing;
use crate::protocol::ProtocolResult;
use crate::protocol::v3::nfs::{FATTR3_SIZE, NfsMessage, READDIR3args, nfsstat3, post_op_attr};
use crate::protocol::v3::rpc::RpcMessage;
use crate::session::NfsHandler;

use super::{Target, fileid_for, status_for};

/// status + post_op_attr + cookieverf + list terminator + eof
pub(super) const READDIR_RESOK_OVERHEAD: usize = 4 + (4 + FATTR3_SIZE) + 8 + 4 + 4;

/// A page's view of a directory snapshot
pub(super) struct Snapshot {
    pub listing: Listing,
    pub verifier: u64,
    /// Index of the first entry to return
    pub start: usize,
}

/// Resolve the listing a READDIR/READDIRPLUS call pages through
///
/// A zero cookie or verifier starts a fresh listing; anything else must
/// name a snapshot that is still cached.
pub(super) fn open_snapshot(
    handler: &dyn NfsHandler,
    dir: &Target,
    cookie: u64,
    cookieverf: u64,
) -> Result<Snapshot, nfsstat3> {
    let info = dir.stat().map_err(|e| status_for(&e))?;
    if !info.is_dir() {
        return Err(nfsstat3::NFS3ERR_NOTDIR);
    }

    let (listing, verifier) = if cookie == 0 || cookieverf == 0 {
        let entries = dir.fs.read_dir(&dir.path).map_err(|e| status_for(&e))?;
        let listing: Listing = Arc::new(entries);
        let verifier = handler.verifier_for(&dir.path, listing.clone());
        debug!(
            "Snapshot of {}: {} entries, verifier={:#x}",
            dir.path,
            listing.len(),
            verifier
        );
        (listing, verifier)
    } else {
        let listing = handler
            .data_for_verifier(&dir.path, cookieverf)
            .ok_or_else(|| {
                debug!("No snapshot of {} under verifier {:#x}", dir.path, cookieverf);
                nfsstat3::NFS3ERR_BAD_COOKIE
            })?;
        (listing, cookieverf)
    };

    let start = usize::try_from(cookie).map_err(|_| nfsstat3::NFS3ERR_BAD_COOKIE)?;
    if start > listing.len() {
        return Err(nfsstat3::NFS3ERR_BAD_COOKIE);
    }

    Ok(Snapshot {
        listing,
        verifier,
        start,
    })
}

/// Encoded size of an XDR string
pub(super) fn xdr_string_size(s: &str) -> usize {
    4 + s.len().div_ceil(4) * 4
}

struct DirEntry {
    fileid: u64,
    name: String,
    cookie: u64,
}

impl DirEntry {
    /// value_follows + fileid + name + cookie
    fn encoded_size(&self) -> usize {
        4 + 8 + xdr_string_size(&self.name) + 8
    }
}

struct ReaddirPage {
    dir_attributes: post_op_attr,
    verifier: u64,
    entries: Vec<DirEntry>,
    eof: bool,
}

/// Handle NFS READDIR procedure (procedure 16)
///
/// # Arguments
/// * `xid` - Transaction ID from RPC call
/// * `args_data` - Serialized READDIR3args
/// * `handler` - Session handler holding the directory snapshots
///
/// # Returns
/// Serialized RPC reply with READDIR3res
pub async fn handle_readdir(
    xid: u32,
    args_data: &[u8],
    handler: &dyn NfsHandler,
) -> Result<BytesMut> {
    debug!("NFS READDIR called (xid={})", xid);

    let args: READDIR3args = NfsMessage::deserialize_args(args_data)?;
    debug!(
        "READDIR: cookie={}, cookieverf={:#x}, count={}",
        args.cookie, args.cookieverf, args.count
    );

    let dir = match Target::resolve(handler, &args.dir) {
        Ok(dir) => dir,
        Err(status) => {
            let res_data = NfsMessage::create_attr_error_response(status, post_op_attr::default())?;
            return Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?);
        }
    };

    let res_data = match readdir(handler, &dir, &args) {
        Ok(page) => {
            debug!(
                "READDIR success: {} entries from {}, eof={}",
                page.entries.len(),
                dir.path,
                page.eof
            );
            serialize_readdir_ok(&page)?
        }
        Err(status) => {
            debug!("READDIR failed for {}: {:?}", dir.path, status);
            NfsMessage::create_attr_error_response(status, dir.post_op_attr())?
        }
    };

    Ok(RpcMessage::create_success_reply_with_data(xid, res_data)?)
}

fn readdir(
    handler: &dyn NfsHandler,
    dir: &Target,
    args: &READDIR3args,
) -> Result<ReaddirPage, nfsstat3> {
    let snapshot = open_snapshot(handler, dir, args.cookie, args.cookieverf)?;

    let limit = args.count as usize;
    let mut used = READDIR_RESOK_OVERHEAD;
    let mut entries = Vec::new();
    let mut eof = true;

    for (index, info) in snapshot.listing.iter().enumerate().skip(snapshot.start) {
        let child = dir.child(&info.name);
        let entry = DirEntry {
            fileid: fileid_for(&child.components),
            name: info.name.clone(),
            cookie: index as u64 + 1,
        };

        if used + entry.encoded_size() > limit {
            if entries.is_empty() {
                return Err(nfsstat3::NFS3ERR_TOOSMALL);
            }
            eof = false;
            break;
        }
        used += entry.encoded_size();
        entries.push(entry);
    }

    Ok(ReaddirPage {
        dir_attributes: dir.post_op_attr(),
        verifier: snapshot.verifier,
        entries,
        eof,
    })
}

fn serialize_readdir_ok(page: &ReaddirPage) -> ProtocolResult<BytesMut> {
    let mut buf = Vec::new();
    nfsstat3::NFS3_OK.pack(&mut buf)?;
    page.dir_attributes.pack(&mut buf)?;
    page.verifier.pack(&mut buf)?;

    for entry in &page.entries {
        true.pack(&mut buf)?;
        entry.fileid.pack(&mut buf)?;
        xdr_codec::pack_string(&entry.name, None, &mut buf)?;
        entry.cookie.pack(&mut buf)?;
    }
    false.pack(&mut buf)?;
    page.eof.pack(&mut buf)?;

    Ok(BytesMut::from(&buf[..]))
}
