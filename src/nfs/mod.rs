// NFS Protocol Implementation (NFSv3)
//
// This module implements the NFSv3 protocol procedures on top of the
// session handler. See RFC 1813 for the complete specification.

pub mod dispatcher;

mod access;
mod commit;
mod create;
mod fsinfo;
mod fsstat;
mod getattr;
mod link;
mod lookup;
mod mkdir;
mod mknod;
mod null;
mod pathconf;
mod read;
mod readdir;
mod readdirplus;
mod readlink;
mod remove;
mod rename;
mod rmdir;
mod setattr;
mod symlink;
mod write;

use std::io;
use std::sync::Arc;

use tracing::debug;

use crate::fsal::{Capabilities, FileInfo, Filesystem, FsError, HandleError, HandleRegistry};
use crate::protocol::v3::nfs::{
    NFS3_FHSIZE, NFS3_MAXNAMLEN, NfsMessage, fattr3, fhandle3, nfsstat3, post_op_attr, wcc_attr,
    wcc_data,
};
use crate::session::NfsHandler;

pub use dispatcher::dispatch;

/// Write verifier returned by WRITE and COMMIT
///
/// Every write is committed before the reply, so the value never changes.
pub const WRITE_VERIFIER: u64 = 0x6e66_7362_7269_6467;

/// NFS procedure numbers
pub mod procedures {
    pub const NULL: u32 = 0;
    pub const GETATTR: u32 = 1;
    pub const SETATTR: u32 = 2;
    pub const LOOKUP: u32 = 3;
    pub const ACCESS: u32 = 4;
    pub const READLINK: u32 = 5;
    pub const READ: u32 = 6;
    pub const WRITE: u32 = 7;
    pub const CREATE: u32 = 8;
    pub const MKDIR: u32 = 9;
    pub const SYMLINK: u32 = 10;
    pub const MKNOD: u32 = 11;
    pub const REMOVE: u32 = 12;
    pub const RMDIR: u32 = 13;
    pub const RENAME: u32 = 14;
    pub const LINK: u32 = 15;
    pub const READDIR: u32 = 16;
    pub const READDIRPLUS: u32 = 17;
    pub const FSSTAT: u32 = 18;
    pub const FSINFO: u32 = 19;
    pub const PATHCONF: u32 = 20;
    pub const COMMIT: u32 = 21;
}

/// Map a filesystem error to an NFS status
pub fn status_for(err: &FsError) -> nfsstat3 {
    let kind = match err {
        FsError::NotSupported => return nfsstat3::NFS3ERR_NOTSUPP,
        FsError::Io(e) => e.kind(),
    };

    match kind {
        io::ErrorKind::NotFound => nfsstat3::NFS3ERR_NOENT,
        io::ErrorKind::PermissionDenied => nfsstat3::NFS3ERR_ACCES,
        io::ErrorKind::AlreadyExists => nfsstat3::NFS3ERR_EXIST,
        io::ErrorKind::NotADirectory => nfsstat3::NFS3ERR_NOTDIR,
        io::ErrorKind::IsADirectory => nfsstat3::NFS3ERR_ISDIR,
        io::ErrorKind::DirectoryNotEmpty => nfsstat3::NFS3ERR_NOTEMPTY,
        io::ErrorKind::InvalidInput => nfsstat3::NFS3ERR_INVAL,
        io::ErrorKind::ReadOnlyFilesystem => nfsstat3::NFS3ERR_ROFS,
        io::ErrorKind::StorageFull => nfsstat3::NFS3ERR_NOSPC,
        io::ErrorKind::FileTooLarge => nfsstat3::NFS3ERR_FBIG,
        _ => nfsstat3::NFS3ERR_IO,
    }
}

/// fileid3 for a path: the leading 8 bytes of its handle digest
pub fn fileid_for(path: &[String]) -> u64 {
    let digest = HandleRegistry::digest(path);
    let mut id = [0u8; 8];
    id.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(id)
}

/// Validate a name used to create, remove or rename an entry
pub(crate) fn check_name(name: &str) -> Result<(), nfsstat3> {
    if name.len() > NFS3_MAXNAMLEN {
        return Err(nfsstat3::NFS3ERR_NAMETOOLONG);
    }
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\0') {
        return Err(nfsstat3::NFS3ERR_INVAL);
    }
    Ok(())
}

/// Filesystem object named by a file handle
pub(crate) struct Target {
    pub fs: Arc<dyn Filesystem>,
    pub components: Vec<String>,
    pub path: String,
}

impl Target {
    /// Resolve a wire handle through the session handler
    pub fn resolve(handler: &dyn NfsHandler, fh: &fhandle3) -> Result<Self, nfsstat3> {
        if fh.0.len() > NFS3_FHSIZE {
            debug!("Rejecting {}-byte file handle", fh.0.len());
            return Err(nfsstat3::NFS3ERR_BADHANDLE);
        }

        let (fs, components) = handler.from_handle(&fh.0).map_err(|e| {
            debug!("File handle does not resolve: {}", e);
            match e {
                HandleError::Unknown | HandleError::InvalidCachedValue => nfsstat3::NFS3ERR_STALE,
            }
        })?;

        Ok(Self::at(fs, components))
    }

    pub fn at(fs: Arc<dyn Filesystem>, components: Vec<String>) -> Self {
        let path = fs.join(&components);
        Self {
            fs,
            components,
            path,
        }
    }

    /// Entry `name` inside this directory
    pub fn child(&self, name: &str) -> Self {
        let mut components = self.components.clone();
        components.push(name.to_string());
        Self::at(self.fs.clone(), components)
    }

    pub fn stat(&self) -> Result<FileInfo, FsError> {
        self.fs.stat(&self.path)
    }

    pub fn attributes(&self) -> Result<fattr3, FsError> {
        let info = self.stat()?;
        Ok(self.fattr3(&info))
    }

    pub fn fattr3(&self, info: &FileInfo) -> fattr3 {
        NfsMessage::file_info_to_fattr3(info, fileid_for(&self.components))
    }

    /// Attributes for a reply, omitted if they cannot be read
    pub fn post_op_attr(&self) -> post_op_attr {
        post_op_attr(self.attributes().ok())
    }

    pub fn wcc_attr(&self) -> Option<wcc_attr> {
        self.stat()
            .ok()
            .map(|info| NfsMessage::file_info_to_wcc_attr(&info))
    }

    /// wcc_data from attributes captured before the operation
    pub fn wcc_data(&self, before: Option<wcc_attr>) -> wcc_data {
        wcc_data {
            before,
            after: self.attributes().ok(),
        }
    }

    pub fn is_writable(&self) -> bool {
        self.fs.capabilities().contains(Capabilities::WRITE)
    }
}
