// Filesystem Abstraction Layer (FSAL)
//
// The capability-oriented filesystem contract the NFS layer programs
// against. A backend is a set of capability traits (basic file access,
// directories, chroot, symlinks, temp files, metadata change); operations
// a backend cannot perform report `FsError::NotSupported`.

pub mod adapter;
pub mod cache;
pub mod handle;
pub mod verifier;

use std::io::{self, Read, Seek, Write};
use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;

pub use crate::vfs::{FileInfo, FileType, OpenFlags, SpaceUsage};
pub use adapter::VfsAdapter;
pub use cache::BoundedCache;
pub use handle::{FileHandle, HANDLE_SIZE, HandleError, HandleRegistry};
pub use verifier::{Listing, VerifierCache};

/// Filesystem operation error
#[derive(Debug, Error)]
pub enum FsError {
    /// The backend lacks the capability for this operation
    #[error("operation not supported")]
    NotSupported,

    /// Error from the backing store, passed through unchanged
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FsError {
    pub fn is_not_supported(&self) -> bool {
        matches!(self, FsError::NotSupported)
    }

    /// The underlying I/O error kind, if any
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            FsError::Io(e) => Some(e.kind()),
            FsError::NotSupported => None,
        }
    }
}

bitflags::bitflags! {
    /// What a filesystem can do
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        const WRITE = 1 << 0;
        const READ = 1 << 1;
        const READ_AND_WRITE = Self::WRITE.bits() | Self::READ.bits();
        const SEEK = 1 << 2;
        const TRUNCATE = 1 << 3;
        const LOCK = 1 << 4;
    }
}

/// An open file
pub trait File: Read + Write + Seek + Send {
    /// Name the file was opened with
    fn name(&self) -> &str;

    fn truncate(&mut self, size: u64) -> Result<(), FsError>;

    fn sync(&mut self) -> Result<(), FsError>;

    fn lock(&mut self) -> Result<(), FsError>;

    fn unlock(&mut self) -> Result<(), FsError>;
}

/// Basic file access
pub trait Basic {
    fn create(&self, filename: &str) -> Result<Box<dyn File>, FsError>;

    fn open(&self, filename: &str) -> Result<Box<dyn File>, FsError>;

    fn open_file(&self, filename: &str, flags: OpenFlags, perm: u32)
    -> Result<Box<dyn File>, FsError>;

    fn stat(&self, filename: &str) -> Result<FileInfo, FsError>;

    fn rename(&self, from: &str, to: &str) -> Result<(), FsError>;

    fn remove(&self, filename: &str) -> Result<(), FsError>;

    /// Join path components into a single path; no components is the root
    fn join(&self, parts: &[String]) -> String;
}

/// Directory access
pub trait Dir {
    fn read_dir(&self, path: &str) -> Result<Vec<FileInfo>, FsError>;

    fn mkdir_all(&self, path: &str, perm: u32) -> Result<(), FsError>;
}

/// Sub-tree views
pub trait Chroot {
    fn chroot(&self, path: &str) -> Result<Arc<dyn Filesystem>, FsError>;

    fn root(&self) -> String;
}

/// Symbolic links
pub trait Symlink {
    fn lstat(&self, filename: &str) -> Result<FileInfo, FsError>;

    fn symlink(&self, target: &str, link: &str) -> Result<(), FsError>;

    fn readlink(&self, link: &str) -> Result<String, FsError>;
}

/// Temporary files
pub trait TempFile {
    fn temp_file(&self, dir: &str, prefix: &str) -> Result<Box<dyn File>, FsError>;
}

/// Metadata mutation
pub trait Change: Send + Sync {
    fn chmod(&self, name: &str, mode: u32) -> Result<(), FsError>;

    /// Change ownership without following a final symlink
    fn lchown(&self, name: &str, uid: Option<u32>, gid: Option<u32>) -> Result<(), FsError>;

    fn chown(&self, name: &str, uid: Option<u32>, gid: Option<u32>) -> Result<(), FsError>;

    fn chtimes(
        &self,
        name: &str,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> Result<(), FsError>;
}

/// Complete filesystem
///
/// The union of the capability traits plus the queries the server needs
/// beyond them.
pub trait Filesystem: Basic + Dir + Chroot + Symlink + TempFile + Send + Sync {
    fn capabilities(&self) -> Capabilities;

    /// Metadata mutation, when the backend supports it
    fn as_change(&self) -> Option<&dyn Change>;

    /// Space usage of the backing store
    fn space_usage(&self) -> Result<SpaceUsage, FsError>;
}
