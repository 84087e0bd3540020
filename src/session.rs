// Session handler
//
// The contract between the NFS/MOUNT procedures and whatever serves the
// export: mount authorization, file handle issue and resolution, directory
// listing verifiers and filesystem statistics.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::fsal::{
    Change, FileHandle, Filesystem, FsError, HandleError, HandleRegistry, Listing, VerifierCache,
};

/// MNT request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    /// Path the client asked to mount
    pub dirpath: String,
}

/// mountstat3 values a handler may answer MNT with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MountStatus {
    Ok = 0,
    NoEnt = 2,
    Access = 13,
}

/// RPC authentication flavors offered to mounting clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AuthFlavor {
    Null = 0,
}

/// Outcome of a mount request
#[derive(Clone)]
pub struct MountResponse {
    pub status: MountStatus,
    pub filesystem: Arc<dyn Filesystem>,
    pub auth_flavors: Vec<AuthFlavor>,
}

/// Filesystem statistics as reported by FSSTAT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStat {
    pub total_size: u64,
    pub free_size: u64,
    pub available_size: u64,
    pub total_files: u64,
    pub free_files: u64,
    pub available_files: u64,
}

/// Handler contract used by the protocol layer
#[async_trait]
pub trait NfsHandler: Send + Sync {
    /// Authorize a mount and pick the filesystem it exposes
    async fn mount(&self, peer: SocketAddr, request: &MountRequest) -> MountResponse;

    /// Metadata mutation for a filesystem, if it supports any
    fn change<'a>(&self, fs: &'a dyn Filesystem) -> Option<&'a dyn Change>;

    /// Space and file-count statistics
    async fn fs_stat(&self, fs: &dyn Filesystem) -> Result<FsStat, FsError>;

    /// Handle for a path, registering it for later resolution
    fn to_handle(&self, path: &[String]) -> FileHandle;

    /// Filesystem and path components behind a handle
    fn from_handle(&self, fh: &[u8]) -> Result<(Arc<dyn Filesystem>, Vec<String>), HandleError>;

    /// Number of handles kept alive
    fn handle_limit(&self) -> usize;

    /// Issue a verifier for a directory listing (0 if the directory is gone)
    fn verifier_for(&self, path: &str, contents: Listing) -> u64;

    /// Listing cached under a verifier
    fn data_for_verifier(&self, path: &str, verifier: u64) -> Option<Listing>;
}

/// Handler serving a single filesystem to every client
pub struct SessionHandler {
    filesystem: Arc<dyn Filesystem>,
    handles: HandleRegistry,
    verifiers: VerifierCache,
}

impl SessionHandler {
    pub fn new(filesystem: Arc<dyn Filesystem>, config: &ServerConfig) -> Self {
        debug!(
            "Session handler: handle_limit={}, verifier_limit={}",
            config.handle_limit, config.verifier_limit
        );
        Self {
            filesystem,
            handles: HandleRegistry::new(config.handle_limit),
            verifiers: VerifierCache::new(config.verifier_limit),
        }
    }

    pub fn filesystem(&self) -> &Arc<dyn Filesystem> {
        &self.filesystem
    }
}

#[async_trait]
impl NfsHandler for SessionHandler {
    async fn mount(&self, peer: SocketAddr, request: &MountRequest) -> MountResponse {
        info!("Mount request from {} for '{}'", peer, request.dirpath);
        MountResponse {
            status: MountStatus::Ok,
            filesystem: self.filesystem.clone(),
            auth_flavors: vec![AuthFlavor::Null],
        }
    }

    fn change<'a>(&self, fs: &'a dyn Filesystem) -> Option<&'a dyn Change> {
        fs.as_change()
    }

    async fn fs_stat(&self, fs: &dyn Filesystem) -> Result<FsStat, FsError> {
        let usage = fs.space_usage()?;
        Ok(FsStat {
            total_size: usage.total,
            free_size: usage.free,
            available_size: usage.free,
            total_files: 0,
            free_files: u64::MAX,
            available_files: u64::MAX,
        })
    }

    fn to_handle(&self, path: &[String]) -> FileHandle {
        self.handles.to_handle(path)
    }

    fn from_handle(&self, fh: &[u8]) -> Result<(Arc<dyn Filesystem>, Vec<String>), HandleError> {
        let path = self.handles.from_handle(fh)?;
        Ok((self.filesystem.clone(), path))
    }

    fn handle_limit(&self) -> usize {
        self.handles.handle_limit()
    }

    fn verifier_for(&self, path: &str, contents: Listing) -> u64 {
        self.verifiers
            .verifier_for(self.filesystem.as_ref(), path, contents)
    }

    fn data_for_verifier(&self, path: &str, verifier: u64) -> Option<Listing> {
        self.verifiers.data_for_verifier(path, verifier)
    }
}
