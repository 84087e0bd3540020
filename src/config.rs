// Server configuration
//
// Everything needed to stand up an export: the backing directory, the
// listen address and the sizes of the handle and verifier caches.

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use crate::fsal::{Filesystem, VfsAdapter};
use crate::vfs::LocalVfs;

/// Default number of file handles kept alive
pub const DEFAULT_HANDLE_LIMIT: NonZeroUsize = match NonZeroUsize::new(1024) {
    Some(limit) => limit,
    None => NonZeroUsize::MIN,
};

/// Default number of cached directory listings
pub const DEFAULT_VERIFIER_LIMIT: NonZeroUsize = DEFAULT_HANDLE_LIMIT;

/// Default listen address (NFS port on all interfaces)
pub const DEFAULT_LISTEN: &str = "0.0.0.0:2049";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory to export
    pub export_root: PathBuf,
    /// TCP address to listen on
    pub listen: SocketAddr,
    /// Maximum number of live file handles
    pub handle_limit: NonZeroUsize,
    /// Maximum number of cached directory listings
    pub verifier_limit: NonZeroUsize,
    /// Export the tree read-only
    pub read_only: bool,
}

impl ServerConfig {
    /// Configuration with defaults for everything but the export root
    pub fn new<P: Into<PathBuf>>(export_root: P) -> Self {
        Self {
            export_root: export_root.into(),
            listen: SocketAddr::from(([0, 0, 0, 0], 2049)),
            handle_limit: DEFAULT_HANDLE_LIMIT,
            verifier_limit: DEFAULT_VERIFIER_LIMIT,
            read_only: false,
        }
    }

    pub fn with_listen(mut self, listen: SocketAddr) -> Self {
        self.listen = listen;
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Check the export root before anything binds a socket
    pub fn validate(&self) -> Result<()> {
        let metadata = std::fs::metadata(&self.export_root).with_context(|| {
            format!("cannot access export root {}", self.export_root.display())
        })?;
        if !metadata.is_dir() {
            bail!(
                "export root {} is not a directory",
                self.export_root.display()
            );
        }
        Ok(())
    }

    /// Create filesystem instance from configuration
    pub fn create_filesystem(&self) -> Result<Arc<dyn Filesystem>> {
        let vfs = LocalVfs::new(&self.export_root, self.read_only).with_context(|| {
            format!("cannot open export root {}", self.export_root.display())
        })?;
        Ok(Arc::new(VfsAdapter::new(vfs)))
    }
}
