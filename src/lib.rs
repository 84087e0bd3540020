// NFS Bridge - Library
//
// Serves any filesystem implementing the FSAL traits over NFSv3 and MOUNTv3

pub mod config;
pub mod fsal;
pub mod mount;
pub mod nfs;
pub mod protocol;
pub mod rpc;
pub mod session;
pub mod vfs;

// Re-export commonly used types
pub use config::ServerConfig;
pub use fsal::{Capabilities, FileHandle, Filesystem, FsError, VfsAdapter};
pub use rpc::RpcServer;
pub use session::{MountRequest, MountResponse, NfsHandler, SessionHandler};
pub use vfs::LocalVfs;
