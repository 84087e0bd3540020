// Protocol version 3 wire types
//
// - rpc: ONC RPC call and reply messages
// - mount: MOUNT v3 arguments and results
// - nfs: NFS v3 arguments, attributes and result helpers

pub mod mount;
pub mod nfs;
pub mod rpc;

// Re-export for convenience
pub use mount::MountMessage;
pub use nfs::NfsMessage;
pub use rpc::RpcMessage;
