// ONC RPC transport
//
// - server: TCP listener with record marking, routing calls to MOUNT and NFS

pub mod server;

pub use server::RpcServer;
