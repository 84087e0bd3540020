// RPC TCP Server with Record Marking
//
// Implements Sun RPC over TCP with record marking protocol (RFC 5531)

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::mount::MOUNT_PROGRAM;
use crate::protocol::ProtocolError;
use crate::protocol::v3::nfs::{NFS_PROGRAM, NFS3_MAXDATA};
use crate::protocol::v3::rpc::{RPC_VERSION, RpcMessage};
use crate::session::NfsHandler;

/// Largest record accepted from a client: a maximal WRITE plus headers
pub const MAX_RECORD_SIZE: usize = NFS3_MAXDATA as usize + 64 * 1024;

const LAST_FRAGMENT: u32 = 0x8000_0000;

/// RPC server handling TCP connections with record marking
pub struct RpcServer {
    listen: SocketAddr,
    handler: Arc<dyn NfsHandler>,
}

impl RpcServer {
    pub fn new(listen: SocketAddr, handler: Arc<dyn NfsHandler>) -> Self {
        Self { listen, handler }
    }

    /// Bind the configured address and serve until an accept error
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.listen)
            .await
            .with_context(|| format!("Failed to bind {}", self.listen))?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!("RPC server listening on {}", listener.local_addr()?);

        loop {
            let (socket, peer_addr) = listener.accept().await?;
            info!("New connection from {}", peer_addr);

            let handler = self.handler.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(socket, peer_addr, handler).await {
                    error!("Connection error from {}: {:#}", peer_addr, e);
                }
            });
        }
    }
}

/// Handle a single TCP connection
async fn handle_connection(
    mut socket: TcpStream,
    peer: SocketAddr,
    handler: Arc<dyn NfsHandler>,
) -> Result<()> {
    let mut buffer = BytesMut::with_capacity(8192);

    loop {
        // Record marking fragment header
        // Bit 31: last fragment; bits 0-30: fragment length
        let mut header = [0u8; 4];
        match socket.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                debug!("Connection closed by {}", peer);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        let header_u32 = u32::from_be_bytes(header);
        let is_last = (header_u32 & LAST_FRAGMENT) != 0;
        let fragment_len = (header_u32 & !LAST_FRAGMENT) as usize;

        debug!("Record marking: last={}, length={}", is_last, fragment_len);

        if buffer.len() + fragment_len > MAX_RECORD_SIZE {
            warn!(
                "Record from {} exceeds {} bytes, closing connection",
                peer, MAX_RECORD_SIZE
            );
            bail!("record too large ({} bytes)", buffer.len() + fragment_len);
        }

        let mut fragment = vec![0u8; fragment_len];
        socket.read_exact(&mut fragment).await?;
        buffer.put_slice(&fragment);

        if !is_last {
            continue;
        }

        debug!("Complete RPC message received ({} bytes)", buffer.len());

        if let Some(response) = handle_rpc_message(&buffer, peer, handler.as_ref()).await? {
            // Record mark and payload go out in a single write
            let record_header = response.len() as u32 | LAST_FRAGMENT;
            let mut full_response = Vec::with_capacity(4 + response.len());
            full_response.extend_from_slice(&record_header.to_be_bytes());
            full_response.extend_from_slice(&response);

            socket.write_all(&full_response).await?;
            socket.flush().await?;

            debug!("Sent response ({} bytes)", response.len());
        }

        buffer.clear();
    }
}

/// Handle a complete RPC message
///
/// Returns the serialized reply, or `None` when the message cannot be
/// answered (no XID to reply to).
pub async fn handle_rpc_message(
    data: &[u8],
    peer: SocketAddr,
    handler: &dyn NfsHandler,
) -> Result<Option<BytesMut>> {
    let (call, args_offset) = match RpcMessage::deserialize_call(data) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Undecodable RPC call from {}: {}", peer, e);
            return match RpcMessage::peek_xid(data) {
                Some(xid) => Ok(Some(RpcMessage::create_garbage_args_reply(xid)?)),
                None => Ok(None),
            };
        }
    };

    debug!(
        "RPC call: xid={}, prog={}, vers={}, proc={}, auth flavor={}",
        call.xid, call.prog, call.vers, call.proc_, call.cred.flavor
    );

    if call.rpcvers != RPC_VERSION {
        warn!("RPC version {} from {} rejected", call.rpcvers, peer);
        return Ok(Some(RpcMessage::create_rpc_mismatch_reply(call.xid)?));
    }

    let args_data = &data[args_offset..];

    let result = match call.prog {
        MOUNT_PROGRAM => crate::mount::handle_mount_call(&call, args_data, peer, handler).await,
        NFS_PROGRAM => crate::nfs::dispatch(&call, args_data, handler).await,
        _ => {
            warn!("Unknown program number: {}", call.prog);
            Ok(RpcMessage::create_prog_unavail_reply(call.xid)?)
        }
    };

    let reply = match result {
        Ok(reply) => reply,
        Err(e) if e.downcast_ref::<ProtocolError>().is_some() => {
            warn!(
                "Garbage arguments for prog={} proc={} from {}: {}",
                call.prog, call.proc_, peer, e
            );
            RpcMessage::create_garbage_args_reply(call.xid)?
        }
        Err(e) => {
            error!(
                "Failed to handle prog={} proc={} (xid={}): {:#}",
                call.prog, call.proc_, call.xid, e
            );
            RpcMessage::create_system_err_reply(call.xid)?
        }
    };

    Ok(Some(reply))
}
