// ONC RPC Message Types (RFC 5531)
//
// Call headers are decoded by hand so that the procedure arguments can be
// handed on as an unparsed slice; replies are packed with xdr-codec.

#![allow(non_camel_case_types)]

use std::io::Write;

use bytes::BytesMut;
use xdr_codec::Pack;

use crate::protocol::{ProtocolError, ProtocolResult, XdrReader};

/// RPC protocol version
pub const RPC_VERSION: u32 = 2;

/// Maximum size of an opaque_auth body
pub const MAX_AUTH_BYTES: usize = 400;

/// msg_type
const CALL: u32 = 0;
const REPLY: u32 = 1;

/// Authentication data (flavor + opaque body)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct opaque_auth {
    pub flavor: u32,
    pub body: Vec<u8>,
}

impl<Out: Write> Pack<Out> for opaque_auth {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.flavor.pack(out)?
            + xdr_codec::pack_opaque_flex(&self.body, Some(MAX_AUTH_BYTES), out)?)
    }
}

/// Decoded call header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct rpc_call_msg {
    pub xid: u32,
    pub rpcvers: u32,
    pub prog: u32,
    pub vers: u32,
    pub proc_: u32,
    pub cred: opaque_auth,
    pub verf: opaque_auth,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum accept_body {
    SUCCESS,
    PROG_UNAVAIL,
    PROG_MISMATCH { low: u32, high: u32 },
    PROC_UNAVAIL,
    GARBAGE_ARGS,
    SYSTEM_ERR,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum rejected_reply {
    RPC_MISMATCH { low: u32, high: u32 },
    AUTH_ERROR(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum reply_body {
    MSG_ACCEPTED {
        verf: opaque_auth,
        reply_data: accept_body,
    },
    MSG_DENIED(rejected_reply),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct rpc_reply_msg {
    pub xid: u32,
    pub body: reply_body,
}

impl<Out: Write> Pack<Out> for accept_body {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(match self {
            accept_body::SUCCESS => 0u32.pack(out)?,
            accept_body::PROG_UNAVAIL => 1u32.pack(out)?,
            accept_body::PROG_MISMATCH { low, high } => {
                2u32.pack(out)? + low.pack(out)? + high.pack(out)?
            }
            accept_body::PROC_UNAVAIL => 3u32.pack(out)?,
            accept_body::GARBAGE_ARGS => 4u32.pack(out)?,
            accept_body::SYSTEM_ERR => 5u32.pack(out)?,
        })
    }
}

impl<Out: Write> Pack<Out> for rejected_reply {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(match self {
            rejected_reply::RPC_MISMATCH { low, high } => {
                0u32.pack(out)? + low.pack(out)? + high.pack(out)?
            }
            rejected_reply::AUTH_ERROR(stat) => 1u32.pack(out)? + stat.pack(out)?,
        })
    }
}

impl<Out: Write> Pack<Out> for rpc_reply_msg {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        let mut sz = self.xid.pack(out)? + REPLY.pack(out)?;
        sz += match &self.body {
            reply_body::MSG_ACCEPTED { verf, reply_data } => {
                0u32.pack(out)? + verf.pack(out)? + reply_data.pack(out)?
            }
            reply_body::MSG_DENIED(rejected) => 1u32.pack(out)? + rejected.pack(out)?,
        };
        Ok(sz)
    }
}

/// Wrapper for RPC messages providing serialization helpers
pub struct RpcMessage;

impl RpcMessage {
    /// Deserialize an RPC call header
    ///
    /// Returns the header and the offset at which procedure arguments start.
    pub fn deserialize_call(data: &[u8]) -> ProtocolResult<(rpc_call_msg, usize)> {
        let mut reader = XdrReader::new(data);

        let xid = reader.read_u32()?;
        let mtype = reader.read_u32()?;
        if mtype != CALL {
            return Err(ProtocolError::InvalidDiscriminant {
                what: "msg_type",
                value: mtype,
            });
        }

        let rpcvers = reader.read_u32()?;
        let prog = reader.read_u32()?;
        let vers = reader.read_u32()?;
        let proc_ = reader.read_u32()?;
        let cred = Self::read_auth(&mut reader)?;
        let verf = Self::read_auth(&mut reader)?;

        let call = rpc_call_msg {
            xid,
            rpcvers,
            prog,
            vers,
            proc_,
            cred,
            verf,
        };
        Ok((call, reader.position()))
    }

    fn read_auth(reader: &mut XdrReader<'_>) -> ProtocolResult<opaque_auth> {
        let flavor = reader.read_u32()?;
        let body = reader.read_opaque(MAX_AUTH_BYTES)?;
        Ok(opaque_auth { flavor, body })
    }

    /// XID of a message too damaged to decode, if it has one
    pub fn peek_xid(data: &[u8]) -> Option<u32> {
        data.get(..4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn accepted(xid: u32, reply_data: accept_body) -> rpc_reply_msg {
        rpc_reply_msg {
            xid,
            body: reply_body::MSG_ACCEPTED {
                verf: opaque_auth::default(),
                reply_data,
            },
        }
    }

    /// Successful reply with no result data
    pub fn create_null_reply(xid: u32) -> rpc_reply_msg {
        Self::accepted(xid, accept_body::SUCCESS)
    }

    pub fn serialize_reply(reply: &rpc_reply_msg) -> ProtocolResult<BytesMut> {
        let mut buf = Vec::new();
        reply.pack(&mut buf)?;
        Ok(BytesMut::from(&buf[..]))
    }

    /// Successful reply followed by serialized procedure results
    pub fn create_success_reply_with_data(xid: u32, data: BytesMut) -> ProtocolResult<BytesMut> {
        let mut reply = Self::serialize_reply(&Self::create_null_reply(xid))?;
        reply.extend_from_slice(&data);
        Ok(reply)
    }

    pub fn create_prog_unavail_reply(xid: u32) -> ProtocolResult<BytesMut> {
        Self::serialize_reply(&Self::accepted(xid, accept_body::PROG_UNAVAIL))
    }

    pub fn create_prog_mismatch_reply(xid: u32, low: u32, high: u32) -> ProtocolResult<BytesMut> {
        Self::serialize_reply(&Self::accepted(
            xid,
            accept_body::PROG_MISMATCH { low, high },
        ))
    }

    pub fn create_proc_unavail_reply(xid: u32) -> ProtocolResult<BytesMut> {
        Self::serialize_reply(&Self::accepted(xid, accept_body::PROC_UNAVAIL))
    }

    pub fn create_garbage_args_reply(xid: u32) -> ProtocolResult<BytesMut> {
        Self::serialize_reply(&Self::accepted(xid, accept_body::GARBAGE_ARGS))
    }

    pub fn create_system_err_reply(xid: u32) -> ProtocolResult<BytesMut> {
        Self::serialize_reply(&Self::accepted(xid, accept_body::SYSTEM_ERR))
    }

    /// Denied reply for a call with the wrong RPC version
    pub fn create_rpc_mismatch_reply(xid: u32) -> ProtocolResult<BytesMut> {
        Self::serialize_reply(&rpc_reply_msg {
            xid,
            body: reply_body::MSG_DENIED(rejected_reply::RPC_MISMATCH {
                low: RPC_VERSION,
                high: RPC_VERSION,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(bytes: &[u8]) -> Vec<u32> {
        bytes
            .chunks(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn call_bytes(cred_body: &[u8], args: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        for word in [42u32, CALL, RPC_VERSION, 100003, 3, 1] {
            word.pack(&mut buf).unwrap();
        }
        opaque_auth {
            flavor: 1,
            body: cred_body.to_vec(),
        }
        .pack(&mut buf)
        .unwrap();
        opaque_auth::default().pack(&mut buf).unwrap();
        buf.extend_from_slice(args);
        buf
    }

    #[test]
    fn test_deserialize_call() {
        let data = call_bytes(&[1, 2, 3, 4, 5], &[0xde, 0xad, 0xbe, 0xef]);
        let (call, offset) = RpcMessage::deserialize_call(&data).unwrap();

        assert_eq!(call.xid, 42);
        assert_eq!(call.rpcvers, 2);
        assert_eq!((call.prog, call.vers, call.proc_), (100003, 3, 1));
        assert_eq!(call.cred.flavor, 1);
        assert_eq!(call.cred.body, vec![1, 2, 3, 4, 5]);
        assert_eq!(&data[offset..], &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_deserialize_rejects_reply() {
        let mut data = call_bytes(&[], &[]);
        data[4..8].copy_from_slice(&REPLY.to_be_bytes());
        assert!(matches!(
            RpcMessage::deserialize_call(&data),
            Err(ProtocolError::InvalidDiscriminant { what: "msg_type", .. })
        ));
    }

    #[test]
    fn test_deserialize_truncated() {
        let data = call_bytes(&[], &[]);
        assert!(RpcMessage::deserialize_call(&data[..20]).is_err());
        assert_eq!(RpcMessage::peek_xid(&data[..20]), Some(42));
        assert_eq!(RpcMessage::peek_xid(&data[..3]), None);
    }

    #[test]
    fn test_reply_layouts() {
        let null = RpcMessage::serialize_reply(&RpcMessage::create_null_reply(7)).unwrap();
        assert_eq!(words(&null), vec![7, 1, 0, 0, 0, 0]);

        let mismatch = RpcMessage::create_prog_mismatch_reply(7, 3, 3).unwrap();
        assert_eq!(words(&mismatch), vec![7, 1, 0, 0, 0, 2, 3, 3]);

        let garbage = RpcMessage::create_garbage_args_reply(7).unwrap();
        assert_eq!(words(&garbage), vec![7, 1, 0, 0, 0, 4]);

        let denied = RpcMessage::create_rpc_mismatch_reply(7).unwrap();
        assert_eq!(words(&denied), vec![7, 1, 1, 0, 2, 2]);
    }

    #[test]
    fn test_success_reply_with_data() {
        let reply =
            RpcMessage::create_success_reply_with_data(9, BytesMut::from(&[0u8, 0, 0, 5][..]))
                .unwrap();
        assert_eq!(words(&reply), vec![9, 1, 0, 0, 0, 0, 5]);
    }
}
