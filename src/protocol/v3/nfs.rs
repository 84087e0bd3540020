// NFS v3 Protocol Middleware (RFC 1813)
//
// Wire types for the NFS program and serialization helpers shared by the
// procedure handlers.

#![allow(non_camel_case_types)]

use std::io::Write;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::BytesMut;
use xdr_codec::Pack;

use crate::fsal::{FileInfo, FileType};
use crate::protocol::{Decode, ProtocolError, ProtocolResult, XdrReader};

/// NFS program number
pub const NFS_PROGRAM: u32 = 100003;

/// NFS version 3
pub const NFS_V3: u32 = 3;

/// Maximum bytes in a V3 file handle
pub const NFS3_FHSIZE: usize = 64;

/// Longest file name accepted in a directory operation
pub const NFS3_MAXNAMLEN: usize = 255;

/// Upper bound on decoded handles and names; anything longer is garbage
pub const NFS3_WIRE_LIMIT: usize = 1024;

/// Maximum bytes in a path (symlink target)
pub const NFS3_MAXPATHLEN: usize = 4096;

/// Largest READ or WRITE transfer
pub const NFS3_MAXDATA: u32 = 1024 * 1024;

/// Filesystem id reported for every object
pub const NFS3_FSID: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum nfsstat3 {
    NFS3_OK = 0,
    NFS3ERR_PERM = 1,
    NFS3ERR_NOENT = 2,
    NFS3ERR_IO = 5,
    NFS3ERR_NXIO = 6,
    NFS3ERR_ACCES = 13,
    NFS3ERR_EXIST = 17,
    NFS3ERR_XDEV = 18,
    NFS3ERR_NODEV = 19,
    NFS3ERR_NOTDIR = 20,
    NFS3ERR_ISDIR = 21,
    NFS3ERR_INVAL = 22,
    NFS3ERR_FBIG = 27,
    NFS3ERR_NOSPC = 28,
    NFS3ERR_ROFS = 30,
    NFS3ERR_MLINK = 31,
    NFS3ERR_NAMETOOLONG = 63,
    NFS3ERR_NOTEMPTY = 66,
    NFS3ERR_DQUOT = 69,
    NFS3ERR_STALE = 70,
    NFS3ERR_REMOTE = 71,
    NFS3ERR_BADHANDLE = 10001,
    NFS3ERR_NOT_SYNC = 10002,
    NFS3ERR_BAD_COOKIE = 10003,
    NFS3ERR_NOTSUPP = 10004,
    NFS3ERR_TOOSMALL = 10005,
    NFS3ERR_SERVERFAULT = 10006,
    NFS3ERR_BADTYPE = 10007,
    NFS3ERR_JUKEBOX = 10008,
}

impl<Out: Write> Pack<Out> for nfsstat3 {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        (*self as i32).pack(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ftype3 {
    NF3REG = 1,
    NF3DIR = 2,
    NF3BLK = 3,
    NF3CHR = 4,
    NF3LNK = 5,
    NF3SOCK = 6,
    NF3FIFO = 7,
}

impl<Out: Write> Pack<Out> for ftype3 {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        (*self as i32).pack(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct nfstime3 {
    pub seconds: u32,
    pub nseconds: u32,
}

impl From<SystemTime> for nfstime3 {
    fn from(time: SystemTime) -> Self {
        let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        nfstime3 {
            seconds: since_epoch.as_secs() as u32,
            nseconds: since_epoch.subsec_nanos(),
        }
    }
}

impl From<nfstime3> for SystemTime {
    fn from(time: nfstime3) -> Self {
        UNIX_EPOCH + Duration::new(u64::from(time.seconds), time.nseconds)
    }
}

impl<Out: Write> Pack<Out> for nfstime3 {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.seconds.pack(out)? + self.nseconds.pack(out)?)
    }
}

impl Decode for nfstime3 {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        Ok(nfstime3 {
            seconds: reader.read_u32()?,
            nseconds: reader.read_u32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct specdata3 {
    pub specdata1: u32,
    pub specdata2: u32,
}

/// File attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct fattr3 {
    pub type_: ftype3,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub used: u64,
    pub rdev: specdata3,
    pub fsid: u64,
    pub fileid: u64,
    pub atime: nfstime3,
    pub mtime: nfstime3,
    pub ctime: nfstime3,
}

impl<Out: Write> Pack<Out> for fattr3 {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.type_.pack(out)?
            + self.mode.pack(out)?
            + self.nlink.pack(out)?
            + self.uid.pack(out)?
            + self.gid.pack(out)?
            + self.size.pack(out)?
            + self.used.pack(out)?
            + self.rdev.specdata1.pack(out)?
            + self.rdev.specdata2.pack(out)?
            + self.fsid.pack(out)?
            + self.fileid.pack(out)?
            + self.atime.pack(out)?
            + self.mtime.pack(out)?
            + self.ctime.pack(out)?)
    }
}

/// Encoded size of fattr3
pub const FATTR3_SIZE: usize = 84;

/// Attributes used for weak cache consistency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct wcc_attr {
    pub size: u64,
    pub mtime: nfstime3,
    pub ctime: nfstime3,
}

impl<Out: Write> Pack<Out> for wcc_attr {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.size.pack(out)? + self.mtime.pack(out)? + self.ctime.pack(out)?)
    }
}

/// Optional attributes after an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct post_op_attr(pub Option<fattr3>);

impl<Out: Write> Pack<Out> for post_op_attr {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        match &self.0 {
            Some(attr) => Ok(true.pack(out)? + attr.pack(out)?),
            None => false.pack(out),
        }
    }
}

/// Attributes before and after a modifying operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct wcc_data {
    pub before: Option<wcc_attr>,
    pub after: Option<fattr3>,
}

impl<Out: Write> Pack<Out> for wcc_data {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        let before = match &self.before {
            Some(attr) => true.pack(out)? + attr.pack(out)?,
            None => false.pack(out)?,
        };
        Ok(before + post_op_attr(self.after).pack(out)?)
    }
}

/// File handle as carried on the wire
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct fhandle3(pub Vec<u8>);

impl<Out: Write> Pack<Out> for fhandle3 {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        xdr_codec::pack_opaque_flex(&self.0, None, out)
    }
}

impl Decode for fhandle3 {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        Ok(fhandle3(reader.read_opaque(NFS3_WIRE_LIMIT)?))
    }
}

/// Optional file handle in a reply
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct post_op_fh3(pub Option<fhandle3>);

impl<Out: Write> Pack<Out> for post_op_fh3 {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        match &self.0 {
            Some(fh) => Ok(true.pack(out)? + fh.pack(out)?),
            None => false.pack(out),
        }
    }
}

/// Directory handle plus entry name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct diropargs3 {
    pub dir: fhandle3,
    pub name: String,
}

impl<Out: Write> Pack<Out> for diropargs3 {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.dir.pack(out)? + xdr_codec::pack_string(&self.name, None, out)?)
    }
}

impl Decode for diropargs3 {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        Ok(diropargs3 {
            dir: fhandle3::decode(reader)?,
            name: reader.read_string(NFS3_WIRE_LIMIT)?,
        })
    }
}

/// How SETATTR should change a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum set_time {
    #[default]
    DONT_CHANGE,
    SET_TO_SERVER_TIME,
    SET_TO_CLIENT_TIME(nfstime3),
}

impl set_time {
    /// Resolve against the server clock
    pub fn resolve(&self, now: SystemTime) -> Option<SystemTime> {
        match self {
            set_time::DONT_CHANGE => None,
            set_time::SET_TO_SERVER_TIME => Some(now),
            set_time::SET_TO_CLIENT_TIME(time) => Some((*time).into()),
        }
    }
}

impl<Out: Write> Pack<Out> for set_time {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        match self {
            set_time::DONT_CHANGE => 0u32.pack(out),
            set_time::SET_TO_SERVER_TIME => 1u32.pack(out),
            set_time::SET_TO_CLIENT_TIME(time) => Ok(2u32.pack(out)? + time.pack(out)?),
        }
    }
}

impl Decode for set_time {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        match reader.read_u32()? {
            0 => Ok(set_time::DONT_CHANGE),
            1 => Ok(set_time::SET_TO_SERVER_TIME),
            2 => Ok(set_time::SET_TO_CLIENT_TIME(nfstime3::decode(reader)?)),
            value => Err(ProtocolError::InvalidDiscriminant {
                what: "time_how",
                value,
            }),
        }
    }
}

/// Settable attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct sattr3 {
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
    pub atime: set_time,
    pub mtime: set_time,
}

impl sattr3 {
    pub fn changes_metadata(&self) -> bool {
        self.mode.is_some()
            || self.uid.is_some()
            || self.gid.is_some()
            || self.atime != set_time::DONT_CHANGE
            || self.mtime != set_time::DONT_CHANGE
    }
}

fn pack_optional<Out: Write, T: Pack<Out>>(value: &Option<T>, out: &mut Out) -> xdr_codec::Result<usize> {
    match value {
        Some(value) => Ok(true.pack(out)? + value.pack(out)?),
        None => false.pack(out),
    }
}

impl<Out: Write> Pack<Out> for sattr3 {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(pack_optional(&self.mode, out)?
            + pack_optional(&self.uid, out)?
            + pack_optional(&self.gid, out)?
            + pack_optional(&self.size, out)?
            + self.atime.pack(out)?
            + self.mtime.pack(out)?)
    }
}

impl Decode for sattr3 {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        let mode = if reader.read_bool()? { Some(reader.read_u32()?) } else { None };
        let uid = if reader.read_bool()? { Some(reader.read_u32()?) } else { None };
        let gid = if reader.read_bool()? { Some(reader.read_u32()?) } else { None };
        let size = if reader.read_bool()? { Some(reader.read_u64()?) } else { None };
        Ok(sattr3 {
            mode,
            uid,
            gid,
            size,
            atime: set_time::decode(reader)?,
            mtime: set_time::decode(reader)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum createhow3 {
    UNCHECKED(sattr3),
    GUARDED(sattr3),
    EXCLUSIVE(u64),
}

impl<Out: Write> Pack<Out> for createhow3 {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        match self {
            createhow3::UNCHECKED(attr) => Ok(0u32.pack(out)? + attr.pack(out)?),
            createhow3::GUARDED(attr) => Ok(1u32.pack(out)? + attr.pack(out)?),
            createhow3::EXCLUSIVE(verf) => Ok(2u32.pack(out)? + verf.pack(out)?),
        }
    }
}

impl Decode for createhow3 {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        match reader.read_u32()? {
            0 => Ok(createhow3::UNCHECKED(sattr3::decode(reader)?)),
            1 => Ok(createhow3::GUARDED(sattr3::decode(reader)?)),
            2 => Ok(createhow3::EXCLUSIVE(reader.read_u64()?)),
            value => Err(ProtocolError::InvalidDiscriminant {
                what: "createmode3",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum stable_how {
    UNSTABLE = 0,
    DATA_SYNC = 1,
    FILE_SYNC = 2,
}

impl<Out: Write> Pack<Out> for stable_how {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        (*self as u32).pack(out)
    }
}

impl Decode for stable_how {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        match reader.read_u32()? {
            0 => Ok(stable_how::UNSTABLE),
            1 => Ok(stable_how::DATA_SYNC),
            2 => Ok(stable_how::FILE_SYNC),
            value => Err(ProtocolError::InvalidDiscriminant {
                what: "stable_how",
                value,
            }),
        }
    }
}

// ===== Procedure arguments =====

/// Arguments consisting of a single file handle
/// (GETATTR, READLINK, FSSTAT, FSINFO, PATHCONF)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct handle_args {
    pub object: fhandle3,
}

pub type GETATTR3args = handle_args;
pub type READLINK3args = handle_args;
pub type FSSTAT3args = handle_args;
pub type FSINFO3args = handle_args;
pub type PATHCONF3args = handle_args;

impl<Out: Write> Pack<Out> for handle_args {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        self.object.pack(out)
    }
}

impl Decode for handle_args {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        Ok(handle_args {
            object: fhandle3::decode(reader)?,
        })
    }
}

/// Arguments consisting of a directory handle and name
/// (LOOKUP, REMOVE, RMDIR, MKNOD)
pub type LOOKUP3args = diropargs3;
pub type REMOVE3args = diropargs3;
pub type RMDIR3args = diropargs3;
pub type MKNOD3args = diropargs3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SETATTR3args {
    pub object: fhandle3,
    pub new_attributes: sattr3,
    /// Expected ctime, when the client asked for a guarded update
    pub guard: Option<nfstime3>,
}

impl<Out: Write> Pack<Out> for SETATTR3args {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.object.pack(out)? + self.new_attributes.pack(out)? + pack_optional(&self.guard, out)?)
    }
}

impl Decode for SETATTR3args {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        let object = fhandle3::decode(reader)?;
        let new_attributes = sattr3::decode(reader)?;
        let guard = if reader.read_bool()? {
            Some(nfstime3::decode(reader)?)
        } else {
            None
        };
        Ok(SETATTR3args {
            object,
            new_attributes,
            guard,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ACCESS3args {
    pub object: fhandle3,
    pub access: u32,
}

impl<Out: Write> Pack<Out> for ACCESS3args {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.object.pack(out)? + self.access.pack(out)?)
    }
}

impl Decode for ACCESS3args {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        Ok(ACCESS3args {
            object: fhandle3::decode(reader)?,
            access: reader.read_u32()?,
        })
    }
}

/// Arguments for READ and COMMIT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct range_args {
    pub file: fhandle3,
    pub offset: u64,
    pub count: u32,
}

pub type READ3args = range_args;
pub type COMMIT3args = range_args;

impl<Out: Write> Pack<Out> for range_args {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.file.pack(out)? + self.offset.pack(out)? + self.count.pack(out)?)
    }
}

impl Decode for range_args {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        Ok(range_args {
            file: fhandle3::decode(reader)?,
            offset: reader.read_u64()?,
            count: reader.read_u32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WRITE3args {
    pub file: fhandle3,
    pub offset: u64,
    pub count: u32,
    pub stable: stable_how,
    pub data: Vec<u8>,
}

impl<Out: Write> Pack<Out> for WRITE3args {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.file.pack(out)?
            + self.offset.pack(out)?
            + self.count.pack(out)?
            + self.stable.pack(out)?
            + xdr_codec::pack_opaque_flex(&self.data, None, out)?)
    }
}

impl Decode for WRITE3args {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        Ok(WRITE3args {
            file: fhandle3::decode(reader)?,
            offset: reader.read_u64()?,
            count: reader.read_u32()?,
            stable: stable_how::decode(reader)?,
            data: reader.read_opaque(NFS3_MAXDATA as usize)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CREATE3args {
    pub where_: diropargs3,
    pub how: createhow3,
}

impl<Out: Write> Pack<Out> for CREATE3args {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.where_.pack(out)? + self.how.pack(out)?)
    }
}

impl Decode for CREATE3args {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        Ok(CREATE3args {
            where_: diropargs3::decode(reader)?,
            how: createhow3::decode(reader)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MKDIR3args {
    pub where_: diropargs3,
    pub attributes: sattr3,
}

impl<Out: Write> Pack<Out> for MKDIR3args {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.where_.pack(out)? + self.attributes.pack(out)?)
    }
}

impl Decode for MKDIR3args {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        Ok(MKDIR3args {
            where_: diropargs3::decode(reader)?,
            attributes: sattr3::decode(reader)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SYMLINK3args {
    pub where_: diropargs3,
    pub symlink_attributes: sattr3,
    pub symlink_data: String,
}

impl<Out: Write> Pack<Out> for SYMLINK3args {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.where_.pack(out)?
            + self.symlink_attributes.pack(out)?
            + xdr_codec::pack_string(&self.symlink_data, Some(NFS3_MAXPATHLEN), out)?)
    }
}

impl Decode for SYMLINK3args {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        Ok(SYMLINK3args {
            where_: diropargs3::decode(reader)?,
            symlink_attributes: sattr3::decode(reader)?,
            symlink_data: reader.read_string(NFS3_MAXPATHLEN)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RENAME3args {
    pub from: diropargs3,
    pub to: diropargs3,
}

impl<Out: Write> Pack<Out> for RENAME3args {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.from.pack(out)? + self.to.pack(out)?)
    }
}

impl Decode for RENAME3args {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        Ok(RENAME3args {
            from: diropargs3::decode(reader)?,
            to: diropargs3::decode(reader)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LINK3args {
    pub file: fhandle3,
    pub link: diropargs3,
}

impl<Out: Write> Pack<Out> for LINK3args {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.file.pack(out)? + self.link.pack(out)?)
    }
}

impl Decode for LINK3args {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        Ok(LINK3args {
            file: fhandle3::decode(reader)?,
            link: diropargs3::decode(reader)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct READDIR3args {
    pub dir: fhandle3,
    pub cookie: u64,
    pub cookieverf: u64,
    pub count: u32,
}

impl<Out: Write> Pack<Out> for READDIR3args {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.dir.pack(out)?
            + self.cookie.pack(out)?
            + self.cookieverf.pack(out)?
            + self.count.pack(out)?)
    }
}

impl Decode for READDIR3args {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        Ok(READDIR3args {
            dir: fhandle3::decode(reader)?,
            cookie: reader.read_u64()?,
            cookieverf: reader.read_u64()?,
            count: reader.read_u32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct READDIRPLUS3args {
    pub dir: fhandle3,
    pub cookie: u64,
    pub cookieverf: u64,
    pub dircount: u32,
    pub maxcount: u32,
}

impl<Out: Write> Pack<Out> for READDIRPLUS3args {
    fn pack(&self, out: &mut Out) -> xdr_codec::Result<usize> {
        Ok(self.dir.pack(out)?
            + self.cookie.pack(out)?
            + self.cookieverf.pack(out)?
            + self.dircount.pack(out)?
            + self.maxcount.pack(out)?)
    }
}

impl Decode for READDIRPLUS3args {
    fn decode(reader: &mut XdrReader<'_>) -> ProtocolResult<Self> {
        Ok(READDIRPLUS3args {
            dir: fhandle3::decode(reader)?,
            cookie: reader.read_u64()?,
            cookieverf: reader.read_u64()?,
            dircount: reader.read_u32()?,
            maxcount: reader.read_u32()?,
        })
    }
}

/// Wrapper for NFS messages providing serialization helpers
pub struct NfsMessage;

impl NfsMessage {
    /// Deserialize procedure arguments
    pub fn deserialize_args<T: Decode>(data: &[u8]) -> ProtocolResult<T> {
        T::decode(&mut XdrReader::new(data))
    }

    /// Convert FSAL FileInfo to NFS fattr3
    pub fn file_info_to_fattr3(info: &FileInfo, fileid: u64) -> fattr3 {
        let type_ = match info.file_type {
            FileType::RegularFile => ftype3::NF3REG,
            FileType::Directory => ftype3::NF3DIR,
            FileType::Symlink => ftype3::NF3LNK,
            FileType::Other => ftype3::NF3FIFO,
        };

        fattr3 {
            type_,
            mode: info.mode,
            nlink: info.nlink,
            uid: info.uid,
            gid: info.gid,
            size: info.size,
            used: info.size,
            rdev: specdata3::default(),
            fsid: NFS3_FSID,
            fileid,
            atime: info.atime.into(),
            mtime: info.mtime.into(),
            ctime: info.ctime.into(),
        }
    }

    /// Pre-operation attributes for weak cache consistency
    pub fn file_info_to_wcc_attr(info: &FileInfo) -> wcc_attr {
        wcc_attr {
            size: info.size,
            mtime: info.mtime.into(),
            ctime: info.ctime.into(),
        }
    }

    /// Serialize a result whose failure arm is void (status only)
    pub fn create_status_response(status: nfsstat3) -> ProtocolResult<BytesMut> {
        let mut buf = Vec::new();
        status.pack(&mut buf)?;
        Ok(BytesMut::from(&buf[..]))
    }

    /// Serialize a failure carrying post_op_attr
    /// (LOOKUP, ACCESS, READLINK, READ, READDIR, READDIRPLUS, FSSTAT, FSINFO, PATHCONF)
    pub fn create_attr_error_response(status: nfsstat3, attr: post_op_attr) -> ProtocolResult<BytesMut> {
        let mut buf = Vec::new();
        status.pack(&mut buf)?;
        attr.pack(&mut buf)?;
        Ok(BytesMut::from(&buf[..]))
    }

    /// Serialize a failure carrying wcc_data
    /// (SETATTR, WRITE, CREATE, MKDIR, SYMLINK, MKNOD, REMOVE, RMDIR, COMMIT)
    pub fn create_wcc_error_response(status: nfsstat3, wcc: &wcc_data) -> ProtocolResult<BytesMut> {
        let mut buf = Vec::new();
        status.pack(&mut buf)?;
        wcc.pack(&mut buf)?;
        Ok(BytesMut::from(&buf[..]))
    }

    /// Serialize a RENAME failure (source and target directory wcc_data)
    pub fn create_rename_error_response(
        status: nfsstat3,
        fromdir_wcc: &wcc_data,
        todir_wcc: &wcc_data,
    ) -> ProtocolResult<BytesMut> {
        let mut buf = Vec::new();
        status.pack(&mut buf)?;
        fromdir_wcc.pack(&mut buf)?;
        todir_wcc.pack(&mut buf)?;
        Ok(BytesMut::from(&buf[..]))
    }

    /// Serialize a LINK failure (file attributes plus link directory wcc_data)
    pub fn create_link_error_response(
        status: nfsstat3,
        file_attributes: post_op_attr,
        linkdir_wcc: &wcc_data,
    ) -> ProtocolResult<BytesMut> {
        let mut buf = Vec::new();
        status.pack(&mut buf)?;
        file_attributes.pack(&mut buf)?;
        linkdir_wcc.pack(&mut buf)?;
        Ok(BytesMut::from(&buf[..]))
    }
}
