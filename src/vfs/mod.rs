// Virtual Filesystem
//
// The path-addressed store that sits underneath the capability adapter.
// Paths are '/'-separated and relative to the export root; "" and "/" both
// name the root. Nothing at this level knows about file handles.

pub mod local;

use std::io::{self, Read, Seek, Write};
use std::time::SystemTime;

pub use local::LocalVfs;

/// File type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    RegularFile,
    Directory,
    Symlink,
    /// Sockets, FIFOs, device nodes
    Other,
}

/// Metadata for one filesystem object
///
/// This is what `stat` returns and what a directory listing is made of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Final path component ("/" for the root)
    pub name: String,
    pub file_type: FileType,
    /// Size in bytes
    pub size: u64,
    /// Permission bits (lower 12 bits of st_mode)
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl FileInfo {
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }
}

/// Space usage of the backing store, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpaceUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// Flags for `Vfs::open_file`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub create: bool,
    /// Fail with `AlreadyExists` if the file exists (implies `create`)
    pub exclusive: bool,
    pub truncate: bool,
}

impl OpenFlags {
    pub const fn read_only() -> Self {
        Self {
            read: true,
            write: false,
            create: false,
            exclusive: false,
            truncate: false,
        }
    }

    pub const fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            create: false,
            exclusive: false,
            truncate: false,
        }
    }

    /// Open for writing, creating the file if it does not exist
    pub const fn create() -> Self {
        Self {
            read: true,
            write: true,
            create: true,
            exclusive: false,
            truncate: false,
        }
    }

    /// Create a new file, failing if it already exists
    pub const fn create_new() -> Self {
        Self {
            read: true,
            write: true,
            create: true,
            exclusive: true,
            truncate: false,
        }
    }

    /// Whether opening with these flags can modify the filesystem
    pub fn mutates(&self) -> bool {
        self.write || self.create || self.exclusive || self.truncate
    }
}

/// An open file in the backing store
pub trait VfsFile: Read + Write + Seek + Send {
    /// Truncate or extend the file
    fn set_len(&mut self, size: u64) -> io::Result<()>;

    /// Flush data and metadata to stable storage
    fn sync(&mut self) -> io::Result<()>;
}

impl VfsFile for std::fs::File {
    fn set_len(&mut self, size: u64) -> io::Result<()> {
        std::fs::File::set_len(self, size)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Path-based virtual filesystem
///
/// All operations take plain paths. Errors are plain `io::Error`s; the
/// layers above pass them through without reinterpretation.
pub trait Vfs: Send + Sync {
    /// Create (or truncate) a file and open it read-write
    fn create(&self, path: &str) -> io::Result<Box<dyn VfsFile>>;

    /// Open a file read-only
    fn open(&self, path: &str) -> io::Result<Box<dyn VfsFile>>;

    /// Open a file with explicit flags and creation permissions
    fn open_file(&self, path: &str, flags: OpenFlags, perm: u32) -> io::Result<Box<dyn VfsFile>>;

    fn stat(&self, path: &str) -> io::Result<FileInfo>;

    /// List a directory, sorted by name
    fn read_dir(&self, path: &str) -> io::Result<Vec<FileInfo>>;

    /// Remove a file or an empty directory
    fn remove(&self, path: &str) -> io::Result<()>;

    fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    /// Total, used and free bytes of the backing store
    fn statfs(&self) -> io::Result<SpaceUsage>;

    fn is_read_only(&self) -> bool;

    /// Metadata mutation support, if the store has any
    fn change(&self) -> Option<&dyn VfsChange> {
        None
    }
}

/// Metadata mutation on a backing store
pub trait VfsChange: Send + Sync {
    fn chmod(&self, path: &str, mode: u32) -> io::Result<()>;

    fn chown(&self, path: &str, uid: Option<u32>, gid: Option<u32>) -> io::Result<()>;

    fn chtimes(
        &self,
        path: &str,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> io::Result<()>;
}
