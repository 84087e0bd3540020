// Vfs adapter
//
// Presents a path-based Vfs through the FSAL capability traits. Basic file
// access, directory listing and metadata change pass straight through;
// directory creation, chroot, symlinks, temp files and locking are not
// available and report NotSupported.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::time::SystemTime;

use crate::vfs::{Vfs, VfsFile};

use super::{
    Basic, Capabilities, Change, Chroot, Dir, File, FileInfo, Filesystem, FsError, OpenFlags,
    SpaceUsage, Symlink, TempFile,
};

pub struct VfsAdapter<V> {
    vfs: V,
}

impl<V: Vfs> VfsAdapter<V> {
    pub fn new(vfs: V) -> Self {
        Self { vfs }
    }

    fn wrap(name: &str, inner: Box<dyn VfsFile>) -> Box<dyn File> {
        Box::new(AdapterFile {
            name: name.to_string(),
            inner,
        })
    }
}

/// Open file handed out by the adapter
pub struct AdapterFile {
    name: String,
    inner: Box<dyn VfsFile>,
}

impl Read for AdapterFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for AdapterFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for AdapterFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl File for AdapterFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn truncate(&mut self, size: u64) -> Result<(), FsError> {
        Ok(self.inner.set_len(size)?)
    }

    fn sync(&mut self) -> Result<(), FsError> {
        Ok(self.inner.sync()?)
    }

    fn lock(&mut self) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    fn unlock(&mut self) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }
}

impl<V: Vfs> Basic for VfsAdapter<V> {
    fn create(&self, filename: &str) -> Result<Box<dyn File>, FsError> {
        let file = self.vfs.create(filename)?;
        Ok(Self::wrap(filename, file))
    }

    fn open(&self, filename: &str) -> Result<Box<dyn File>, FsError> {
        let file = self.vfs.open(filename)?;
        Ok(Self::wrap(filename, file))
    }

    fn open_file(
        &self,
        filename: &str,
        flags: OpenFlags,
        perm: u32,
    ) -> Result<Box<dyn File>, FsError> {
        let file = self.vfs.open_file(filename, flags, perm)?;
        Ok(Self::wrap(filename, file))
    }

    fn stat(&self, filename: &str) -> Result<FileInfo, FsError> {
        Ok(self.vfs.stat(filename)?)
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        Ok(self.vfs.rename(from, to)?)
    }

    fn remove(&self, filename: &str) -> Result<(), FsError> {
        Ok(self.vfs.remove(filename)?)
    }

    fn join(&self, parts: &[String]) -> String {
        let joined = parts
            .iter()
            .map(|part| part.trim_matches('/'))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        if joined.is_empty() {
            "/".to_string()
        } else {
            joined
        }
    }
}

impl<V: Vfs> Dir for VfsAdapter<V> {
    fn read_dir(&self, path: &str) -> Result<Vec<FileInfo>, FsError> {
        Ok(self.vfs.read_dir(path)?)
    }

    fn mkdir_all(&self, _path: &str, _perm: u32) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }
}

impl<V: Vfs> Chroot for VfsAdapter<V> {
    fn chroot(&self, _path: &str) -> Result<Arc<dyn Filesystem>, FsError> {
        Err(FsError::NotSupported)
    }

    fn root(&self) -> String {
        "/".to_string()
    }
}

impl<V: Vfs> Symlink for VfsAdapter<V> {
    fn lstat(&self, _filename: &str) -> Result<FileInfo, FsError> {
        Err(FsError::NotSupported)
    }

    fn symlink(&self, _target: &str, _link: &str) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    fn readlink(&self, _link: &str) -> Result<String, FsError> {
        Err(FsError::NotSupported)
    }
}

impl<V: Vfs> TempFile for VfsAdapter<V> {
    fn temp_file(&self, _dir: &str, _prefix: &str) -> Result<Box<dyn File>, FsError> {
        Err(FsError::NotSupported)
    }
}

impl<V: Vfs> Change for VfsAdapter<V> {
    fn chmod(&self, name: &str, mode: u32) -> Result<(), FsError> {
        let change = self.vfs.change().ok_or(FsError::NotSupported)?;
        Ok(change.chmod(name, mode)?)
    }

    fn lchown(&self, _name: &str, _uid: Option<u32>, _gid: Option<u32>) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    fn chown(&self, name: &str, uid: Option<u32>, gid: Option<u32>) -> Result<(), FsError> {
        let change = self.vfs.change().ok_or(FsError::NotSupported)?;
        Ok(change.chown(name, uid, gid)?)
    }

    fn chtimes(
        &self,
        name: &str,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> Result<(), FsError> {
        let change = self.vfs.change().ok_or(FsError::NotSupported)?;
        Ok(change.chtimes(name, atime, mtime)?)
    }
}

impl<V: Vfs> Filesystem for VfsAdapter<V> {
    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::READ | Capabilities::SEEK;
        if !self.vfs.is_read_only() {
            caps |= Capabilities::WRITE | Capabilities::TRUNCATE;
        }
        caps
    }

    fn as_change(&self) -> Option<&dyn Change> {
        self.vfs.change().map(|_| self as &dyn Change)
    }

    fn space_usage(&self) -> Result<SpaceUsage, FsError> {
        Ok(self.vfs.statfs()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::LocalVfs;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_fs(read_only: bool) -> (VfsAdapter<LocalVfs>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let vfs = LocalVfs::new(temp_dir.path(), read_only).unwrap();
        (VfsAdapter::new(vfs), temp_dir)
    }

    fn parts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_join() {
        let (fs, _temp_dir) = create_test_fs(false);
        assert_eq!(fs.join(&[]), "/");
        assert_eq!(fs.join(&parts(&["docs", "report.txt"])), "docs/report.txt");
        assert_eq!(fs.join(&parts(&["", "a", "", "b"])), "a/b");
    }

    #[test]
    fn test_capabilities() {
        let (writable, _t1) = create_test_fs(false);
        let (read_only, _t2) = create_test_fs(true);

        let caps = writable.capabilities();
        assert!(caps.contains(Capabilities::READ_AND_WRITE));
        assert!(caps.contains(Capabilities::SEEK | Capabilities::TRUNCATE));
        assert!(!caps.contains(Capabilities::LOCK));

        let caps = read_only.capabilities();
        assert_eq!(caps, Capabilities::READ | Capabilities::SEEK);
    }

    #[test]
    fn test_change_availability() {
        let (writable, _t1) = create_test_fs(false);
        let (read_only, _t2) = create_test_fs(true);

        assert!(writable.as_change().is_some());
        assert!(read_only.as_change().is_none());
        assert!(read_only.chmod("x", 0o644).unwrap_err().is_not_supported());
    }

    #[test]
    fn test_unsupported_operations() {
        let (fs, temp_dir) = create_test_fs(false);
        fs::write(temp_dir.path().join("f"), b"x").unwrap();

        assert!(fs.mkdir_all("a/b", 0o755).unwrap_err().is_not_supported());
        assert!(fs.chroot("a").err().unwrap().is_not_supported());
        assert!(fs.lstat("f").unwrap_err().is_not_supported());
        assert!(fs.symlink("f", "l").unwrap_err().is_not_supported());
        assert!(fs.readlink("l").unwrap_err().is_not_supported());
        assert!(fs.temp_file("/", "tmp").err().unwrap().is_not_supported());
        assert!(fs.lchown("f", Some(0), None).unwrap_err().is_not_supported());

        let mut file = fs.open("f").unwrap();
        assert!(file.lock().unwrap_err().is_not_supported());
        assert!(file.unlock().unwrap_err().is_not_supported());
    }

    #[test]
    fn test_errors_pass_through() {
        let (fs, _temp_dir) = create_test_fs(false);
        let err = fs.stat("missing").unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn test_file_io() {
        let (fs, _temp_dir) = create_test_fs(false);

        let mut file = fs.create("data.bin").unwrap();
        assert_eq!(file.name(), "data.bin");
        file.write_all(b"0123456789").unwrap();
        file.truncate(4).unwrap();
        file.sync().unwrap();
        drop(file);

        let mut file = fs.open("data.bin").unwrap();
        file.seek(SeekFrom::Start(1)).unwrap();
        let mut buf = String::new();
        file.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "123");
    }
}
