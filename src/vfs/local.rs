// Local Filesystem Backend
//
// Implements the Vfs trait on top of std::fs, confined to an export root.

use std::fs::{self, File, FileTimes, OpenOptions};
use std::io;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use super::{FileInfo, FileType, OpenFlags, SpaceUsage, Vfs, VfsChange, VfsFile};

/// Local filesystem implementation
#[derive(Debug, Clone)]
pub struct LocalVfs {
    /// Canonical export root
    root_path: PathBuf,
    read_only: bool,
}

impl LocalVfs {
    /// Create a new local backend
    ///
    /// # Arguments
    /// * `root_path` - Directory to export (e.g., "/export")
    /// * `read_only` - Reject every operation that would modify the tree
    pub fn new<P: AsRef<Path>>(root_path: P, read_only: bool) -> io::Result<Self> {
        let root_path = root_path.as_ref().canonicalize()?;

        let metadata = fs::metadata(&root_path)?;
        if !metadata.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("export root is not a directory: {}", root_path.display()),
            ));
        }

        debug!("LocalVfs created with root: {:?} (read_only={})", root_path, read_only);

        Ok(Self {
            root_path,
            read_only,
        })
    }

    /// Canonical export root
    /// Map a virtual path onto the host filesystem
    ///
    /// ".." is rejected outright; symlinks that lead outside the root are
    /// caught by `validate_path`.
    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let mut full = self.root_path.clone();
        for component in path.split('/') {
            match component {
                "" | "." => {}
                ".." => {
                    warn!("Path traversal attempt: {:?}", path);
                    return Err(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        format!("path escapes export root: {path}"),
                    ));
                }
                name => full.push(name),
            }
        }

        self.validate_path(&full)?;
        Ok(full)
    }

    /// Validate that a host path is within the export root
    fn validate_path(&self, path: &Path) -> io::Result<()> {
        let canonical = match path.canonicalize() {
            Ok(canonical) => canonical,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Not created yet: the parent decides
                let parent = path.parent().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "path has no parent")
                })?;
                parent.canonicalize()?
            }
            Err(e) => return Err(e),
        };

        if !canonical.starts_with(&self.root_path) {
            warn!(
                "Path traversal attempt: {:?} is outside root {:?}",
                canonical, self.root_path
            );
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "path is outside export root",
            ));
        }

        Ok(())
    }

    fn check_writable(&self) -> io::Result<()> {
        if self.read_only {
            Err(io::Error::new(
                io::ErrorKind::ReadOnlyFilesystem,
                "export is read-only",
            ))
        } else {
            Ok(())
        }
    }

    /// Convert std::fs::Metadata to FileInfo
    fn metadata_to_info(name: String, metadata: &fs::Metadata) -> FileInfo {
        let file_type = if metadata.is_dir() {
            FileType::Directory
        } else if metadata.is_file() {
            FileType::RegularFile
        } else if metadata.is_symlink() {
            FileType::Symlink
        } else {
            FileType::Other
        };

        FileInfo {
            name,
            file_type,
            size: metadata.len(),
            mode: metadata.permissions().mode() & 0o7777,
            nlink: metadata.nlink() as u32,
            uid: metadata.uid(),
            gid: metadata.gid(),
            atime: unix_time(metadata.atime(), metadata.atime_nsec()),
            mtime: unix_time(metadata.mtime(), metadata.mtime_nsec()),
            ctime: unix_time(metadata.ctime(), metadata.ctime_nsec()),
        }
    }
}

fn unix_time(seconds: i64, nseconds: i64) -> SystemTime {
    let nanos = Duration::from_nanos(nseconds.clamp(0, 999_999_999) as u64);
    if seconds >= 0 {
        UNIX_EPOCH + Duration::from_secs(seconds as u64) + nanos
    } else {
        UNIX_EPOCH - Duration::from_secs(seconds.unsigned_abs()) + nanos
    }
}

fn final_component(path: &str) -> String {
    path.rsplit('/')
        .find(|c| !c.is_empty())
        .unwrap_or("/")
        .to_string()
}

impl Vfs for LocalVfs {
    fn create(&self, path: &str) -> io::Result<Box<dyn VfsFile>> {
        self.check_writable()?;
        let full_path = self.resolve(path)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o644)
            .open(&full_path)?;

        debug!("CREATE: {:?}", full_path);
        Ok(Box::new(file))
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn VfsFile>> {
        let full_path = self.resolve(path)?;
        let file = File::open(&full_path)?;
        Ok(Box::new(file))
    }

    fn open_file(&self, path: &str, flags: OpenFlags, perm: u32) -> io::Result<Box<dyn VfsFile>> {
        if flags.mutates() {
            self.check_writable()?;
        }
        let full_path = self.resolve(path)?;

        let mut options = OpenOptions::new();
        options
            .read(flags.read)
            .write(flags.write || flags.truncate)
            .truncate(flags.truncate)
            .mode(perm);
        if flags.exclusive {
            options.create_new(true);
        } else {
            options.create(flags.create);
        }

        let file = options.open(&full_path)?;

        debug!("OPEN: {:?} flags={:?} perm={:o}", full_path, flags, perm);
        Ok(Box::new(file))
    }

    fn stat(&self, path: &str) -> io::Result<FileInfo> {
        let full_path = self.resolve(path)?;
        let metadata = fs::symlink_metadata(&full_path)?;
        Ok(Self::metadata_to_info(final_component(path), &metadata))
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<FileInfo>> {
        let dir_path = self.resolve(path)?;

        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir_path)? {
            let entry = entry?;
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                // Removed between readdir and stat
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!("Skipping non UTF-8 name {:?} in {:?}", raw, dir_path);
                    continue;
                }
            };
            entries.push(Self::metadata_to_info(name, &metadata));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        debug!("READDIR: {:?} -> {} entries", dir_path, entries.len());
        Ok(entries)
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        self.check_writable()?;
        let full_path = self.resolve(path)?;
        if full_path == self.root_path {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot remove export root",
            ));
        }

        if fs::symlink_metadata(&full_path)?.is_dir() {
            fs::remove_dir(&full_path)?;
        } else {
            fs::remove_file(&full_path)?;
        }

        debug!("REMOVE: {:?}", full_path);
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        self.check_writable()?;
        let from_full_path = self.resolve(from)?;
        let to_full_path = self.resolve(to)?;

        fs::rename(&from_full_path, &to_full_path)?;

        debug!("RENAME: {:?} -> {:?}", from_full_path, to_full_path);
        Ok(())
    }

    fn statfs(&self) -> io::Result<SpaceUsage> {
        let stat = nix::sys::statvfs::statvfs(&self.root_path).map_err(io::Error::from)?;
        let fragment_size = stat.fragment_size() as u64;
        let blocks = u64::from(stat.blocks());

        Ok(SpaceUsage {
            total: blocks * fragment_size,
            used: blocks.saturating_sub(u64::from(stat.blocks_free())) * fragment_size,
            free: u64::from(stat.blocks_available()) * fragment_size,
        })
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn change(&self) -> Option<&dyn VfsChange> {
        if self.read_only { None } else { Some(self) }
    }
}

impl VfsChange for LocalVfs {
    fn chmod(&self, path: &str, mode: u32) -> io::Result<()> {
        let full_path = self.resolve(path)?;
        fs::set_permissions(&full_path, fs::Permissions::from_mode(mode & 0o7777))?;
        debug!("CHMOD: {:?} mode={:o}", full_path, mode);
        Ok(())
    }

    fn chown(&self, path: &str, uid: Option<u32>, gid: Option<u32>) -> io::Result<()> {
        let full_path = self.resolve(path)?;
        std::os::unix::fs::chown(&full_path, uid, gid)?;
        debug!("CHOWN: {:?} uid={:?} gid={:?}", full_path, uid, gid);
        Ok(())
    }

    fn chtimes(
        &self,
        path: &str,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> io::Result<()> {
        let full_path = self.resolve(path)?;

        let mut times = FileTimes::new();
        if let Some(atime) = atime {
            times = times.set_accessed(atime);
        }
        if let Some(mtime) = mtime {
            times = times.set_modified(mtime);
        }
        File::open(&full_path)?.set_times(times)?;

        debug!("CHTIMES: {:?} atime={:?} mtime={:?}", full_path, atime, mtime);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    /// Helper: Create a backend over a temporary directory
    fn create_test_vfs(read_only: bool) -> (LocalVfs, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let vfs = LocalVfs::new(temp_dir.path(), read_only).expect("Failed to create vfs");
        (vfs, temp_dir)
    }

    #[test]
    fn test_root_is_directory() {
        let (vfs, _temp_dir) = create_test_vfs(false);
        for root in ["", "/"] {
            let info = vfs.stat(root).expect("Failed to stat root");
            assert!(info.is_dir());
            assert_eq!(info.name, "/");
        }
    }

    #[test]
    fn test_new_rejects_regular_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("plain");
        fs::write(&file, b"x").unwrap();

        let err = LocalVfs::new(&file, false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotADirectory);
    }

    #[test]
    fn test_create_write_and_read() {
        let (vfs, _temp_dir) = create_test_vfs(false);

        let mut file = vfs.create("data.txt").expect("Failed to create");
        file.write_all(b"Hello, NFS World!").unwrap();
        drop(file);

        let mut content = String::new();
        vfs.open("/data.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "Hello, NFS World!");

        let info = vfs.stat("data.txt").unwrap();
        assert_eq!(info.name, "data.txt");
        assert_eq!(info.file_type, FileType::RegularFile);
        assert_eq!(info.size, 17);
    }

    #[test]
    fn test_read_dir_is_sorted() {
        let (vfs, temp_dir) = create_test_vfs(false);
        fs::write(temp_dir.path().join("b.txt"), b"b").unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(temp_dir.path().join("c")).unwrap();

        let names: Vec<_> = vfs
            .read_dir("/")
            .unwrap()
            .into_iter()
            .map(|info| info.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c"]);
    }

    #[test]
    fn test_read_dir_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (vfs, temp_dir) = create_test_vfs(false);
        fs::write(temp_dir.path().join("ok.txt"), b"ok").unwrap();
        fs::write(temp_dir.path().join(OsStr::from_bytes(b"bad\xff")), b"bad").unwrap();

        let names: Vec<_> = vfs
            .read_dir("")
            .unwrap()
            .into_iter()
            .map(|info| info.name)
            .collect();
        assert_eq!(names, vec!["ok.txt"]);
    }

    #[test]
    fn test_exclusive_create() {
        let (vfs, _temp_dir) = create_test_vfs(false);

        vfs.open_file("new.txt", OpenFlags::create_new(), 0o600)
            .expect("First exclusive create should succeed");
        let err = vfs
            .open_file("new.txt", OpenFlags::create_new(), 0o600)
            .err()
            .expect("Second exclusive create should fail");
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(vfs.stat("new.txt").unwrap().mode, 0o600);
    }

    #[test]
    fn test_remove_file_and_directory() {
        let (vfs, temp_dir) = create_test_vfs(false);
        fs::write(temp_dir.path().join("temp.txt"), b"x").unwrap();
        fs::create_dir(temp_dir.path().join("tempdir")).unwrap();

        vfs.remove("temp.txt").unwrap();
        vfs.remove("tempdir").unwrap();

        assert_eq!(
            vfs.stat("temp.txt").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        assert_eq!(
            vfs.stat("tempdir").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_remove_root_is_refused() {
        let (vfs, _temp_dir) = create_test_vfs(false);
        assert_eq!(
            vfs.remove("/").unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn test_rename() {
        let (vfs, temp_dir) = create_test_vfs(false);
        fs::write(temp_dir.path().join("old.txt"), b"x").unwrap();

        vfs.rename("old.txt", "new.txt").unwrap();

        assert!(vfs.stat("old.txt").is_err());
        assert!(vfs.stat("new.txt").is_ok());
    }

    #[test]
    fn test_path_traversal_prevention() {
        let (vfs, _temp_dir) = create_test_vfs(false);

        let err = vfs.stat("../etc/passwd").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);

        let err = vfs.stat("sub/../../x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_symlink_escape_is_rejected() {
        let (vfs, temp_dir) = create_test_vfs(false);
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), temp_dir.path().join("escape")).unwrap();

        let err = vfs.read_dir("escape").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_read_only_rejects_mutation() {
        let (vfs, temp_dir) = create_test_vfs(true);
        fs::write(temp_dir.path().join("keep.txt"), b"x").unwrap();

        let kind = |r: io::Result<()>| r.unwrap_err().kind();
        assert_eq!(
            kind(vfs.create("x").map(|_| ())),
            io::ErrorKind::ReadOnlyFilesystem
        );
        assert_eq!(kind(vfs.remove("keep.txt")), io::ErrorKind::ReadOnlyFilesystem);
        assert_eq!(
            kind(vfs.rename("keep.txt", "moved.txt")),
            io::ErrorKind::ReadOnlyFilesystem
        );
        assert_eq!(
            kind(vfs.open_file("keep.txt", OpenFlags::read_write(), 0).map(|_| ())),
            io::ErrorKind::ReadOnlyFilesystem
        );

        // Reads still work
        assert!(vfs.open("keep.txt").is_ok());
        assert!(vfs.change().is_none());
    }

    #[test]
    fn test_statfs_reports_space() {
        let (vfs, _temp_dir) = create_test_vfs(false);
        let usage = vfs.statfs().expect("statfs should succeed");
        assert!(usage.total > 0);
        assert!(usage.free <= usage.total);
        assert!(usage.used <= usage.total);
    }

    #[test]
    fn test_change_chmod_and_chtimes() {
        let (vfs, temp_dir) = create_test_vfs(false);
        fs::write(temp_dir.path().join("f"), b"x").unwrap();
        let change = vfs.change().expect("Writable backend supports change");

        change.chmod("f", 0o600).unwrap();
        assert_eq!(vfs.stat("f").unwrap().mode, 0o600);

        let mtime = UNIX_EPOCH + Duration::from_secs(1_000_000);
        change.chtimes("f", None, Some(mtime)).unwrap();
        assert_eq!(vfs.stat("f").unwrap().mtime, mtime);
    }

    #[test]
    fn test_unix_time_before_epoch() {
        assert_eq!(
            unix_time(-1, 500_000_000),
            UNIX_EPOCH - Duration::from_millis(500)
        );
        assert_eq!(unix_time(2, 0), UNIX_EPOCH + Duration::from_secs(2));
    }
}
