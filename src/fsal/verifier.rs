// Directory listing verifiers
//
// READDIR and READDIRPLUS page through a directory in several calls. The
// first call snapshots the listing and hands out a verifier derived from the
// directory's mtime; later calls present that verifier and are served from
// the snapshot, so entries keep stable positions across pages.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use super::cache::BoundedCache;
use super::{Basic, FileInfo};

/// Directory snapshot shared between the cache and in-flight replies
pub type Listing = Arc<Vec<FileInfo>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct VerifierKey {
    verifier: u64,
    path: String,
}

pub struct VerifierCache {
    snapshots: BoundedCache<VerifierKey, Listing>,
}

impl VerifierCache {
    pub fn new(limit: NonZeroUsize) -> Self {
        Self {
            snapshots: BoundedCache::new(limit),
        }
    }

    /// Issue a verifier for a directory listing and cache the listing
    ///
    /// Returns 0 without caching anything if the directory cannot be stat'ed.
    pub fn verifier_for<F>(&self, fs: &F, path: &str, contents: Listing) -> u64
    where
        F: Basic + ?Sized,
    {
        let info = match fs.stat(path) {
            Ok(info) => info,
            Err(e) => {
                tracing::debug!("Cannot stat {:?} for verifier: {}", path, e);
                return 0;
            }
        };

        let verifier = mtime_verifier(info.mtime);
        let key = VerifierKey {
            verifier,
            path: path.to_string(),
        };
        if self.snapshots.insert(key, contents) {
            tracing::debug!("Verifier cache full, evicted least recently used listing");
        }
        verifier
    }

    /// Listing previously cached under (path, verifier)
    pub fn data_for_verifier(&self, path: &str, verifier: u64) -> Option<Listing> {
        self.snapshots.get(&VerifierKey {
            verifier,
            path: path.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Modification time as microseconds since the epoch
///
/// Times before the epoch wrap to the two's complement of the negative count.
pub fn mtime_verifier(mtime: SystemTime) -> u64 {
    match mtime.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_micros() as u64,
        Err(e) => (e.duration().as_micros() as i64).wrapping_neg() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsal::{Dir, VfsAdapter};
    use crate::vfs::LocalVfs;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup() -> (VfsAdapter<LocalVfs>, VerifierCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let fs = VfsAdapter::new(LocalVfs::new(temp_dir.path(), false).unwrap());
        let cache = VerifierCache::new(NonZeroUsize::new(4).unwrap());
        (fs, cache, temp_dir)
    }

    #[test]
    fn test_mtime_verifier() {
        let t = UNIX_EPOCH + Duration::from_micros(1_700_000_000_123_456);
        assert_eq!(mtime_verifier(t), 1_700_000_000_123_456);
        assert_eq!(mtime_verifier(UNIX_EPOCH), 0);
        assert_eq!(
            mtime_verifier(UNIX_EPOCH - Duration::from_micros(1)),
            u64::MAX
        );
    }

    #[test]
    fn test_snapshot_round_trip() {
        let (fs, cache, temp_dir) = setup();
        fs::create_dir(temp_dir.path().join("docs")).unwrap();
        fs::write(temp_dir.path().join("docs/a.txt"), b"a").unwrap();

        let listing = Arc::new(fs.read_dir("docs").unwrap());
        let verifier = cache.verifier_for(&fs, "docs", listing.clone());

        let expected = mtime_verifier(fs.stat("docs").unwrap().mtime);
        assert_eq!(verifier, expected);
        assert_eq!(cache.data_for_verifier("docs", verifier), Some(listing));
    }

    #[test]
    fn test_snapshot_survives_directory_changes() {
        let (fs, cache, temp_dir) = setup();
        fs::write(temp_dir.path().join("a.txt"), b"a").unwrap();

        let listing = Arc::new(fs.read_dir("/").unwrap());
        let verifier = cache.verifier_for(&fs, "/", listing);

        fs::write(temp_dir.path().join("b.txt"), b"b").unwrap();

        let snapshot = cache.data_for_verifier("/", verifier).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "a.txt");
    }

    #[test]
    fn test_stat_failure_yields_zero() {
        let (fs, cache, _temp_dir) = setup();

        let verifier = cache.verifier_for(&fs, "missing", Arc::new(Vec::new()));

        assert_eq!(verifier, 0);
        assert!(cache.is_empty());
        assert_eq!(cache.data_for_verifier("missing", 0), None);
    }

    #[test]
    fn test_unknown_verifier_or_path() {
        let (fs, cache, _temp_dir) = setup();
        let verifier = cache.verifier_for(&fs, "/", Arc::new(Vec::new()));

        assert_eq!(cache.data_for_verifier("/", verifier.wrapping_add(1)), None);
        assert_eq!(cache.data_for_verifier("other", verifier), None);
    }

    #[test]
    fn test_bounded() {
        let (fs, cache, temp_dir) = setup();
        for i in 0..6 {
            let name = format!("d{i}");
            fs::create_dir(temp_dir.path().join(&name)).unwrap();
            cache.verifier_for(&fs, &name, Arc::new(Vec::new()));
        }
        assert_eq!(cache.len(), 4);
    }
}
