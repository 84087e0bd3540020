// File Handle Management
//
// File handles are opaque identifiers used by NFS to reference files and
// directories. A handle is the SHA-256 digest of an object's path
// components, so the same path always yields the same handle. The registry
// remembers which components produced each handle, up to a fixed number of
// entries; handles that fall out of it become stale.

use std::num::NonZeroUsize;

use sha2::{Digest, Sha256};
use thiserror::Error;

use super::cache::BoundedCache;

/// Handle size in bytes (one SHA-256 digest)
pub const HANDLE_SIZE: usize = 32;

/// File handle type
pub type FileHandle = [u8; HANDLE_SIZE];

/// Handle resolution error
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    /// Never issued, or evicted since
    #[error("unknown or expired file handle")]
    Unknown,

    /// Registry entry does not hash back to its key
    #[error("invalid cached value for file handle")]
    InvalidCachedValue,
}

/// Handle registry
///
/// Thread-safe bounded map from handle to path components.
pub struct HandleRegistry {
    entries: BoundedCache<FileHandle, Vec<String>>,
}

impl HandleRegistry {
    pub fn new(limit: NonZeroUsize) -> Self {
        Self {
            entries: BoundedCache::new(limit),
        }
    }

    /// Handle for a path, without registering it
    ///
    /// Components are hashed back to back with no separator.
    pub fn digest(path: &[String]) -> FileHandle {
        let mut hasher = Sha256::new();
        for component in path {
            hasher.update(component.as_bytes());
        }
        hasher.finalize().into()
    }

    /// Issue the handle for a path and remember it
    pub fn to_handle(&self, path: &[String]) -> FileHandle {
        let handle = Self::digest(path);
        if self.entries.insert(handle, path.to_vec()) {
            tracing::debug!("Handle registry full, evicted least recently used handle");
        }
        handle
    }

    /// Resolve a handle back to its path components
    ///
    /// Wire handles shorter than `HANDLE_SIZE` are zero-padded; longer ones
    /// are truncated.
    pub fn from_handle(&self, fh: &[u8]) -> Result<Vec<String>, HandleError> {
        let mut key = [0u8; HANDLE_SIZE];
        let len = fh.len().min(HANDLE_SIZE);
        key[..len].copy_from_slice(&fh[..len]);

        let path = self.entries.get(&key).ok_or(HandleError::Unknown)?;
        if Self::digest(&path) != key {
            tracing::error!("Handle registry entry does not match its key: {:?}", path);
            return Err(HandleError::InvalidCachedValue);
        }
        Ok(path)
    }

    /// Maximum number of live handles
    pub fn handle_limit(&self) -> usize {
        self.entries.capacity()
    }

    /// Number of live handles
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(limit: usize) -> HandleRegistry {
        HandleRegistry::new(NonZeroUsize::new(limit).unwrap())
    }

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_to_handle_is_deterministic() {
        let a = registry(8);
        let b = registry(8);
        let p = path(&["docs", "report.txt"]);

        assert_eq!(a.to_handle(&p), b.to_handle(&p));
        assert_eq!(a.to_handle(&p), HandleRegistry::digest(&p));
    }

    #[test]
    fn test_handle_is_sha256_of_concatenation() {
        let expected: [u8; 32] = Sha256::digest(b"docsreport.txt").into();
        assert_eq!(
            HandleRegistry::digest(&path(&["docs", "report.txt"])),
            expected
        );
    }

    #[test]
    fn test_component_boundaries_are_not_hashed() {
        assert_eq!(
            HandleRegistry::digest(&path(&["a", "bc"])),
            HandleRegistry::digest(&path(&["ab", "c"]))
        );
    }

    #[test]
    fn test_root_handle_is_digest_of_empty_input() {
        let expected: [u8; 32] = Sha256::digest(b"").into();
        assert_eq!(registry(1).to_handle(&[]), expected);
    }

    #[test]
    fn test_round_trip() {
        let registry = registry(8);
        let p = path(&["a", "b", "c"]);
        let handle = registry.to_handle(&p);

        assert_eq!(registry.from_handle(&handle).unwrap(), p);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_unknown_handle() {
        let registry = registry(8);
        let handle = HandleRegistry::digest(&path(&["never", "issued"]));

        assert_eq!(registry.from_handle(&handle), Err(HandleError::Unknown));
    }

    #[test]
    fn test_short_handle_is_zero_padded() {
        let registry = registry(8);
        let mut key = [0u8; HANDLE_SIZE];
        key[..2].copy_from_slice(&[0xab, 0xcd]);
        registry.entries.insert(key, path(&["x"]));

        // Padded key matches, but the entry does not hash to it
        assert_eq!(
            registry.from_handle(&[0xab, 0xcd]),
            Err(HandleError::InvalidCachedValue)
        );
    }

    #[test]
    fn test_long_handle_is_truncated() {
        let registry = registry(8);
        let p = path(&["file"]);
        let mut wire = registry.to_handle(&p).to_vec();
        wire.extend_from_slice(&[0xff; 16]);

        assert_eq!(registry.from_handle(&wire).unwrap(), p);
    }

    #[test]
    fn test_corrupted_entry_is_rejected() {
        let registry = registry(8);
        let handle = registry.to_handle(&path(&["real"]));
        registry.entries.insert(handle, path(&["forged"]));

        assert_eq!(
            registry.from_handle(&handle),
            Err(HandleError::InvalidCachedValue)
        );
    }

    #[test]
    fn test_eviction_past_limit() {
        let registry = registry(1024);
        let handles: Vec<_> = (0..2000)
            .map(|i| registry.to_handle(&path(&["dir", &format!("file{i}")])))
            .collect();

        assert_eq!(registry.count(), 1024);
        assert_eq!(registry.handle_limit(), 1024);
        assert_eq!(
            registry.from_handle(&handles[0]),
            Err(HandleError::Unknown)
        );
        assert_eq!(
            registry.from_handle(&handles[1999]).unwrap(),
            path(&["dir", "file1999"])
        );
    }

    #[test]
    fn test_resolving_refreshes_recency() {
        let registry = registry(2);
        let first = registry.to_handle(&path(&["first"]));
        registry.to_handle(&path(&["second"]));

        registry.from_handle(&first).unwrap();
        registry.to_handle(&path(&["third"]));

        assert!(registry.from_handle(&first).is_ok());
        assert_eq!(
            registry.from_handle(&HandleRegistry::digest(&path(&["second"]))),
            Err(HandleError::Unknown)
        );
    }

    #[test]
    fn test_concurrent_issue_and_resolve() {
        let registry = registry(64);

        std::thread::scope(|scope| {
            for t in 0..8 {
                let registry = &registry;
                scope.spawn(move || {
                    for i in 0..500 {
                        let p = path(&[&format!("t{t}"), &format!("f{}", i % 32)]);
                        let handle = registry.to_handle(&p);
                        // Other threads may evict it; a hit must be the right path
                        match registry.from_handle(&handle) {
                            Ok(resolved) => assert_eq!(resolved, p),
                            Err(e) => assert_eq!(e, HandleError::Unknown),
                        }
                    }
                });
            }
        });

        assert_eq!(registry.count(), 64);
        let p = path(&["after"]);
        let handle = registry.to_handle(&p);
        assert_eq!(registry.from_handle(&handle).unwrap(), p);
    }
}
