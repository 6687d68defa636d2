// src/watch/hash.rs

//! Content hashing for `use_hash` bindings and build comparisons.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use blake3::Hasher;
use tracing::debug;

use crate::fs::{relative_slash, walk_files, FileSystem};

/// Hash of a single file's contents.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs.read(path)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Combine per-file hashes into one.
///
/// `hashes` must be ordered by the corresponding file path for the result to
/// be stable.
pub fn compute_aggregate_hash(hashes: &[String]) -> String {
    let mut hasher = Hasher::new();
    for h in hashes {
        hasher.update(h.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Digest of a whole directory tree: every file's relative path and content.
///
/// Two trees have the same digest exactly when they contain the same files
/// with the same bytes.
pub fn tree_digest(fs: &dyn FileSystem, root: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    for path in walk_files(fs, root, &|_| false)? {
        let rel = relative_slash(root, &path).unwrap_or_default();
        hasher.update(rel.as_bytes());
        hasher.update(&[0]);
        hasher.update(compute_file_hash(fs, &path)?.as_bytes());
        hasher.update(&[b'\n']);
    }
    let digest = hasher.finalize().to_hex().to_string();
    debug!(root = ?root, digest = %digest, "computed tree digest");
    Ok(digest)
}

/// Last aggregate hash seen per watch binding. Kept in memory for the
/// lifetime of a `serve` session.
#[derive(Debug, Default)]
pub struct HashStore {
    map: HashMap<String, String>,
}

impl HashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, binding: &str) -> Option<&str> {
        self.map.get(binding).map(String::as_str)
    }

    /// Store `hash` for `binding`. Returns true when it differs from the
    /// previous value (or there was none).
    pub fn update(&mut self, binding: &str, hash: String) -> bool {
        match self.map.insert(binding.to_string(), hash.clone()) {
            Some(old) => old != hash,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn tree_digest_tracks_paths_and_contents() {
        let a = MockFileSystem::new();
        a.add_file("./build/index.html", "<p>hi</p>");
        a.add_file("./build/js/script.min.js", "x");

        let b = MockFileSystem::new();
        b.add_file("./build/js/script.min.js", "x");
        b.add_file("./build/index.html", "<p>hi</p>");

        let root = Path::new("./build");
        assert_eq!(tree_digest(&a, root).unwrap(), tree_digest(&b, root).unwrap());

        b.add_file("./build/js/script.min.js", "y");
        assert_ne!(tree_digest(&a, root).unwrap(), tree_digest(&b, root).unwrap());
    }

    #[test]
    fn store_reports_changes_only() {
        let mut store = HashStore::new();
        assert!(store.update("style", "abc".into()));
        assert!(!store.update("style", "abc".into()));
        assert!(store.update("style", "def".into()));
        assert_eq!(store.load("style"), Some("def"));
    }
}
