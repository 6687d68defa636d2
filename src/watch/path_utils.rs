// src/watch/path_utils.rs

use std::path::Path;

/// Convert an event path into a `/`-separated string relative to `root`.
///
/// Tries a plain `strip_prefix` first, then retries with both paths
/// canonicalized, which covers symlinked roots such as `/private/var` on
/// macOS. Returns `None` for paths outside `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    // A removed file can no longer be canonicalized; fall back to its parent.
    let root_canon = root.canonicalize().ok()?;
    let path_canon = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => {
            let parent = path.parent()?.canonicalize().ok()?;
            parent.join(path.file_name()?)
        }
    };

    let rel = path_canon.strip_prefix(&root_canon).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root_prefix() {
        assert_eq!(
            relative_str(Path::new("/srv/site"), Path::new("/srv/site/sass/a.scss")).as_deref(),
            Some("sass/a.scss")
        );
    }

    #[test]
    fn handles_deleted_file_under_canonical_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("js")).unwrap();
        let root = dir.path().canonicalize().unwrap();
        let gone = root.join("js/old.js");
        let rel = relative_str(&root.join("js/.."), &gone);
        assert_eq!(rel.as_deref(), Some("js/old.js"));
    }
}
