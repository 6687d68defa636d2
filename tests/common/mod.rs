#![allow(dead_code)]

use std::path::Path;

pub use assetpipe_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
pub use assetpipe_test_utils::fake_executor::FakeExecutor;
pub use assetpipe_test_utils::fake_tasks::{calls, recording_registry, CallLog};
pub use assetpipe_test_utils::{disk_context, init_tracing, mock_context, with_timeout};

/// Write `files` (relative path, contents) below `root`, creating directories.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}
