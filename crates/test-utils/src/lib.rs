pub mod builders;
pub mod fake_executor;
pub mod fake_tasks;

use std::path::Path;
use std::sync::{Arc, Once};

use assetpipe::config::{ConfigFile, PathConfig};
use assetpipe::fs::mock::MockFileSystem;
use assetpipe::task::TaskContext;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Logs go through `with_test_writer()`, so the harness only prints them
/// for failing tests (or with `-- --nocapture`). Levels come from
/// `RUST_LOG`, e.g. `RUST_LOG=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Task context over an in-memory filesystem rooted at `.`.
pub fn mock_context(cfg: &ConfigFile, fs: &MockFileSystem) -> TaskContext {
    let paths = PathConfig::from_config(cfg, ".").expect("valid paths");
    TaskContext::new(Arc::new(paths), Arc::new(fs.clone()))
}

/// Task context over the real filesystem rooted at `root`.
pub fn disk_context(cfg: &ConfigFile, root: &Path) -> TaskContext {
    let paths = PathConfig::from_config(cfg, root).expect("valid paths");
    TaskContext::real(Arc::new(paths))
}
