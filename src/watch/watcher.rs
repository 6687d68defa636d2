// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::PathConfig;
use crate::engine::RuntimeEvent;
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::debounce::run_debounced;
use crate::watch::event_handler::BatchProcessor;
use crate::watch::patterns::WatchBinding;

/// Keeps the underlying `notify` watcher alive. Dropping it stops watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch the project root recursively and send `RuntimeEvent::Triggered`
/// for every unit whose binding matches a settled batch of changes.
///
/// Raw events travel from the blocking `notify` callback over an unbounded
/// channel into an async debounce loop; each batch flushed after `debounce`
/// of quiet is handed to a [`BatchProcessor`].
pub fn spawn_watcher(
    paths: Arc<PathConfig>,
    bindings: Vec<WatchBinding>,
    debounce: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = paths.root().to_path_buf();
    let root = root.canonicalize().unwrap_or(root);

    let (event_tx, event_rx) = mpsc::unbounded_channel::<PathBuf>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }
                for path in event.paths {
                    if event_tx.send(path).is_err() {
                        // Debounce loop is gone; nothing left to notify.
                        return;
                    }
                }
            }
            Err(err) => eprintln!("assetpipe: file watch error: {err}"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!("file watcher started on {:?}", root);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let processor = BatchProcessor::new(root, paths, bindings, fs, runtime_tx);

    tokio::spawn(async move {
        {
            let processor = processor.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || processor.prime_hashes()).await {
                warn!("failed to prime watch hashes: {e}");
            }
        }

        run_debounced(event_rx, debounce, |batch| {
            let processor = processor.clone();
            async move { processor.process(batch).await }
        })
        .await;
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
