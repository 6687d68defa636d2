// src/watch/event_handler.rs

//! Turning a settled batch of changed paths into unit triggers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::PathConfig;
use crate::engine::{RuntimeEvent, TriggerReason};
use crate::fs::FileSystem;
use crate::watch::hash::{compute_aggregate_hash, compute_file_hash, HashStore};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{collect_matching_files, WatchBinding};

/// Matches batches against the watch bindings and sends the resulting
/// triggers to the runtime.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    root: PathBuf,
    paths: Arc<PathConfig>,
    bindings: Arc<Vec<WatchBinding>>,
    fs: Arc<dyn FileSystem>,
    hashes: Arc<Mutex<HashStore>>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl BatchProcessor {
    /// `root` is the directory event paths are relative to (usually the
    /// canonicalized project root).
    pub fn new(
        root: impl Into<PathBuf>,
        paths: Arc<PathConfig>,
        bindings: Vec<WatchBinding>,
        fs: Arc<dyn FileSystem>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            root: root.into(),
            paths,
            bindings: Arc::new(bindings),
            fs,
            hashes: Arc::new(Mutex::new(HashStore::new())),
            runtime_tx,
        }
    }

    /// Record the current content hash of every `use_hash` binding, so the
    /// first change after startup is compared against the startup state.
    pub fn prime_hashes(&self) {
        for binding in self.bindings.iter().filter(|b| b.use_hash()) {
            if let Some(hash) = self.aggregate_hash(binding) {
                if let Ok(mut store) = self.hashes.lock() {
                    store.update(binding.name(), hash);
                }
            }
        }
    }

    /// Handle one settled batch.
    ///
    /// Each unit whose binding matches any path in the batch is triggered
    /// exactly once; if several bindings target the same unit their reload
    /// flags are combined. Returns `false` once the runtime has gone away.
    pub async fn process(&self, batch: Vec<PathBuf>) -> bool {
        let rels: Vec<String> = batch
            .iter()
            .filter_map(|p| self.relativize(p))
            .filter(|rel| !rel.is_empty() && !self.paths.is_ignored(rel))
            .collect();

        if rels.is_empty() {
            return true;
        }
        debug!(paths = ?rels, "processing settled batch");

        let mut targets: BTreeMap<&str, bool> = BTreeMap::new();
        for binding in self.bindings.iter() {
            let Some(first) = rels.iter().find(|rel| binding.matches(rel)) else {
                continue;
            };
            if !self.should_trigger(binding, first).await {
                continue;
            }
            debug!(binding = %binding.name(), path = %first, unit = %binding.target(), "watch match");
            *targets.entry(binding.target()).or_default() |= binding.reload();
        }

        for (unit, reload) in targets {
            info!(unit = %unit, "change detected; triggering");
            let event = RuntimeEvent::Triggered {
                unit: unit.to_string(),
                reload,
                reason: TriggerReason::FileWatch,
            };
            if let Err(err) = self.runtime_tx.send(event).await {
                warn!("failed to send RuntimeEvent::Triggered: {err}");
                return false;
            }
        }
        true
    }

    fn relativize(&self, path: &Path) -> Option<String> {
        let rel = relative_str(&self.root, path);
        if rel.is_none() {
            warn!("could not relativize path {:?} against root {:?}", path, self.root);
        }
        rel
    }

    /// Skip `use_hash` bindings whose watched content is unchanged.
    async fn should_trigger(&self, binding: &WatchBinding, rel_path: &str) -> bool {
        if !binding.use_hash() {
            return true;
        }

        let this = self.clone();
        let binding = binding.clone();
        let rel_path = rel_path.to_string();

        tokio::task::spawn_blocking(move || {
            let Some(hash) = this.aggregate_hash(&binding) else {
                return true;
            };
            let changed = match this.hashes.lock() {
                Ok(mut store) => store.update(binding.name(), hash),
                Err(_) => {
                    warn!("hash store mutex poisoned; triggering anyway");
                    true
                }
            };
            if !changed {
                info!(
                    binding = %binding.name(),
                    path = %rel_path,
                    "watched content unchanged; skipping trigger"
                );
            }
            changed
        })
        .await
        .unwrap_or(true)
    }

    fn aggregate_hash(&self, binding: &WatchBinding) -> Option<String> {
        let fs = self.fs.as_ref();
        let files = match collect_matching_files(fs, &self.paths, binding) {
            Ok(files) => files,
            Err(err) => {
                warn!(binding = %binding.name(), "failed to collect watched files: {err:#}");
                return None;
            }
        };

        let mut hashes = Vec::with_capacity(files.len());
        for file in files {
            match compute_file_hash(fs, &file) {
                Ok(h) => hashes.push(h),
                // Deleted between listing and hashing; the next batch catches up.
                Err(err) => {
                    warn!(binding = %binding.name(), file = ?file, "failed to hash file: {err:#}");
                    return None;
                }
            }
        }
        Some(compute_aggregate_hash(&hashes))
    }
}
