// src/watch/mod.rs

//! File watching and change detection.
//!
//! - [`patterns`] compiles `[watch.*]` tables into [`WatchBinding`]s.
//! - [`watcher`] wires up `notify` and feeds raw paths to [`debounce`].
//! - [`event_handler`] turns each settled batch into unit triggers,
//!   optionally skipping bindings whose content hash did not change
//!   ([`hash`]).
//!
//! It knows nothing about how units run; it only emits triggers.

pub mod debounce;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use debounce::run_debounced;
pub use event_handler::BatchProcessor;
pub use hash::{compute_aggregate_hash, compute_file_hash, tree_digest, HashStore};
pub use patterns::{build_bindings, collect_matching_files, unmatched_patterns, WatchBinding};
pub use watcher::{spawn_watcher, WatcherHandle};
