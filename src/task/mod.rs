// src/task/mod.rs

//! Tasks: named units of file work.
//!
//! - [`Task`] is the async contract every task implements: given a
//!   [`TaskContext`] it produces a completion signal.
//! - [`builtin`] holds the file plumbing actions (`clean`, `copy`,
//!   `include`, `sass`, `rename_prefix`).
//! - [`command`] runs external programs through the platform shell.
//! - [`registry`] maps names to tasks and resolves pipelines into plans.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::PathConfig;
use crate::fs::{FileSystem, RealFileSystem};

pub mod builtin;
pub mod command;
pub mod registry;

pub use builtin::BuiltinTask;
pub use command::CommandTask;
pub use registry::TaskRegistry;

/// Result of one task invocation. `Err` carries the underlying cause.
pub type CompletionSignal = anyhow::Result<()>;

/// Boxed future returned by [`Task::run`].
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = CompletionSignal> + Send + 'a>>;

/// A named, independently invocable unit of work.
pub trait Task: Send + Sync + fmt::Debug {
    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a>;

    /// One-line human description (used by `assetpipe list`).
    fn describe(&self) -> String;
}

/// Everything a task may look at while running.
#[derive(Debug, Clone)]
pub struct TaskContext {
    paths: Arc<PathConfig>,
    fs: Arc<dyn FileSystem>,
}

impl TaskContext {
    pub fn new(paths: Arc<PathConfig>, fs: Arc<dyn FileSystem>) -> Self {
        Self { paths, fs }
    }

    /// Context over the real filesystem.
    pub fn real(paths: Arc<PathConfig>) -> Self {
        Self::new(paths, Arc::new(RealFileSystem))
    }

    pub fn paths(&self) -> &PathConfig {
        &self.paths
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }
}

type SyncAction = dyn Fn(&TaskContext) -> CompletionSignal + Send + Sync;

/// Task backed by a synchronous closure. Handy for tests and for embedding
/// assetpipe as a library.
pub struct FnTask {
    label: String,
    action: Box<SyncAction>,
}

impl FnTask {
    pub fn new<F>(label: impl Into<String>, action: F) -> Self
    where
        F: Fn(&TaskContext) -> CompletionSignal + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            action: Box::new(action),
        }
    }
}

impl fmt::Debug for FnTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl Task for FnTask {
    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(async move { (self.action)(ctx) })
    }

    fn describe(&self) -> String {
        format!("fn: {}", self.label)
    }
}
