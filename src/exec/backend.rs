// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of running pipelines
//! itself, so tests can record dispatched runs and answer with synthetic
//! `RunFinished` events.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;

use crate::engine::{RuntimeEvent, ScheduledRun};
use crate::errors::Result;
use crate::pipeline::PipelineRunner;
use crate::task::TaskRegistry;

use super::executor_loop::spawn_executor;

pub trait ExecutorBackend: Send {
    /// Start the given runs. Completion is reported asynchronously as
    /// `RuntimeEvent::RunFinished`.
    fn dispatch(
        &mut self,
        runs: Vec<ScheduledRun>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: forwards runs to the background executor loop.
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ScheduledRun>,
}

impl RealExecutorBackend {
    /// Spawns the executor loop immediately.
    pub fn new(
        runner: PipelineRunner,
        registry: Arc<TaskRegistry>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        let tx = spawn_executor(runner, registry, runtime_tx);
        Self { tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn dispatch(
        &mut self,
        runs: Vec<ScheduledRun>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();

        Box::pin(async move {
            for run in runs {
                tx.send(run)
                    .await
                    .map_err(|_| anyhow!("executor loop has shut down"))?;
            }
            Ok(())
        })
    }
}
