// src/exec/executor_loop.rs

//! Background loop that executes scheduled runs.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::engine::{RuntimeEvent, ScheduledRun};
use crate::pipeline::PipelineRunner;
use crate::task::TaskRegistry;
use crate::types::RunOutcome;

/// Spawn the executor loop and return the sender the backend feeds.
///
/// Every run gets its own Tokio task, so a slow unit never blocks another.
/// Runs still in flight when the channel closes are aborted; external
/// commands they started are killed on drop.
pub fn spawn_executor(
    runner: PipelineRunner,
    registry: Arc<TaskRegistry>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ScheduledRun> {
    let (tx, mut rx) = mpsc::channel::<ScheduledRun>(32);

    tokio::spawn(async move {
        info!("executor loop started");
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                maybe_run = rx.recv() => {
                    let Some(run) = maybe_run else { break };
                    let runner = runner.clone();
                    let registry = Arc::clone(&registry);
                    let rt_tx = runtime_tx.clone();
                    in_flight.spawn(async move {
                        execute_run(run, &runner, &registry, &rt_tx).await;
                    });
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!("run task panicked or was cancelled: {e}");
                    }
                }
            }
        }

        if !in_flight.is_empty() {
            info!(runs = in_flight.len(), "executor shutting down; aborting in-flight runs");
        }
        in_flight.shutdown().await;
        info!("executor loop finished (channel closed)");
    });

    tx
}

async fn execute_run(
    run: ScheduledRun,
    runner: &PipelineRunner,
    registry: &TaskRegistry,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) {
    debug!(unit = %run.unit, run_id = run.run_id, "run starting");

    let outcome = match runner.run_unit(registry, &run.unit).await {
        Ok(_) => RunOutcome::Success,
        Err(err) => {
            let task = err.failed_task().unwrap_or(&run.unit).to_string();
            let err = anyhow::Error::from(err);
            error!(unit = %run.unit, run_id = run.run_id, "{err:#}");
            RunOutcome::Failed(task)
        }
    };

    let _ = runtime_tx
        .send(RuntimeEvent::RunFinished {
            unit: run.unit,
            run_id: run.run_id,
            outcome,
        })
        .await;
}
