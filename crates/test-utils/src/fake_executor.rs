use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use assetpipe::engine::{RuntimeEvent, ScheduledRun};
use assetpipe::errors::Result;
use assetpipe::exec::ExecutorBackend;
use assetpipe::types::RunOutcome;
use tokio::sync::mpsc;

/// A fake executor that records every dispatched run.
///
/// With `auto_complete` it immediately reports `RunFinished(Success)`;
/// without it, runs stay "in flight" until the test sends `RunFinished`
/// itself, which is how busy-policy behaviour is exercised.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    dispatched: Arc<Mutex<Vec<ScheduledRun>>>,
    auto_complete: bool,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        dispatched: Arc<Mutex<Vec<ScheduledRun>>>,
    ) -> Self {
        Self {
            runtime_tx,
            dispatched,
            auto_complete: true,
        }
    }

    /// Leave runs in flight; the test completes them.
    pub fn manual(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        dispatched: Arc<Mutex<Vec<ScheduledRun>>>,
    ) -> Self {
        Self {
            auto_complete: false,
            ..Self::new(runtime_tx, dispatched)
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn dispatch(
        &mut self,
        runs: Vec<ScheduledRun>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let dispatched = Arc::clone(&self.dispatched);
        let auto_complete = self.auto_complete;

        Box::pin(async move {
            for run in runs {
                dispatched.lock().unwrap().push(run.clone());

                if auto_complete {
                    tx.send(RuntimeEvent::RunFinished {
                        unit: run.unit,
                        run_id: run.run_id,
                        outcome: RunOutcome::Success,
                    })
                    .await
                    .map_err(|e| anyhow::anyhow!("runtime channel closed: {e}"))?;
                }
            }
            Ok(())
        })
    }
}
