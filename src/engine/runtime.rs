// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::server::ReloadHub;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent, ScheduledRun};

/// Async shell around [`CoreRuntime`].
///
/// Reads `RuntimeEvent`s, feeds them to the core, hands dispatched runs to
/// the `ExecutorBackend` and forwards reload requests to the dev server.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    reload: Option<ReloadHub>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("live_reload", &self.reload.is_some())
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            reload: None,
        }
    }

    /// Notify `hub` whenever a reload-enabled run succeeds.
    pub fn with_reload(mut self, hub: ReloadHub) -> Self {
        self.reload = Some(hub);
        self
    }

    /// Main event loop. Returns when the core asks to stop or every sender
    /// has been dropped.
    pub async fn run(mut self) -> Result<()> {
        info!("assetpipe runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                return Ok(());
            }
        }

        info!("runtime event channel closed; exiting");
        Ok(())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::Dispatch(runs) => self.dispatch(runs).await?,
            CoreCommand::Reload { unit } => {
                if let Some(hub) = &self.reload {
                    let clients = hub.notify(&unit);
                    debug!(unit = %unit, clients, "live reload sent");
                }
            }
            CoreCommand::RequestExit => debug!("core issued RequestExit"),
        }
        Ok(())
    }

    async fn dispatch(&mut self, runs: Vec<ScheduledRun>) -> Result<()> {
        if runs.is_empty() {
            return Ok(());
        }
        let units: Vec<_> = runs.iter().map(|r| r.unit.as_str()).collect();
        debug!(?units, "dispatching runs");
        self.executor.dispatch(runs).await
    }
}
