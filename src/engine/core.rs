// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! Consumes [`RuntimeEvent`]s and returns the commands the IO shell should
//! carry out. No channels, no Tokio, no IO, so every policy decision can be
//! unit tested directly.

use crate::engine::event_handlers::{
    handle_run_finished, handle_trigger, ActiveRuns, CoreStep,
};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::types::BusyPolicy;

#[derive(Debug)]
pub struct CoreRuntime {
    queue: TriggerQueue,
    runs: ActiveRuns,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(policy: BusyPolicy, options: RuntimeOptions) -> Self {
        Self {
            queue: TriggerQueue::new(policy),
            runs: ActiveRuns::default(),
            options,
        }
    }

    /// Nothing running and nothing pending (for tests).
    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
    }

    pub fn runs_in_flight(&self) -> usize {
        self.runs.in_flight()
    }

    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::Triggered {
                unit,
                reload,
                reason,
            } => handle_trigger(&mut self.queue, &mut self.runs, unit, reload, reason),
            RuntimeEvent::RunFinished {
                unit,
                run_id,
                outcome,
            } => handle_run_finished(
                &mut self.queue,
                &mut self.runs,
                &self.options,
                unit,
                run_id,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
