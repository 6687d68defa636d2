// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::engine::queue::TriggerQueue;
use crate::engine::{RunId, RuntimeOptions, ScheduledRun, TriggerReason};
use crate::types::{RunOutcome, UnitName};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Hand these runs to the executor.
    Dispatch(Vec<ScheduledRun>),
    /// A run of `unit` succeeded and asked for a browser reload.
    Reload { unit: UnitName },
    /// Stop the runtime (used with `exit_when_idle`).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    pub keep_running: bool,
}

impl CoreStep {
    fn keep(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Run ids handed out so far and the reload flag each in-flight run carries.
#[derive(Debug, Default)]
pub struct ActiveRuns {
    next_id: RunId,
    reload: HashMap<RunId, bool>,
}

impl ActiveRuns {
    fn start(&mut self, unit: &str, reload: bool) -> ScheduledRun {
        self.next_id += 1;
        let run_id = self.next_id;
        self.reload.insert(run_id, reload);
        ScheduledRun {
            unit: unit.to_string(),
            run_id,
        }
    }

    fn finish(&mut self, run_id: RunId) -> bool {
        self.reload.remove(&run_id).unwrap_or(false)
    }

    pub fn in_flight(&self) -> usize {
        self.reload.len()
    }
}

/// Handle a trigger for `unit`.
pub fn handle_trigger(
    queue: &mut TriggerQueue,
    runs: &mut ActiveRuns,
    unit: UnitName,
    reload: bool,
    reason: TriggerReason,
) -> CoreStep {
    match queue.on_trigger(&unit, reload) {
        Some(reload) => {
            let run = runs.start(&unit, reload);
            debug!(unit = %unit, run_id = run.run_id, ?reason, "dispatching run");
            CoreStep::keep(vec![CoreCommand::Dispatch(vec![run])])
        }
        None => CoreStep::keep(Vec::new()),
    }
}

/// Handle the end of one run: maybe reload, maybe start the coalesced
/// follow-up, maybe exit.
pub fn handle_run_finished(
    queue: &mut TriggerQueue,
    runs: &mut ActiveRuns,
    options: &RuntimeOptions,
    unit: UnitName,
    run_id: RunId,
    outcome: RunOutcome,
) -> CoreStep {
    let mut commands = Vec::new();
    let wants_reload = runs.finish(run_id);

    match &outcome {
        RunOutcome::Success => {
            info!(unit = %unit, run_id, "run succeeded");
            if wants_reload {
                commands.push(CoreCommand::Reload { unit: unit.clone() });
            }
        }
        RunOutcome::Failed(task) => {
            warn!(unit = %unit, run_id, task = %task, "run failed; waiting for the next change");
        }
    }

    if let Some(reload) = queue.on_finished(&unit) {
        let run = runs.start(&unit, reload);
        debug!(unit = %unit, run_id = run.run_id, "starting coalesced follow-up run");
        commands.push(CoreCommand::Dispatch(vec![run]));
    }

    let mut keep_running = true;
    if options.exit_when_idle && queue.is_idle() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}
