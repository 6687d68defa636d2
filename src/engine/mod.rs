// src/engine/mod.rs

//! Serve-mode orchestration.
//!
//! Watch bindings produce [`RuntimeEvent::Triggered`]; the engine decides,
//! per unit and according to the busy policy, whether to dispatch a run now
//! or fold the trigger into a follow-up run. Finished runs come back as
//! [`RuntimeEvent::RunFinished`] and may ask the dev server to reload.
//!
//! The decisions live in the synchronous [`core`]; [`runtime`] is the async
//! shell that reads events from a channel and carries out the commands.

use crate::types::{RunOutcome, UnitName};

/// Monotonic identifier of one dispatched run.
pub type RunId = u64;

/// Why a unit was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Initial build at startup.
    Startup,
    /// A settled batch of filesystem events matched a watch binding.
    FileWatch,
}

/// A run the engine wants executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledRun {
    pub unit: UnitName,
    pub run_id: RunId,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Stop once no unit is running and nothing is pending.
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the watcher, the executor and the
/// signal handler.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    Triggered {
        unit: UnitName,
        /// Push a reload to browsers once this run succeeds.
        reload: bool,
        reason: TriggerReason,
    },
    RunFinished {
        unit: UnitName,
        run_id: RunId,
        outcome: RunOutcome,
    },
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use self::core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runtime::Runtime;
