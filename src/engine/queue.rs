// src/engine/queue.rs

use std::collections::HashMap;

use tracing::debug;

use crate::types::{BusyPolicy, UnitName};

#[derive(Debug, Default)]
struct UnitState {
    running: usize,
    pending: bool,
    pending_reload: bool,
}

/// Per-unit bookkeeping of running and pending runs.
///
/// Under [`BusyPolicy::Coalesce`] a unit has at most one run in flight.
/// Triggers arriving meanwhile set a single pending flag, so any number of
/// them yields exactly one follow-up run. Under [`BusyPolicy::Overlap`] every
/// trigger is admitted immediately.
#[derive(Debug)]
pub struct TriggerQueue {
    policy: BusyPolicy,
    units: HashMap<UnitName, UnitState>,
}

impl TriggerQueue {
    pub fn new(policy: BusyPolicy) -> Self {
        Self {
            policy,
            units: HashMap::new(),
        }
    }

    pub fn policy(&self) -> BusyPolicy {
        self.policy
    }

    /// Record a trigger. Returns `Some(reload)` when a run must start now,
    /// `None` when the trigger was folded into a pending follow-up.
    pub fn on_trigger(&mut self, unit: &str, reload: bool) -> Option<bool> {
        let state = self.units.entry(unit.to_string()).or_default();

        if state.running == 0 || self.policy == BusyPolicy::Overlap {
            state.running += 1;
            return Some(reload);
        }

        state.pending = true;
        state.pending_reload |= reload;
        debug!(unit, "unit busy; trigger coalesced into follow-up run");
        None
    }

    /// Record that one run of `unit` ended. Returns `Some(reload)` when the
    /// pending follow-up run must start now.
    pub fn on_finished(&mut self, unit: &str) -> Option<bool> {
        let state = self.units.get_mut(unit)?;
        state.running = state.running.saturating_sub(1);

        if state.running == 0 && state.pending {
            state.pending = false;
            state.running = 1;
            return Some(std::mem::take(&mut state.pending_reload));
        }
        None
    }

    pub fn is_running(&self, unit: &str) -> bool {
        self.units.get(unit).is_some_and(|s| s.running > 0)
    }

    pub fn has_pending(&self, unit: &str) -> bool {
        self.units.get(unit).is_some_and(|s| s.pending)
    }

    /// Nothing running and nothing pending.
    pub fn is_idle(&self) -> bool {
        self.units.values().all(|s| s.running == 0 && !s.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesce_collapses_triggers_into_one_follow_up() {
        let mut q = TriggerQueue::new(BusyPolicy::Coalesce);
        assert_eq!(q.on_trigger("html", false), Some(false));
        assert_eq!(q.on_trigger("html", false), None);
        assert_eq!(q.on_trigger("html", true), None);
        assert_eq!(q.on_trigger("html", false), None);
        assert!(q.has_pending("html"));

        assert_eq!(q.on_finished("html"), Some(true));
        assert!(!q.has_pending("html"));
        assert_eq!(q.on_finished("html"), None);
        assert!(q.is_idle());
    }

    #[test]
    fn coalesce_is_per_unit() {
        let mut q = TriggerQueue::new(BusyPolicy::Coalesce);
        assert!(q.on_trigger("html", false).is_some());
        assert!(q.on_trigger("js", false).is_some());
        assert!(q.is_running("html") && q.is_running("js"));
    }

    #[test]
    fn overlap_admits_every_trigger() {
        let mut q = TriggerQueue::new(BusyPolicy::Overlap);
        for _ in 0..3 {
            assert_eq!(q.on_trigger("style", true), Some(true));
        }
        assert_eq!(q.on_finished("style"), None);
        assert_eq!(q.on_finished("style"), None);
        assert!(!q.is_idle());
        assert_eq!(q.on_finished("style"), None);
        assert!(q.is_idle());
    }

    #[test]
    fn unknown_unit_finish_is_ignored() {
        let mut q = TriggerQueue::new(BusyPolicy::Coalesce);
        assert_eq!(q.on_finished("ghost"), None);
        assert!(q.is_idle());
    }
}
