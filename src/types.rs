use std::str::FromStr;

use serde::Deserialize;

/// Canonical name of a task or pipeline.
pub type UnitName = String;

/// What to do when a watch binding fires while its unit is still running.
///
/// - `Coalesce`: remember that another run is wanted and start exactly one
///   follow-up run when the current one finishes, however many triggers
///   arrived in between (default).
/// - `Overlap`: start a new run immediately, alongside the running one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    #[default]
    Coalesce,
    Overlap,
}

impl FromStr for BusyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coalesce" => Ok(BusyPolicy::Coalesce),
            "overlap" => Ok(BusyPolicy::Overlap),
            other => Err(format!(
                "invalid on_busy: {other} (expected \"coalesce\" or \"overlap\")"
            )),
        }
    }
}

/// Outcome of one unit run, as reported back to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    /// The run failed; carries the name of the failing task.
    Failed(UnitName),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_policy_parses_and_defaults_to_coalesce() {
        assert_eq!(BusyPolicy::default(), BusyPolicy::Coalesce);
        assert_eq!("Overlap".parse::<BusyPolicy>(), Ok(BusyPolicy::Overlap));
        assert!("queue".parse::<BusyPolicy>().is_err());
    }
}
