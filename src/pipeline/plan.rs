// src/pipeline/plan.rs

use std::fmt;
use std::sync::Arc;

use crate::task::Task;
use crate::types::UnitName;

/// One resolved step: the name it was referenced by and the task behind it.
#[derive(Clone)]
pub struct Step {
    pub name: UnitName,
    pub task: Arc<dyn Task>,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("task", &self.task.describe())
            .finish()
    }
}

/// A pipeline whose names have all been resolved. Running a plan can fail
/// only because a task fails, never because a name is missing.
#[derive(Debug, Clone)]
pub struct Plan {
    name: UnitName,
    steps: Vec<Step>,
}

impl Plan {
    pub(crate) fn new(name: impl Into<UnitName>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Plan with a single task, outside any registry.
    pub fn single(name: impl Into<UnitName>, task: Arc<dyn Task>) -> Self {
        let name = name.into();
        Self::new(name.clone(), vec![Step { name, task }])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
