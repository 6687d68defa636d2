// src/pipeline/mod.rs

//! Ordered pipelines of tasks.
//!
//! A [`Pipeline`] is only a list of names. [`crate::task::TaskRegistry::resolve`]
//! turns it into a [`Plan`], and the [`PipelineRunner`] awaits the plan's
//! steps one after another.

pub mod plan;
pub mod runner;

pub use plan::{Plan, Step};
pub use runner::{PipelineRunner, RunSummary};

use crate::types::UnitName;

/// A named, ordered list of step names (tasks or other pipelines).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub name: UnitName,
    pub steps: Vec<UnitName>,
}

impl Pipeline {
    pub fn new(name: impl Into<UnitName>, steps: Vec<UnitName>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }
}
