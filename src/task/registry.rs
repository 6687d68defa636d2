// src/task/registry.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::errors::{AssetpipeError, Result};
use crate::pipeline::{Pipeline, Plan, Step};
use crate::types::UnitName;

use super::{BuiltinTask, CommandTask, CompletionSignal, FnTask, Task, TaskContext};

/// Named tasks and pipelines.
///
/// Tasks are registered once at startup and are immutable afterwards.
/// Every name lookup goes through [`TaskRegistry::resolve`], which turns a
/// task or pipeline name into a [`Plan`] before anything runs.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<UnitName, Arc<dyn Task>>,
    pipelines: BTreeMap<UnitName, Pipeline>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a validated config: every `[task.*]` becomes a
    /// [`CommandTask`] or [`BuiltinTask`], every `[pipeline.*]` a [`Pipeline`].
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut registry = Self::new();

        for (name, tc) in cfg.tasks() {
            let task: Arc<dyn Task> = match (&tc.cmd, tc.action) {
                (Some(cmd), None) => Arc::new(CommandTask::new(name.clone(), cmd.clone())),
                (None, Some(kind)) => Arc::new(BuiltinTask::new(name.clone(), kind, tc.clone())),
                _ => {
                    return Err(AssetpipeError::Config(format!(
                        "task '{name}' needs exactly one of `cmd` or `action`"
                    )));
                }
            };
            registry.register(name.clone(), task)?;
        }

        for (name, pc) in cfg.pipelines() {
            registry.add_pipeline(Pipeline::new(name.clone(), pc.steps.clone()))?;
        }

        registry.validate()?;
        debug!(
            tasks = registry.tasks.len(),
            pipelines = registry.pipelines.len(),
            "task registry built"
        );
        Ok(registry)
    }

    /// Register a task under `name`. Names are unique across tasks and pipelines.
    pub fn register(&mut self, name: impl Into<UnitName>, task: Arc<dyn Task>) -> Result<()> {
        let name = name.into();
        self.ensure_free(&name)?;
        self.tasks.insert(name, task);
        Ok(())
    }

    /// Register a synchronous closure as a task.
    pub fn register_fn<F>(&mut self, name: impl Into<UnitName>, action: F) -> Result<()>
    where
        F: Fn(&TaskContext) -> CompletionSignal + Send + Sync + 'static,
    {
        let name = name.into();
        let task = Arc::new(FnTask::new(name.clone(), action));
        self.register(name, task)
    }

    pub fn add_pipeline(&mut self, pipeline: Pipeline) -> Result<()> {
        self.ensure_free(&pipeline.name)?;
        self.pipelines.insert(pipeline.name.clone(), pipeline);
        Ok(())
    }

    fn ensure_free(&self, name: &str) -> Result<()> {
        if self.tasks.contains_key(name) || self.pipelines.contains_key(name) {
            return Err(AssetpipeError::Config(format!(
                "'{name}' is already registered"
            )));
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name) || self.pipelines.contains_key(name)
    }

    pub fn task(&self, name: &str) -> Option<&Arc<dyn Task>> {
        self.tasks.get(name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = (&str, &Arc<dyn Task>)> {
        self.tasks.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn pipelines(&self) -> impl Iterator<Item = &Pipeline> {
        self.pipelines.values()
    }

    /// Resolve every pipeline, surfacing unknown steps and cycles up front.
    pub fn validate(&self) -> Result<()> {
        for name in self.pipelines.keys() {
            self.resolve(name)?;
        }
        Ok(())
    }

    /// Resolve a task or pipeline name into an executable [`Plan`].
    ///
    /// A task becomes a one-step plan; a pipeline is flattened, with nested
    /// pipelines expanded in place. Fails with `UnknownTask` before anything
    /// runs if any referenced name is missing.
    pub fn resolve(&self, name: &str) -> Result<Plan> {
        if let Some(task) = self.tasks.get(name) {
            return Ok(Plan::new(
                name,
                vec![Step {
                    name: name.to_string(),
                    task: Arc::clone(task),
                }],
            ));
        }

        let pipeline = self
            .pipelines
            .get(name)
            .ok_or_else(|| AssetpipeError::UnknownTask(name.to_string()))?;

        let mut steps = Vec::new();
        let mut stack = Vec::new();
        self.flatten(pipeline, &mut stack, &mut steps)?;
        Ok(Plan::new(name, steps))
    }

    fn flatten<'a>(
        &'a self,
        pipeline: &'a Pipeline,
        stack: &mut Vec<&'a str>,
        out: &mut Vec<Step>,
    ) -> Result<()> {
        if stack.contains(&pipeline.name.as_str()) {
            return Err(AssetpipeError::PipelineCycle(format!(
                "cycle detected in pipelines involving '{}'",
                pipeline.name
            )));
        }
        stack.push(&pipeline.name);

        for step in pipeline.steps.iter() {
            if let Some(task) = self.tasks.get(step) {
                out.push(Step {
                    name: step.clone(),
                    task: Arc::clone(task),
                });
            } else if let Some(nested) = self.pipelines.get(step) {
                self.flatten(nested, stack, out)?;
            } else {
                return Err(AssetpipeError::UnknownTask(format!(
                    "pipeline '{}' references unknown step '{}'",
                    pipeline.name, step
                )));
            }
        }

        stack.pop();
        Ok(())
    }
}
