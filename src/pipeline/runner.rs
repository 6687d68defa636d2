// src/pipeline/runner.rs

//! Sequential plan execution.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::errors::{AssetpipeError, Result};
use crate::task::{TaskContext, TaskRegistry};
use crate::types::UnitName;

use super::Plan;

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub pipeline: UnitName,
    /// Step names in the order they ran.
    pub steps: Vec<UnitName>,
    pub elapsed: Duration,
}

type CompletionCallback = dyn Fn(&RunSummary) + Send + Sync;

/// Runs plans strictly in order, stopping at the first failing step.
#[derive(Clone)]
pub struct PipelineRunner {
    ctx: TaskContext,
    on_complete: Option<Arc<CompletionCallback>>,
}

impl fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("ctx", &self.ctx)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl PipelineRunner {
    pub fn new(ctx: TaskContext) -> Self {
        Self {
            ctx,
            on_complete: None,
        }
    }

    /// Invoke `callback` after every successful run. Never called when a
    /// step fails.
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RunSummary) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    /// Resolve `name` against `registry` and run it.
    ///
    /// Resolution happens first, so an unknown name fails before any step
    /// has been started.
    pub async fn run_unit(&self, registry: &TaskRegistry, name: &str) -> Result<RunSummary> {
        let plan = registry.resolve(name)?;
        self.run(&plan).await
    }

    /// Await each step of `plan` in turn.
    ///
    /// The first failure aborts the run with [`AssetpipeError::TaskExecution`]
    /// naming the failing step; later steps are never invoked.
    pub async fn run(&self, plan: &Plan) -> Result<RunSummary> {
        let started = Instant::now();
        info!(pipeline = %plan.name(), steps = plan.steps().len(), "pipeline started");

        let mut done = Vec::with_capacity(plan.steps().len());
        for step in plan.steps() {
            let step_started = Instant::now();
            info!(pipeline = %plan.name(), task = %step.name, "step started");

            if let Err(source) = step.task.run(&self.ctx).await {
                error!(
                    pipeline = %plan.name(),
                    task = %step.name,
                    elapsed_ms = step_started.elapsed().as_millis() as u64,
                    "step failed: {source:#}"
                );
                return Err(AssetpipeError::TaskExecution {
                    task: step.name.clone(),
                    source,
                });
            }

            info!(
                pipeline = %plan.name(),
                task = %step.name,
                elapsed_ms = step_started.elapsed().as_millis() as u64,
                "step finished"
            );
            done.push(step.name.clone());
        }

        let summary = RunSummary {
            pipeline: plan.name().to_string(),
            steps: done,
            elapsed: started.elapsed(),
        };
        info!(
            pipeline = %summary.pipeline,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "pipeline finished"
        );

        if let Some(callback) = &self.on_complete {
            callback(&summary);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use anyhow::anyhow;

    use super::*;
    use crate::config::{parse_str, ConfigFile, PathConfig};
    use crate::fs::MockFileSystem;
    use crate::pipeline::Pipeline;

    fn ctx() -> TaskContext {
        let cfg = ConfigFile::try_from(parse_str("[task.noop]\ncmd = \"true\"\n").unwrap()).unwrap();
        let paths = PathConfig::from_config(&cfg, ".").unwrap();
        TaskContext::new(Arc::new(paths), Arc::new(MockFileSystem::new()))
    }

    fn recording(names: &[&str], fail: Option<&str>, log: Arc<Mutex<Vec<String>>>) -> TaskRegistry {
        let mut reg = TaskRegistry::new();
        for &name in names {
            let log = Arc::clone(&log);
            let fails = fail == Some(name);
            let owned = name.to_string();
            reg.register_fn(name, move |_| {
                log.lock().unwrap().push(owned.clone());
                if fails {
                    Err(anyhow!("boom"))
                } else {
                    Ok(())
                }
            })
            .unwrap();
        }
        reg
    }

    #[tokio::test]
    async fn runs_steps_in_declared_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut reg = recording(&["clean", "html", "js"], None, Arc::clone(&log));
        reg.add_pipeline(Pipeline::new(
            "build",
            vec!["clean".into(), "js".into(), "html".into()],
        ))
        .unwrap();

        let summary = PipelineRunner::new(ctx()).run_unit(&reg, "build").await.unwrap();
        assert_eq!(summary.steps, vec!["clean", "js", "html"]);
        assert_eq!(*log.lock().unwrap(), vec!["clean", "js", "html"]);
    }

    #[tokio::test]
    async fn failure_stops_the_run_and_skips_the_callback() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut reg = recording(&["style", "sprite", "html"], Some("style"), Arc::clone(&log));
        reg.add_pipeline(Pipeline::new(
            "build",
            vec!["style".into(), "sprite".into(), "html".into()],
        ))
        .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let runner = PipelineRunner::new(ctx()).on_complete(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let err = runner.run_unit(&reg, "build").await.unwrap_err();
        assert_eq!(err.failed_task(), Some("style"));
        assert_eq!(err.to_string(), "Task 'style' failed");
        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(chain, "Task 'style' failed: boom");
        assert_eq!(*log.lock().unwrap(), vec!["style"]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn callback_receives_summary() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reg = recording(&["js"], None, log);

        let got = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&got);
        let runner = PipelineRunner::new(ctx()).on_complete(move |s| {
            *slot.lock().unwrap() = Some(s.pipeline.clone());
        });

        runner.run_unit(&reg, "js").await.unwrap();
        assert_eq!(got.lock().unwrap().as_deref(), Some("js"));
    }
}
