// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod task;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::loader::{load_and_validate, project_root};
use crate::config::model::ConfigFile;
use crate::config::PathConfig;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::exec::RealExecutorBackend;
use crate::pipeline::{PipelineRunner, RunSummary};
use crate::server::{DevServer, DevServerOptions};
use crate::task::{TaskContext, TaskRegistry};
use crate::watch::{build_bindings, spawn_watcher, unmatched_patterns};

/// Everything loaded from one config file, ready to run.
#[derive(Debug, Clone)]
pub struct Project {
    pub config: Arc<ConfigFile>,
    pub paths: Arc<PathConfig>,
    pub registry: Arc<TaskRegistry>,
    pub ctx: TaskContext,
}

impl Project {
    /// Load and validate `config_path`; the project root is its directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let cfg = load_and_validate(config_path)?;
        Self::from_config(cfg, project_root(config_path))
    }

    pub fn from_config(cfg: ConfigFile, root: impl Into<PathBuf>) -> Result<Self> {
        let paths = Arc::new(PathConfig::from_config(&cfg, root)?);
        let registry = Arc::new(TaskRegistry::from_config(&cfg)?);
        let ctx = TaskContext::real(Arc::clone(&paths));
        Ok(Self {
            config: Arc::new(cfg),
            paths,
            registry,
            ctx,
        })
    }

    /// Run one pipeline or task to completion.
    pub async fn run_unit(&self, name: &str) -> Result<RunSummary> {
        let runner = PipelineRunner::new(self.ctx.clone());
        Ok(runner.run_unit(&self.registry, name).await?)
    }
}

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let project = Project::load(Path::new(&args.config))?;

    match args.command {
        Command::Run { name } => {
            let summary = project.run_unit(&name).await?;
            info!(
                pipeline = %summary.pipeline,
                steps = summary.steps.len(),
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "done"
            );
            Ok(())
        }
        Command::Serve { build, no_open } => serve(project, build, no_open).await,
        Command::List => {
            print_list(&project);
            Ok(())
        }
    }
}

/// Watch, rebuild and serve until Ctrl-C.
///
/// This wires together:
/// - the dev server (bound first, so a busy port fails fast)
/// - the executor running units through the pipeline runner
/// - the file watcher
/// - the engine deciding what runs when
pub async fn serve(project: Project, build: Option<String>, no_open: bool) -> Result<()> {
    let cfg = Arc::clone(&project.config);
    let section = cfg.config_section();

    let bindings = build_bindings(&cfg, &project.paths)?;
    for (binding, pattern) in unmatched_patterns(project.ctx.fs(), &project.paths, &bindings)? {
        warn!(binding = %binding, pattern = %pattern, "watch pattern matches no files");
    }

    let mut options = DevServerOptions::from_config(cfg.server(), &project.paths);
    if no_open {
        options.open = false;
    }
    let live_reload = options.live_reload;
    let server = DevServer::bind(options).await?;
    let hub = server.reload_hub();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let executor = RealExecutorBackend::new(
        PipelineRunner::new(project.ctx.clone()),
        Arc::clone(&project.registry),
        rt_tx.clone(),
    );

    let _watcher_handle = if bindings.is_empty() {
        info!("no watch bindings configured; serving without rebuilds");
        None
    } else {
        Some(spawn_watcher(
            Arc::clone(&project.paths),
            bindings,
            Duration::from_millis(section.debounce_ms),
            rt_tx.clone(),
        )?)
    };

    // Ctrl-C -> graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    if let Some(unit) = build {
        info!(unit = %unit, "initial build");
        rt_tx
            .send(RuntimeEvent::Triggered {
                unit,
                reload: true,
                reason: TriggerReason::Startup,
            })
            .await?;
    }

    let core = CoreRuntime::new(section.on_busy, RuntimeOptions::default());
    let mut runtime = Runtime::new(core, rt_rx, executor);
    if live_reload {
        runtime = runtime.with_reload(hub);
    }

    let mut server_task = tokio::spawn(server.serve());

    tokio::select! {
        res = runtime.run() => {
            server_task.abort();
            res?;
        }
        joined = &mut server_task => {
            match joined {
                Ok(Ok(())) => info!("dev server stopped"),
                Ok(Err(e)) => return Err(e.into()),
                Err(e) => error!("dev server task failed: {e}"),
            }
        }
    }

    info!("shutting down");
    Ok(())
}

/// `list` output: paths, tasks, pipelines and watch bindings.
fn print_list(project: &Project) {
    let cfg = &project.config;

    println!("site: {}", project.paths.site_dir().display());
    println!("paths ({}):", cfg.paths().len());
    for (key, res) in project.paths.resources() {
        let mut line = format!("  - {key}: {}", res.src.join(", "));
        if let Some(dest) = &res.dest {
            line.push_str(&format!(" -> {}", dest.display()));
        }
        if !res.watch.is_empty() {
            line.push_str(&format!(" (watch: {})", res.watch.join(", ")));
        }
        println!("{line}");
    }

    println!();
    println!("tasks ({}):", cfg.tasks().len());
    for (name, task) in project.registry.tasks() {
        let description = cfg
            .tasks()
            .get(name)
            .and_then(|t| t.description.clone())
            .unwrap_or_else(|| task.describe());
        println!("  - {name}: {description}");
    }

    if !cfg.pipelines().is_empty() {
        println!();
        println!("pipelines ({}):", cfg.pipelines().len());
        for pipeline in project.registry.pipelines() {
            println!("  - {}: {}", pipeline.name, pipeline.steps.join(" -> "));
            if let Some(desc) = cfg
                .pipelines()
                .get(&pipeline.name)
                .and_then(|p| p.description.as_deref())
            {
                println!("      {desc}");
            }
        }
    }

    if !cfg.watches().is_empty() {
        println!();
        println!("watch ({}):", cfg.watches().len());
        for (name, w) in cfg.watches() {
            let mut line = format!("  - {name} -> {}", w.run);
            if let Some(res) = &w.resource {
                line.push_str(&format!(" (resource: {res})"));
            }
            if !w.reload {
                line.push_str(" [no reload]");
            }
            if w.use_hash {
                line.push_str(" [use_hash]");
            }
            println!("{line}");
        }
    }
}
