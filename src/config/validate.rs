// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ActionKind, ConfigFile, RawConfigFile, TaskConfig};
use crate::config::paths::build_globset;
use crate::errors::{AssetpipeError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetpipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Run every startup check on a raw config.
pub fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_globs(cfg)?;
    validate_tasks(cfg)?;
    validate_names_unique(cfg)?;
    validate_pipeline_steps(cfg)?;
    validate_pipeline_graph(cfg)?;
    validate_watch_bindings(cfg)?;
    Ok(())
}

fn config_err(msg: impl Into<String>) -> AssetpipeError {
    AssetpipeError::Config(msg.into())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(config_err(
            "config must contain at least one [task.<name>] section",
        ));
    }
    Ok(())
}

fn validate_globs(cfg: &RawConfigFile) -> Result<()> {
    let check = |what: String, patterns: &[String]| {
        build_globset(patterns).map_err(|e| config_err(format!("{what}: {e:#}")))
    };

    check("[config].ignore".to_string(), &cfg.config.ignore)?;
    for (key, res) in cfg.paths.iter() {
        check(format!("[paths.{key}].src"), &res.src)?;
        check(format!("[paths.{key}].watch"), &res.watch)?;
    }
    for (name, w) in cfg.watch.iter() {
        check(format!("[watch.{name}].patterns"), &w.patterns)?;
        check(format!("[watch.{name}].exclude"), &w.exclude)?;
    }
    Ok(())
}

fn require_resource<'a>(
    cfg: &RawConfigFile,
    name: &str,
    key: Option<&'a String>,
) -> Result<&'a String> {
    let key = key.ok_or_else(|| {
        config_err(format!("task '{name}' needs a `resource` for its action"))
    })?;
    if !cfg.paths.contains_key(key) {
        return Err(config_err(format!(
            "task '{name}' references unknown resource '{key}'"
        )));
    }
    Ok(key)
}

fn validate_task(cfg: &RawConfigFile, name: &str, task: &TaskConfig) -> Result<()> {
    let action = match (&task.cmd, task.action) {
        (Some(_), Some(_)) => {
            return Err(config_err(format!(
                "task '{name}' sets both `cmd` and `action`; pick one"
            )));
        }
        (None, None) => {
            return Err(config_err(format!(
                "task '{name}' needs either `cmd` or `action`"
            )));
        }
        (Some(cmd), None) => {
            if cmd.trim().is_empty() {
                return Err(config_err(format!("task '{name}' has an empty `cmd`")));
            }
            return Ok(());
        }
        (None, Some(action)) => action,
    };

    match action {
        ActionKind::Clean => Ok(()),
        ActionKind::Copy => {
            if task.resources.is_empty() {
                return Err(config_err(format!(
                    "task '{name}' (copy) needs a non-empty `resources` list"
                )));
            }
            for key in task.resources.iter() {
                require_resource(cfg, name, Some(key))?;
            }
            Ok(())
        }
        ActionKind::Include | ActionKind::Sass => {
            let key = require_resource(cfg, name, task.resource.as_ref())?;
            if cfg.paths[key].dest.is_none() {
                return Err(config_err(format!(
                    "task '{name}' writes resource '{key}', which has no `dest`"
                )));
            }
            Ok(())
        }
        ActionKind::RenamePrefix => {
            require_resource(cfg, name, task.resource.as_ref())?;
            match task.prefix.as_deref() {
                Some(p) if !p.is_empty() && !p.contains(['/', '\\']) => Ok(()),
                _ => Err(config_err(format!(
                    "task '{name}' (rename_prefix) needs a `prefix` without path separators"
                ))),
            }
        }
    }
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        validate_task(cfg, name, task)?;
    }
    Ok(())
}

fn validate_names_unique(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.pipeline.keys() {
        if cfg.task.contains_key(name) {
            return Err(config_err(format!(
                "'{name}' is defined both as a task and as a pipeline"
            )));
        }
    }
    Ok(())
}

fn is_one_off(cfg: &RawConfigFile, name: &str) -> bool {
    cfg.task
        .get(name)
        .map(|t| t.action == Some(ActionKind::RenamePrefix))
        .unwrap_or(false)
}

fn validate_pipeline_steps(cfg: &RawConfigFile) -> Result<()> {
    for (name, pipeline) in cfg.pipeline.iter() {
        if pipeline.steps.is_empty() {
            return Err(config_err(format!("pipeline '{name}' has no steps")));
        }
        for step in pipeline.steps.iter() {
            if !cfg.task.contains_key(step) && !cfg.pipeline.contains_key(step) {
                return Err(AssetpipeError::UnknownTask(format!(
                    "pipeline '{name}' references unknown step '{step}'"
                )));
            }
            if is_one_off(cfg, step) {
                return Err(config_err(format!(
                    "pipeline '{name}' includes one-off task '{step}'; run it directly instead"
                )));
            }
        }
    }
    Ok(())
}

fn validate_pipeline_graph(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: pipeline -> nested pipeline step.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.pipeline.keys() {
        graph.add_node(name.as_str());
    }

    for (name, pipeline) in cfg.pipeline.iter() {
        for step in pipeline.steps.iter() {
            if cfg.pipeline.contains_key(step) {
                graph.add_edge(name.as_str(), step.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(AssetpipeError::PipelineCycle(format!(
            "cycle detected in pipelines involving '{}'",
            cycle.node_id()
        ))),
    }
}

fn validate_watch_bindings(cfg: &RawConfigFile) -> Result<()> {
    for (name, w) in cfg.watch.iter() {
        if !cfg.task.contains_key(&w.run) && !cfg.pipeline.contains_key(&w.run) {
            return Err(AssetpipeError::UnknownTask(format!(
                "watch binding '{name}' runs unknown task or pipeline '{}'",
                w.run
            )));
        }
        if is_one_off(cfg, &w.run) {
            return Err(config_err(format!(
                "watch binding '{name}' runs one-off task '{}'",
                w.run
            )));
        }
        if let Some(key) = &w.resource {
            if !cfg.paths.contains_key(key) {
                return Err(config_err(format!(
                    "watch binding '{name}' references unknown resource '{key}'"
                )));
            }
        }
        let resource_watch_empty = w
            .resource
            .as_ref()
            .map(|k| cfg.paths[k].watch.is_empty())
            .unwrap_or(true);
        if w.patterns.is_empty() && resource_watch_empty {
            return Err(config_err(format!(
                "watch binding '{name}' has no patterns to watch"
            )));
        }
    }
    Ok(())
}
