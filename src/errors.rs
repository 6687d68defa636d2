// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetpipeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown task or pipeline: {0}")]
    UnknownTask(String),

    #[error("Cycle detected in pipelines: {0}")]
    PipelineCycle(String),

    #[error("Task '{task}' failed")]
    TaskExecution {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Could not bind dev server to {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AssetpipeError {
    /// Name of the task that failed, if this is a task failure.
    pub fn failed_task(&self) -> Option<&str> {
        match self {
            AssetpipeError::TaskExecution { task, .. } => Some(task),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetpipeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn task_failure_reports_its_cause_once() {
        let err = AssetpipeError::TaskExecution {
            task: "style".into(),
            source: anyhow!("command `sass` exited with code 1").context("compiling sass"),
        };
        assert_eq!(err.to_string(), "Task 'style' failed");

        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(
            chain,
            "Task 'style' failed: compiling sass: command `sass` exited with code 1"
        );
        assert_eq!(chain.matches("exited with code 1").count(), 1);
    }

    #[test]
    fn bind_failure_keeps_the_io_error_as_source() {
        let err = AssetpipeError::Bind {
            addr: "127.0.0.1:8080".into(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        };
        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(
            chain,
            "Could not bind dev server to 127.0.0.1:8080: address in use"
        );
    }
}
