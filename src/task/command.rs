// src/task/command.rs

//! External command task.

use std::collections::VecDeque;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use super::{Task, TaskContext, TaskFuture};

/// Trailing stderr lines kept for the failure message.
const STDERR_TAIL_LINES: usize = 20;

/// Runs a shell command in the project root.
///
/// stdout is logged at info, stderr at debug. A non-zero exit status is a
/// failure, reported with the last lines the command wrote to stderr. The child is killed if the future is dropped, so cancelling a
/// run (e.g. on shutdown) does not leave stray processes.
#[derive(Debug, Clone)]
pub struct CommandTask {
    name: String,
    cmd: String,
}

impl CommandTask {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
        }
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    async fn run_inner(&self, ctx: &TaskContext) -> Result<()> {
        info!(task = %self.name, cmd = %self.cmd, "starting command");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        cmd.current_dir(ctx.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for task '{}'", self.name))?;

        if let Some(stdout) = child.stdout.take() {
            let task_name = self.name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(task = %task_name, "{}", line);
                }
            });
        }

        // Always consume stderr so buffers don't fill.
        let stderr_tail = child.stderr.take().map(|stderr| {
            let task_name = self.name.clone();
            tokio::spawn(async move {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(task = %task_name, "stderr: {}", line);
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                tail
            })
        });

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of task '{}'", self.name))?;

        let code = status.code().unwrap_or(-1);
        debug!(task = %self.name, exit_code = code, "command exited");

        if status.success() {
            return Ok(());
        }

        let tail = match stderr_tail {
            Some(handle) => handle.await.unwrap_or_default(),
            None => VecDeque::new(),
        };
        let tail: Vec<&str> = tail
            .iter()
            .map(|l| l.trim_end())
            .filter(|l| !l.is_empty())
            .collect();
        if tail.is_empty() {
            bail!("command `{}` exited with code {}", self.cmd, code);
        }
        bail!(
            "command `{}` exited with code {}:\n{}",
            self.cmd,
            code,
            tail.join("\n")
        );
    }
}

impl Task for CommandTask {
    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        Box::pin(self.run_inner(ctx))
    }

    fn describe(&self) -> String {
        format!("cmd: {}", self.cmd)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{parse_str, ConfigFile, PathConfig};

    fn ctx_in(dir: &std::path::Path) -> TaskContext {
        let cfg = ConfigFile::try_from(
            parse_str(
                r#"
[task.noop]
cmd = "true"
"#,
            )
            .unwrap(),
        )
        .unwrap();
        TaskContext::real(Arc::new(PathConfig::from_config(&cfg, dir).unwrap()))
    }

    #[tokio::test]
    async fn runs_in_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_in(dir.path());

        CommandTask::new("touch", "echo hi > out.txt")
            .run(&ctx)
            .await
            .unwrap();

        let out = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(out.trim(), "hi");
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_failure_with_code() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_in(dir.path());

        let err = CommandTask::new("fail", "exit 3").run(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("exited with code 3"), "{err}");
    }

    #[tokio::test]
    async fn failure_carries_the_stderr_tail() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_in(dir.path());

        let cmd = "for i in $(seq 1 30); do echo \"line $i\" >&2; done; exit 1";
        let err = CommandTask::new("noisy", cmd).run(&ctx).await.unwrap_err();
        let msg = err.to_string();

        assert!(msg.contains("exited with code 1"), "{msg}");
        assert!(msg.ends_with("line 30"), "{msg}");
        assert!(msg.contains("line 11\n"), "{msg}");
        assert!(!msg.contains("line 10\n"), "{msg}");
    }

    #[tokio::test]
    async fn stderr_of_a_successful_command_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_in(dir.path());

        CommandTask::new("warn", "echo 'deprecated option' >&2")
            .run(&ctx)
            .await
            .unwrap();
    }
}
