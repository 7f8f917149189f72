use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use subagent_core::runner::{RunnerPlugin, RunnerSession, RunnerStartArgs, NO_EXIT_CODE};
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};

/// Spawns cursor-agent as a non-interactive child process.
pub struct CursorRunnerPlugin {}

impl CursorRunnerPlugin {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for CursorRunnerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunnerPlugin for CursorRunnerPlugin {
    fn name(&self) -> &str {
        "cursor"
    }

    async fn start_session(&self, args: &RunnerStartArgs) -> Result<Box<dyn RunnerSession>> {
        let mut cmd = Command::new(&args.cmd);
        cmd.args(&args.args)
            .envs(&args.envs)
            // Open stdin makes the agent wait for input forever.
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &args.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd
            .spawn()
            .with_context(|| format!("spawn {}", args.cmd))?;
        tracing::debug!(pid = ?child.id(), cmd = %args.cmd, "spawned cursor-agent");

        Ok(Box::new(CursorRunnerSession { child }))
    }
}

struct CursorRunnerSession {
    child: Child,
}

#[async_trait]
impl RunnerSession for CursorRunnerSession {
    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    async fn kill(&mut self) -> Result<()> {
        match self.child.start_kill() {
            Ok(()) => Ok(()),
            // Already exited and reaped.
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e).context("kill cursor-agent"),
        }
    }

    async fn wait(&mut self) -> Result<i32> {
        let status = self.child.wait().await.context("wait for cursor-agent")?;
        Ok(status.code().unwrap_or(NO_EXIT_CODE))
    }
}
