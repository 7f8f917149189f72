use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::types::RunnerStartArgs;

/// A running child process. stdin is never exposed: the agent runs
/// non-interactively with stdin closed.
#[async_trait]
pub trait RunnerSession: Send {
    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    /// Force-terminates the process. Must not block on its exit.
    async fn kill(&mut self) -> anyhow::Result<()>;
    /// Waits for exit and returns the exit code (`-1` if killed by a signal).
    /// Must be cancel-safe.
    async fn wait(&mut self) -> anyhow::Result<i32>;
}

#[async_trait]
pub trait RunnerPlugin: Send + Sync {
    fn name(&self) -> &str;
    async fn start_session(&self, args: &RunnerStartArgs)
        -> anyhow::Result<Box<dyn RunnerSession>>;
}
