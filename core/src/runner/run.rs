use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::config::RunnerConfig;
use crate::error::RunnerError;

use super::command;
use super::locate::ExecutableLocator;
use super::runtime::{self, RuntimeLimits};
use super::traits::RunnerPlugin;
use super::types::{ExecutionResult, InvokeRequest, RunnerStartArgs};

/// Runs cursor-agent invocations. Every call yields an [`ExecutionResult`];
/// nothing here returns an error to the caller.
#[derive(Clone)]
pub struct AgentRunner {
    locator: ExecutableLocator,
    limits: RuntimeLimits,
    default_timeout: Option<Duration>,
    plugin: Arc<dyn RunnerPlugin>,
}

impl AgentRunner {
    pub fn new(cfg: &RunnerConfig, plugin: Arc<dyn RunnerPlugin>) -> Self {
        Self {
            locator: ExecutableLocator::from_config(cfg),
            limits: RuntimeLimits::from_config(cfg),
            default_timeout: cfg
                .default_timeout_secs
                .filter(|secs| *secs > 0.0)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
            plugin,
        }
    }

    pub fn locator(&self) -> &ExecutableLocator {
        &self.locator
    }

    pub async fn invoke(&self, req: InvokeRequest) -> ExecutionResult {
        let Some(exe) = self.locator.find() else {
            tracing::error!(role = %req.agent_role, "cursor-agent executable not found");
            return ExecutionResult::failure(
                "cursor-agent not found. Please install it with the setup_cursor_cli tool.",
            );
        };
        self.run_with(&exe, req).await
    }

    /// Runs `req` against an already resolved executable.
    pub async fn run_with(&self, exe: &Path, req: InvokeRequest) -> ExecutionResult {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("agent", role = %req.agent_role, run_id = %run_id);

        async move {
            tracing::info!(
                model = %req.model,
                cwd = %req.cwd.display(),
                task = %crate::util::preview(&req.task, 100),
                "invoking cursor-agent"
            );
            let result = match self.execute(exe, &req).await {
                Ok(result) => result,
                Err(e) => ExecutionResult::failure(e.to_string()),
            };
            if result.success {
                tracing::info!(
                    return_code = result.return_code,
                    output_chars = result.output.chars().count(),
                    events = result.events.len(),
                    "agent completed"
                );
            } else {
                tracing::error!(
                    return_code = result.return_code,
                    error = result.error.as_deref().unwrap_or("-"),
                    "agent failed"
                );
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        exe: &Path,
        req: &InvokeRequest,
    ) -> Result<ExecutionResult, RunnerError> {
        if !req.cwd.is_dir() {
            return Err(RunnerError::Config(format!(
                "working directory does not exist: {}",
                req.cwd.display()
            )));
        }
        let args = RunnerStartArgs {
            cmd: exe.to_string_lossy().into_owned(),
            args: command::build_args(req),
            envs: HashMap::new(),
            cwd: Some(req.cwd.clone()),
        };
        let session = self
            .plugin
            .start_session(&args)
            .await
            .map_err(|e| RunnerError::Spawn(format!("failed to start cursor-agent: {e:#}")))?;
        tracing::debug!(plugin = self.plugin.name(), "session started");

        let timeout = req.timeout.or(self.default_timeout);
        runtime::run_session_runtime(session, &self.limits, timeout).await
    }
}
