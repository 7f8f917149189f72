use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tool_event::StreamEvent;

/// Return code for failures that never produced a real exit status.
pub const NO_EXIT_CODE: i32 = -1;

/// Outcome of one cursor-agent invocation. Failures are data, never errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    #[serde(default)]
    pub error: Option<String>,
    pub return_code: i32,
    #[serde(default)]
    pub events: Vec<StreamEvent>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl ExecutionResult {
    /// A failure reached before any process produced an exit code.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            return_code: NO_EXIT_CODE,
            events: Vec::new(),
            session_id: None,
            duration_ms: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvokeRequest {
    pub system_prompt: String,
    pub task: String,
    pub model: String,
    /// Working directory of the child process.
    pub cwd: PathBuf,
    /// Directory passed as `--workspace`; defaults to `cwd`.
    pub workspace: Option<PathBuf>,
    pub context: String,
    pub timeout: Option<Duration>,
    /// Log label only.
    pub agent_role: String,
}

impl InvokeRequest {
    pub fn new(
        system_prompt: impl Into<String>,
        task: impl Into<String>,
        model: impl Into<String>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            task: task.into(),
            model: model.into(),
            cwd: cwd.into(),
            workspace: None,
            context: String::new(),
            timeout: None,
            agent_role: "agent".to_string(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.agent_role = role.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct RunnerStartArgs {
    pub cmd: String,
    pub args: Vec<String>,
    pub envs: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
}
