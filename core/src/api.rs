//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `subagent_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_from_path, AgentConfig, AgentDocument, AgentRegistry, AppConfig,
    InstallConfig, LoggingConfig, RunnerConfig,
};
pub use crate::context::AppContext;
pub use crate::error::{CliError, ConfigError, RunnerError};
pub use crate::install::{detect_shell, Installer, Shell};
pub use crate::runner::{
    AgentRunner, ExecutableLocator, ExecutionResult, InvokeRequest, RunnerPlugin, RunnerSession,
    RunnerStartArgs, RuntimeLimits, NO_EXIT_CODE,
};
pub use crate::tool_event::{extract_final_json, parse_event, StreamEvent, ToolCall};
