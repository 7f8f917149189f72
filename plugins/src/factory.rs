use std::path::PathBuf;
use std::sync::Arc;

use subagent_core::config::AppConfig;
use subagent_core::context::AppContext;
use subagent_core::runner::RunnerPlugin;

use crate::runner::CursorRunnerPlugin;

pub fn build_runner(_cfg: &AppConfig) -> Arc<dyn RunnerPlugin> {
    Arc::new(CursorRunnerPlugin::new())
}

/// App context wired with the real process backend.
pub fn build_context(cfg: AppConfig, agents_file: Option<PathBuf>) -> AppContext {
    let runner = build_runner(&cfg);
    AppContext::new(cfg, runner).with_agents_file(agents_file)
}
