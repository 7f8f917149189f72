use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{AgentRegistry, AppConfig};
use crate::error::ConfigError;
use crate::install::Installer;
use crate::runner::{AgentRunner, RunnerPlugin};

/// Everything a command or tool call needs, built once per process.
#[derive(Clone)]
pub struct AppContext {
    cfg: AppConfig,
    agents_file: Option<PathBuf>,
    runner: AgentRunner,
}

impl AppContext {
    pub fn new(cfg: AppConfig, plugin: Arc<dyn RunnerPlugin>) -> Self {
        let agents_file = cfg
            .agents_file
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()));
        let runner = AgentRunner::new(&cfg.runner, plugin);
        Self {
            cfg,
            agents_file,
            runner,
        }
    }

    /// Overrides the configured agents.yaml location.
    pub fn with_agents_file(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.agents_file = path;
        }
        self
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn runner(&self) -> &AgentRunner {
        &self.runner
    }

    pub fn agents_file(&self) -> Option<&Path> {
        self.agents_file.as_deref()
    }

    /// Loads agents.yaml fresh on every call so edits apply without a restart.
    pub fn registry(&self) -> Result<AgentRegistry, ConfigError> {
        let start = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        AgentRegistry::discover(self.agents_file.as_deref(), &start)
    }

    pub fn installer(&self) -> Installer {
        Installer::new(self.cfg.install.clone())
    }
}
