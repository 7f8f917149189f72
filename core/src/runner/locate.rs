use std::path::{Path, PathBuf};

use crate::config::RunnerConfig;

/// Finds the cursor-agent binary: PATH first, then the configured fallbacks.
#[derive(Debug, Clone)]
pub struct ExecutableLocator {
    program: String,
    fallback_paths: Vec<String>,
}

impl ExecutableLocator {
    pub fn new(program: impl Into<String>, fallback_paths: Vec<String>) -> Self {
        Self {
            program: program.into(),
            fallback_paths,
        }
    }

    pub fn from_config(cfg: &RunnerConfig) -> Self {
        Self::new(cfg.program.clone(), cfg.fallback_paths.clone())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn find(&self) -> Option<PathBuf> {
        self.find_with(|name| which::which(name).ok())
    }

    fn find_with<F>(&self, path_lookup: F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<PathBuf>,
    {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            // An explicit path (e.g. from CURSOR_SUBAGENT_AGENT_BIN) skips PATH lookup.
            let expanded = PathBuf::from(shellexpand::tilde(&self.program).as_ref());
            return is_executable_file(&expanded).then_some(expanded);
        }

        if let Some(found) = path_lookup(&self.program) {
            tracing::debug!(path = %found.display(), "cursor-agent resolved from PATH");
            return Some(found);
        }

        for raw in &self.fallback_paths {
            let candidate = PathBuf::from(shellexpand::tilde(raw).as_ref());
            if is_executable_file(&candidate) {
                tracing::debug!(path = %candidate.display(), "cursor-agent resolved from fallback");
                return Some(candidate);
            }
        }
        None
    }

    /// Availability plus the human-readable message shown by status tools.
    pub fn check_available(&self) -> (bool, String) {
        match self.find() {
            Some(path) => (true, format!("cursor-agent found at: {}", path.display())),
            None => (
                false,
                "cursor-agent not found. Run the setup_cursor_cli tool or install manually: \
                 curl https://cursor.com/install -fsS | bash"
                    .to_string(),
            ),
        }
    }
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}
