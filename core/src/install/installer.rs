use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

use crate::config::InstallConfig;
use crate::runner::{ExecutionResult, NO_EXIT_CODE};
use crate::util::strip_ansi;

use super::shell::{detect_shell_in, shell_config_file_for, Shell};

pub const PATH_EXPORT_LINE: &str = r#"export PATH="$HOME/.local/bin:$PATH""#;
const PATH_MARKER_COMMENT: &str = "# Added by cursor-subagent installer";

#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error("timed out after {0} seconds")]
    Timeout(u64),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPatch {
    AlreadyConfigured,
    Added,
}

/// Installs cursor-agent and wires it into the user's shell.
#[derive(Debug, Clone)]
pub struct Installer {
    cfg: InstallConfig,
    home: PathBuf,
    shell: Shell,
}

impl Installer {
    pub fn new(cfg: InstallConfig) -> Self {
        let home = dirs::home_dir().unwrap_or_default();
        let shell = detect_shell_in(std::env::var("SHELL").ok().as_deref(), &home);
        Self::with_home(cfg, home, shell)
    }

    pub fn with_home(cfg: InstallConfig, home: PathBuf, shell: Shell) -> Self {
        Self { cfg, home, shell }
    }

    pub fn shell(&self) -> Shell {
        self.shell
    }

    pub fn shell_config_file(&self) -> PathBuf {
        shell_config_file_for(self.shell, &self.home)
    }

    fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.cfg.step_timeout_secs)
    }

    pub async fn install(&self) -> ExecutionResult {
        let mut log: Vec<String> = Vec::new();

        log.push("Step 1: Downloading and installing Cursor CLI...".to_string());
        tracing::info!(command = %self.cfg.command, "running cursor-agent installer");
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.cfg.command);
        match run_captured(&mut cmd, self.step_timeout()).await {
            Ok(out) => {
                let stdout = filter_installer_output(&String::from_utf8_lossy(&out.stdout));
                if !out.status.success() {
                    let stderr = strip_ansi(&String::from_utf8_lossy(&out.stderr));
                    tracing::error!(status = ?out.status.code(), "installer failed");
                    return ExecutionResult {
                        output: format!("{}\n\n{}", log.join("\n"), stdout),
                        return_code: out.status.code().unwrap_or(NO_EXIT_CODE),
                        ..ExecutionResult::failure(format!(
                            "Installation failed: {}",
                            stderr.trim()
                        ))
                    };
                }
                log.push(stdout);
                log.push("\n✓ Cursor CLI installed successfully".to_string());
            }
            Err(StepError::Timeout(secs)) => {
                return ExecutionResult {
                    output: log.join("\n"),
                    ..ExecutionResult::failure(format!(
                        "Installation timed out after {secs} seconds"
                    ))
                };
            }
            Err(StepError::Io(e)) => {
                return ExecutionResult {
                    output: log.join("\n"),
                    ..ExecutionResult::failure(format!("Installation error: {e}"))
                };
            }
        }

        log.push("\n\nStep 2: Configuring PATH...".to_string());
        let config_file = self.shell_config_file();
        match ensure_path_export(&config_file) {
            Ok(PathPatch::AlreadyConfigured) => log.push(format!(
                "✓ PATH already configured in {}",
                config_file.display()
            )),
            Ok(PathPatch::Added) => {
                tracing::info!(file = %config_file.display(), "added ~/.local/bin to PATH");
                log.push(format!("✓ Added PATH to {}", config_file.display()))
            }
            Err(e) => {
                return ExecutionResult {
                    output: log.join("\n"),
                    ..ExecutionResult::failure(format!("Failed to configure PATH: {e}"))
                };
            }
        }

        let agent_path = self.home.join(".local").join("bin").join("cursor-agent");
        if !agent_path.exists() {
            log.push("⚠ Note: cursor-agent may require terminal restart to be available".into());
            return success(log);
        }
        log.push(format!("✓ cursor-agent found at: {}", agent_path.display()));

        log.push("\n\nStep 3: Authenticating cursor-agent...".to_string());
        let mut login = Command::new(&agent_path);
        login.arg("login");
        match run_captured(&mut login, self.step_timeout()).await {
            Ok(out) if out.status.success() => {
                log.push("✓ cursor-agent authenticated successfully".to_string());
                let stdout = strip_ansi(&String::from_utf8_lossy(&out.stdout));
                if !stdout.trim().is_empty() {
                    log.push(stdout.trim().to_string());
                }
            }
            Ok(out) => {
                let stderr = strip_ansi(&String::from_utf8_lossy(&out.stderr));
                log.push(format!(
                    "⚠ Authentication may require manual login: {}",
                    stderr.trim()
                ));
            }
            Err(StepError::Timeout(_)) => log.push(
                "⚠ Authentication timed out - please run 'cursor-agent login' manually".into(),
            ),
            Err(StepError::Io(e)) => log.push(format!(
                "⚠ Authentication error: {e} - please run 'cursor-agent login' manually"
            )),
        }

        log.push("\n\nStep 4: Finalization".to_string());
        log.push(format!(
            "→ Run 'source {}' or restart your terminal to apply PATH changes.",
            config_file.display()
        ));
        success(log)
    }
}

fn success(log: Vec<String>) -> ExecutionResult {
    ExecutionResult {
        success: true,
        output: log.join("\n"),
        error: None,
        return_code: 0,
        events: Vec::new(),
        session_id: None,
        duration_ms: None,
    }
}

async fn run_captured(cmd: &mut Command, timeout: Duration) -> Result<Output, StepError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let child = cmd.spawn()?;
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(out) => Ok(out?),
        Err(_) => Err(StepError::Timeout(timeout.as_secs())),
    }
}

/// Keeps the installer's status lines and drops its "Next Steps" advice,
/// since PATH setup is done here.
pub fn filter_installer_output(stdout: &str) -> String {
    const NEXT_STEP_PREFIXES: &[&str] = &[
        "1.",
        "2.",
        "For bash:",
        "For zsh:",
        "echo",
        "source",
        "cursor-agent",
    ];

    let cleaned = strip_ansi(stdout);
    let mut kept = Vec::new();
    let mut in_next_steps = false;
    for line in cleaned.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.contains("Next Steps") {
            in_next_steps = true;
            continue;
        }
        if in_next_steps && NEXT_STEP_PREFIXES.iter().any(|p| line.starts_with(p)) {
            continue;
        }
        if line.contains("Happy coding") {
            in_next_steps = false;
            continue;
        }
        if line.starts_with(['✓', '▸', '✨']) || line.contains("Installer") || line.contains("Detected")
        {
            kept.push(line);
        }
    }
    kept.join("\n")
}

/// Appends the `~/.local/bin` PATH export unless the file already mentions it.
pub fn ensure_path_export(config_file: &Path) -> std::io::Result<PathPatch> {
    match std::fs::read_to_string(config_file) {
        Ok(content) if content.contains(".local/bin") => return Ok(PathPatch::AlreadyConfigured),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config_file)?;
    write!(file, "\n{PATH_MARKER_COMMENT}\n{PATH_EXPORT_LINE}\n")?;
    Ok(PathPatch::Added)
}
