use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub install: InstallConfig,

    /// Explicit agents.yaml location. When unset the file is searched for
    /// from the current directory upwards.
    #[serde(default)]
    pub agents_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr. Stdout belongs to the protocol.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a daily rolling file under `directory`.
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "subagent_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Directory for log files. If empty or unset, uses `./logs`.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Program name looked up on PATH.
    #[serde(default = "default_program")]
    pub program: String,

    /// Checked in order when PATH lookup fails. `~` is expanded.
    #[serde(default = "default_fallback_paths")]
    pub fallback_paths: Vec<String>,

    /// Upper bound for a single stdout/stderr line.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    #[serde(default = "default_line_channel_capacity")]
    pub line_channel_capacity: usize,

    /// Tail of stderr kept for classification and error messages.
    #[serde(default = "default_stderr_capture_bytes")]
    pub stderr_capture_bytes: usize,

    /// How long stderr may keep draining after stdout closed.
    #[serde(default = "default_stderr_grace_ms")]
    pub stderr_grace_ms: u64,

    /// How long to wait for the process to exit after stdout closed.
    #[serde(default = "default_exit_grace_ms")]
    pub exit_grace_ms: u64,

    /// Output longer than this (in chars, trimmed) counts as useful.
    #[serde(default = "default_useful_output_threshold")]
    pub useful_output_threshold: usize,

    /// Used when a caller does not pass its own timeout.
    #[serde(default)]
    pub default_timeout_secs: Option<f64>,
}

fn default_program() -> String {
    "cursor-agent".to_string()
}

fn default_fallback_paths() -> Vec<String> {
    vec![
        "~/.local/bin/cursor-agent".to_string(),
        "/usr/local/bin/cursor-agent".to_string(),
        "~/bin/cursor-agent".to_string(),
    ]
}

fn default_max_line_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_line_channel_capacity() -> usize {
    1024
}

fn default_stderr_capture_bytes() -> usize {
    64 * 1024
}

fn default_stderr_grace_ms() -> u64 {
    2_000
}

fn default_exit_grace_ms() -> u64 {
    5_000
}

fn default_useful_output_threshold() -> usize {
    50
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            fallback_paths: default_fallback_paths(),
            max_line_bytes: default_max_line_bytes(),
            line_channel_capacity: default_line_channel_capacity(),
            stderr_capture_bytes: default_stderr_capture_bytes(),
            stderr_grace_ms: default_stderr_grace_ms(),
            exit_grace_ms: default_exit_grace_ms(),
            useful_output_threshold: default_useful_output_threshold(),
            default_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Shell pipeline that downloads and runs the Cursor CLI installer.
    #[serde(default = "default_install_command")]
    pub command: String,

    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
}

fn default_install_command() -> String {
    "curl -L https://cursor.com/install | gunzip | bash".to_string()
}

fn default_step_timeout_secs() -> u64 {
    120
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            command: default_install_command(),
            step_timeout_secs: default_step_timeout_secs(),
        }
    }
}
