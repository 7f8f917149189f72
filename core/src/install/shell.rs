use std::path::{Path, PathBuf};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shell {
    Zsh,
    Bash,
    Unknown,
}

impl Shell {
    pub fn as_str(self) -> &'static str {
        match self {
            Shell::Zsh => "zsh",
            Shell::Bash => "bash",
            Shell::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detects the user's shell from `$SHELL`, then from rc files in the home dir.
pub fn detect_shell() -> Shell {
    let home = dirs::home_dir().unwrap_or_default();
    detect_shell_in(std::env::var("SHELL").ok().as_deref(), &home)
}

pub fn detect_shell_in(shell_var: Option<&str>, home: &Path) -> Shell {
    let shell_var = shell_var.unwrap_or_default();
    if shell_var.contains("zsh") {
        return Shell::Zsh;
    }
    if shell_var.contains("bash") {
        return Shell::Bash;
    }
    if home.join(".zshrc").exists() {
        Shell::Zsh
    } else if home.join(".bashrc").exists() {
        Shell::Bash
    } else {
        Shell::Unknown
    }
}

/// `~/.zshrc` for zsh, `~/.bashrc` otherwise.
pub fn shell_config_file() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_default();
    shell_config_file_for(detect_shell(), &home)
}

pub fn shell_config_file_for(shell: Shell, home: &Path) -> PathBuf {
    match shell {
        Shell::Zsh => home.join(".zshrc"),
        Shell::Bash | Shell::Unknown => home.join(".bashrc"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_var_wins() {
        let home = tempfile::tempdir().unwrap();
        assert_eq!(detect_shell_in(Some("/bin/zsh"), home.path()), Shell::Zsh);
        assert_eq!(detect_shell_in(Some("/usr/bin/bash"), home.path()), Shell::Bash);
    }

    #[test]
    fn falls_back_to_rc_files() {
        let home = tempfile::tempdir().unwrap();
        assert_eq!(detect_shell_in(Some("/bin/fish"), home.path()), Shell::Unknown);

        std::fs::write(home.path().join(".bashrc"), "").unwrap();
        assert_eq!(detect_shell_in(None, home.path()), Shell::Bash);

        std::fs::write(home.path().join(".zshrc"), "").unwrap();
        assert_eq!(detect_shell_in(None, home.path()), Shell::Zsh);
    }

    #[test]
    fn config_file_defaults_to_bashrc() {
        let home = Path::new("/home/u");
        assert_eq!(shell_config_file_for(Shell::Zsh, home), home.join(".zshrc"));
        assert_eq!(shell_config_file_for(Shell::Unknown, home), home.join(".bashrc"));
    }
}
