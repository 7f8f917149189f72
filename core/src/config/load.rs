use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default data directory: ~/.cursor-subagent
pub fn get_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".cursor-subagent"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.cursor-subagent/config.toml
    let user_config = get_data_dir()?.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let cfg = if user_config.exists() {
        load_from_path(&user_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    Ok(apply_env_overrides(cfg, |key| std::env::var(key).ok()))
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
    Ok(cfg)
}

/// Environment variable overrides (Priority 0: highest).
pub(crate) fn apply_env_overrides<F>(mut cfg: AppConfig, var: F) -> AppConfig
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("CURSOR_SUBAGENT_AGENT_BIN") {
        cfg.runner.program = v;
    }
    if let Some(v) = non_empty("CURSOR_SUBAGENT_LOG_DIR") {
        cfg.logging.directory = Some(v);
    }
    if let Some(v) = non_empty("CURSOR_SUBAGENT_AGENTS") {
        cfg.agents_file = Some(v);
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_replace_non_empty_values_only() {
        let cfg = apply_env_overrides(AppConfig::default(), |key| match key {
            "CURSOR_SUBAGENT_AGENT_BIN" => Some("/opt/cursor/agent".to_string()),
            "CURSOR_SUBAGENT_LOG_DIR" => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(cfg.runner.program, "/opt/cursor/agent");
        assert!(cfg.logging.directory.is_none());
        assert!(cfg.agents_file.is_none());
    }

    #[test]
    fn load_from_path_reports_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[runner\nprogram = 1").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("invalid config"));
    }
}
