//! Agent registry: `agents.yaml` plus the prompt files it points at.
//!
//! ```yaml
//! prompts_base_path: prompts
//! agents:
//!   analyst:
//!     name: Analyst
//!     description: Writes the technical specification
//!     prompt_file: analyst.md
//!     default_model: auto
//! ```
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const AGENTS_FILE_NAME: &str = "agents.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    pub prompt_file: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    /// When to call this agent; injected into the orchestration guide.
    #[serde(default)]
    pub invocation_rules: Option<String>,
}

fn default_model() -> String {
    "auto".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentsFile {
    #[serde(default)]
    pub agents: BTreeMap<String, AgentConfig>,
    #[serde(default)]
    pub prompts_base_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AgentRegistry {
    file: AgentsFile,
    source: PathBuf,
}

impl AgentRegistry {
    /// Loads the registry from an explicit path, or searches `start` and its
    /// parents for `agents.yaml`.
    pub fn discover(explicit: Option<&Path>, start: &Path) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => find_agents_file(start).ok_or(ConfigError::NotFound)?,
        };
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: AgentsFile = if raw.trim().is_empty() {
            AgentsFile::default()
        } else {
            serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };
        tracing::debug!(path = %path.display(), agents = file.agents.len(), "agents file loaded");
        Ok(Self {
            file,
            source: path.to_path_buf(),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.file.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.agents.is_empty()
    }

    /// Roles in sorted order.
    pub fn agents(&self) -> impl Iterator<Item = (&str, &AgentConfig)> {
        self.file.agents.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn available_roles(&self) -> String {
        self.file
            .agents
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn get(&self, role: &str) -> Result<&AgentConfig, ConfigError> {
        self.file
            .agents
            .get(role)
            .ok_or_else(|| ConfigError::UnknownRole {
                role: role.to_string(),
                available: self.available_roles(),
            })
    }

    /// Absolute paths are used as-is; relative ones are tried under
    /// `prompts_base_path` and then next to the agents file.
    pub fn resolve_prompt_path(&self, prompt_file: &str) -> Result<PathBuf, ConfigError> {
        let raw = PathBuf::from(prompt_file);
        let resolved = if raw.is_absolute() {
            raw
        } else {
            let config_dir = self.source.parent().unwrap_or_else(|| Path::new("."));
            match self.file.prompts_base_path.as_deref() {
                Some(base) => {
                    let base = PathBuf::from(base);
                    let base = if base.is_absolute() {
                        base
                    } else {
                        config_dir.join(base)
                    };
                    base.join(&raw)
                }
                None => config_dir.join(&raw),
            }
        };

        if !resolved.exists() {
            return Err(ConfigError::PromptNotFound(resolved));
        }
        Ok(resolved)
    }

    fn load_document(&self, role: &str) -> Result<AgentDocument, ConfigError> {
        let agent = self.get(role)?;
        let path = self.resolve_prompt_path(&agent.prompt_file)?;
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(AgentDocument::parse(&raw))
    }

    /// System prompt for a role.
    pub fn load_prompt(&self, role: &str) -> Result<String, ConfigError> {
        Ok(self.load_document(role)?.prompt)
    }

    /// Invocation rules from agents.yaml, falling back to the prompt file's
    /// `# Invocation Rules` section.
    pub fn invocation_rules(&self, role: &str) -> Option<String> {
        let agent = self.get(role).ok()?;
        if let Some(rules) = agent
            .invocation_rules
            .as_deref()
            .filter(|r| !r.trim().is_empty())
        {
            return Some(rules.to_string());
        }
        self.load_document(role).ok()?.invocation_rules
    }
}

pub fn find_agents_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(AGENTS_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// A prompt file, optionally in the scaffold layout: YAML front matter,
/// a `# Invocation Rules` section and a `# Prompt` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDocument {
    pub prompt: String,
    pub invocation_rules: Option<String>,
}

impl AgentDocument {
    pub fn parse(raw: &str) -> Self {
        let body = strip_front_matter(raw);

        #[derive(Clone, Copy)]
        enum Section {
            Preamble,
            Rules,
            Prompt,
        }

        let mut section = Section::Preamble;
        let mut rules: Option<Vec<&str>> = None;
        let mut prompt: Option<Vec<&str>> = None;

        for line in body.lines() {
            match line.trim_end() {
                "# Invocation Rules" => {
                    section = Section::Rules;
                    rules.get_or_insert_with(Vec::new);
                    continue;
                }
                "# Prompt" => {
                    section = Section::Prompt;
                    prompt.get_or_insert_with(Vec::new);
                    continue;
                }
                _ => {}
            }
            match section {
                Section::Preamble => {}
                Section::Rules => rules.get_or_insert_with(Vec::new).push(line),
                Section::Prompt => prompt.get_or_insert_with(Vec::new).push(line),
            }
        }

        let join = |lines: Vec<&str>| lines.join("\n").trim().to_string();
        match prompt {
            Some(p) => Self {
                prompt: join(p),
                invocation_rules: rules.map(join).filter(|r| !r.is_empty()),
            },
            // Plain prompt file: the whole body is the prompt.
            None => Self {
                prompt: body.trim().to_string(),
                invocation_rules: None,
            },
        }
    }
}

fn strip_front_matter(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("---") else {
        return raw;
    };
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return raw;
    };
    match rest.find("\n---") {
        Some(end) => {
            let after = &rest[end + 4..];
            after.split_once('\n').map(|(_, tail)| tail).unwrap_or("")
        }
        None => raw,
    }
}
