//! The MCP tools. Every tool answers with a structured JSON object; failures of
//! the agent run itself are reported inside that object, never as RPC errors.
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use subagent_core::api::{AppContext, ConfigError, InvokeRequest};

use super::protocol::RpcError;

const ORCHESTRATOR_GUIDE: &str = include_str!("../../resources/orchestrator.md");
const AGENT_TEMPLATE: &str = include_str!("../../resources/agent_template.md");
const DEFAULT_AGENT_NAME: &str = "New Agent";

/// Result of one tool call, rendered into the MCP `CallToolResult` shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub structured: Value,
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    fn json(structured: Value) -> Self {
        let text = serde_json::to_string_pretty(&structured).unwrap_or_default();
        Self {
            structured,
            text,
            is_error: false,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            structured: json!({ "error": message }),
            text: message,
            is_error: true,
        }
    }

    pub fn into_result(self) -> Value {
        json!({
            "content": [{ "type": "text", "text": self.text }],
            "structuredContent": self.structured,
            "isError": self.is_error,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AgentRoleParams {
    agent_role: String,
}

#[derive(Debug, Deserialize)]
pub struct InvokeParams {
    pub agent_role: String,
    pub task: String,
    pub cwd: PathBuf,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub timeout: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CreateAgentParams {
    path: PathBuf,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvokeResponse {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub agent_role: String,
    pub model_used: Option<String>,
    pub session_id: Option<String>,
    pub duration_ms: Option<u64>,
}

impl InvokeResponse {
    fn failed(role: &str, error: impl Into<String>, model: Option<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            agent_role: role.to_string(),
            model_used: model,
            session_id: None,
            duration_ms: None,
        }
    }
}

pub struct Tools {
    ctx: AppContext,
}

impl Tools {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Tool descriptors for `tools/list`.
    pub fn specs() -> Vec<Value> {
        let no_args = json!({ "type": "object", "properties": {} });
        vec![
            json!({
                "name": "get_orchestration_guide",
                "description": "Get the complete orchestration guide with instructions and the available agents. Call this first when starting a multi-agent development task.",
                "inputSchema": no_args,
            }),
            json!({
                "name": "list_agents",
                "description": "List all available subagents with their name, description and default model.",
                "inputSchema": no_args,
            }),
            json!({
                "name": "get_agent_prompt",
                "description": "Get the full system prompt of a specific agent.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "agent_role": { "type": "string", "description": "The role of the agent (e.g. 'analyst', 'developer')" }
                    },
                    "required": ["agent_role"]
                },
            }),
            json!({
                "name": "invoke_subagent",
                "description": "Invoke a subagent through cursor-agent with its system prompt and the given task. Returns success, output, error, agent_role, model_used, session_id and duration_ms.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "agent_role": { "type": "string", "description": "The role of the agent to invoke" },
                        "task": { "type": "string", "description": "The task or instruction to give to the agent" },
                        "cwd": { "type": "string", "description": "Working directory (project root) where the agent executes and creates files" },
                        "context": { "type": "string", "description": "Additional context such as file contents, previous results or a project description" },
                        "model": { "type": "string", "description": "Override the agent's default model" },
                        "timeout": { "type": "number", "description": "Timeout in seconds for the agent execution" }
                    },
                    "required": ["agent_role", "task", "cwd"]
                },
            }),
            json!({
                "name": "setup_cursor_cli",
                "description": "Install cursor-agent, add ~/.local/bin to PATH in the shell config and authenticate.",
                "inputSchema": no_args,
            }),
            json!({
                "name": "check_status",
                "description": "Check whether cursor-agent is available and the agent configuration is loaded.",
                "inputSchema": no_args,
            }),
            json!({
                "name": "create_agent",
                "description": "Create a markdown scaffold for a new agent definition at the given path.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "description": "Target file, extension-less path or directory" },
                        "name": { "type": "string", "description": "Display name of the agent" }
                    },
                    "required": ["path"]
                },
            }),
        ]
    }

    pub async fn call(&self, name: &str, args: Value) -> Result<ToolOutput, RpcError> {
        tracing::debug!(tool = name, "tool call");
        let args = if args.is_null() {
            Value::Object(Map::new())
        } else {
            args
        };

        let out = match name {
            "get_orchestration_guide" => match self.orchestration_guide() {
                Ok(v) => ToolOutput::json(v),
                Err(e) => ToolOutput::error(e.to_string()),
            },
            "list_agents" => match self.list_agents() {
                Ok(v) => ToolOutput::json(v),
                Err(e) => ToolOutput::error(e.to_string()),
            },
            "get_agent_prompt" => {
                let p: AgentRoleParams = parse_args(args)?;
                match self.agent_prompt(&p.agent_role) {
                    Ok(prompt) => ToolOutput {
                        structured: json!({ "agent_role": p.agent_role, "prompt": prompt }),
                        text: prompt,
                        is_error: false,
                    },
                    Err(e) => ToolOutput::error(e.to_string()),
                }
            }
            "invoke_subagent" => {
                let p: InvokeParams = parse_args(args)?;
                let resp = self.invoke_subagent(p).await;
                ToolOutput::json(to_value(&resp))
            }
            "setup_cursor_cli" => ToolOutput::json(self.setup_cursor_cli().await),
            "check_status" => ToolOutput::json(self.check_status()),
            "create_agent" => {
                let p: CreateAgentParams = parse_args(args)?;
                let name = p.name.as_deref().unwrap_or(DEFAULT_AGENT_NAME);
                match create_agent_scaffold(&p.path, name) {
                    Ok(path) => ToolOutput::json(json!({
                        "path": path.display().to_string(),
                        "message": scaffold_instructions(&path),
                    })),
                    Err(e) => ToolOutput::error(format!(
                        "failed to create agent scaffold at {}: {e}",
                        p.path.display()
                    )),
                }
            }
            other => {
                return Err(RpcError::invalid_params(format!("unknown tool: {other}")));
            }
        };
        Ok(out)
    }

    pub fn orchestration_guide(&self) -> Result<Value, ConfigError> {
        let registry = self.ctx.registry()?;

        let mut guide = ORCHESTRATOR_GUIDE.to_string();
        let mut agents = Map::new();
        // BTreeMap order: roles come out sorted.
        for (role, agent) in registry.agents() {
            if let Some(rules) = registry.invocation_rules(role) {
                guide.push_str(&format!("\n### Agent: {} (`{role}`)\n\n", agent.name));
                guide.push_str(&rules);
                guide.push('\n');
            }
            agents.insert(
                role.to_string(),
                json!({ "name": agent.name, "description": agent.description }),
            );
        }
        Ok(json!({ "guide": guide, "agents": agents }))
    }

    pub fn list_agents(&self) -> Result<Value, ConfigError> {
        let registry = self.ctx.registry()?;
        let agents: Map<String, Value> = registry
            .agents()
            .map(|(role, agent)| {
                (
                    role.to_string(),
                    json!({
                        "name": agent.name,
                        "description": agent.description,
                        "default_model": agent.default_model,
                    }),
                )
            })
            .collect();
        Ok(Value::Object(agents))
    }

    pub fn agent_prompt(&self, role: &str) -> Result<String, ConfigError> {
        self.ctx.registry()?.load_prompt(role)
    }

    /// Every failure, including a bad timeout, comes back as `success: false`.
    pub async fn invoke_subagent(&self, p: InvokeParams) -> InvokeResponse {
        let role = p.agent_role.as_str();
        let timeout = match p.timeout {
            None => None,
            Some(secs) => match Duration::try_from_secs_f64(secs) {
                Ok(d) if !d.is_zero() => Some(d),
                _ => {
                    return InvokeResponse::failed(
                        role,
                        format!("timeout must be a positive number of seconds, got {secs}"),
                        None,
                    );
                }
            },
        };

        let locator = self.ctx.runner().locator();
        let Some(exe) = locator.find() else {
            let (_, message) = locator.check_available();
            return InvokeResponse::failed(role, message, None);
        };

        let registry = match self.ctx.registry() {
            Ok(r) => r,
            Err(e) => return InvokeResponse::failed(role, e.to_string(), None),
        };
        let agent = match registry.get(role) {
            Ok(a) => a,
            Err(e) => return InvokeResponse::failed(role, e.to_string(), None),
        };
        let model = p
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| agent.default_model.clone());
        let system_prompt = match registry.load_prompt(role) {
            Ok(prompt) => prompt,
            Err(e) => return InvokeResponse::failed(role, e.to_string(), Some(model)),
        };

        let req = InvokeRequest::new(system_prompt, p.task, model.clone(), p.cwd)
            .with_context(p.context)
            .with_timeout(timeout)
            .with_role(role);
        let result = self.ctx.runner().run_with(&exe, req).await;

        InvokeResponse {
            success: result.success,
            output: result.output,
            error: result.error,
            agent_role: role.to_string(),
            model_used: Some(model),
            session_id: result.session_id,
            duration_ms: result.duration_ms,
        }
    }

    pub async fn setup_cursor_cli(&self) -> Value {
        let installer = self.ctx.installer();
        let shell = installer.shell();
        let result = installer.install().await;
        json!({
            "success": result.success,
            "output": result.output,
            "error": result.error,
            "shell": shell.as_str(),
        })
    }

    pub fn check_status(&self) -> Value {
        let (available, message) = self.ctx.runner().locator().check_available();
        let (loaded, error, count) = match self.ctx.registry() {
            Ok(r) => (true, None, r.len()),
            Err(e) => (false, Some(e.to_string()), 0),
        };
        json!({
            "cursor_agent_available": available,
            "cursor_agent_message": message,
            "config_loaded": loaded,
            "config_error": error,
            "agent_count": count,
        })
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, RpcError> {
    serde_json::from_value(args).map_err(|e| RpcError::invalid_params(e.to_string()))
}

fn to_value<T: Serialize>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}

/// Writes the agent template. `path` may be a directory (file named after the
/// agent), a path without extension (`.md` appended) or a full file path.
pub fn create_agent_scaffold(path: &Path, name: &str) -> std::io::Result<PathBuf> {
    let target = if path.is_dir() {
        path.join(format!("{}.md", name.to_lowercase().replace(' ', "_")))
    } else if path.extension().is_none() {
        path.with_extension("md")
    } else {
        path.to_path_buf()
    };

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, AGENT_TEMPLATE.replace("{name}", name))?;
    tracing::info!(path = %target.display(), "created agent scaffold");
    Ok(target)
}

fn scaffold_instructions(path: &Path) -> String {
    let path = path.display();
    format!(
        "I have created a scaffold for the new agent at `{path}`.\n\
         Please read this file to understand the structure.\n\
         Then, ask the user for the specific details of this new agent (role, responsibilities, inputs, outputs, workflow).\n\
         Once you have the details, please fill in the placeholders in `{path}` with the appropriate content."
    )
}
