use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const EVENT_SYSTEM: &str = "system";
pub const EVENT_ASSISTANT: &str = "assistant";
pub const EVENT_TOOL_CALL: &str = "tool_call";
pub const EVENT_RESULT: &str = "result";
pub const EVENT_THINKING: &str = "thinking";
pub const EVENT_UNKNOWN: &str = "unknown";

/// One line of the cursor-agent `stream-json` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub event_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    /// The whole decoded object, including `type` and `subtype`.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl StreamEvent {
    pub fn is(&self, event_type: &str) -> bool {
        self.event_type == event_type
    }

    pub fn is_session_init(&self) -> bool {
        self.is(EVENT_SYSTEM) && self.subtype.as_deref() == Some("init")
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// The known `tool_call` payload shapes. Anything else is `Unrecognized`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Read { path: Option<String> },
    Write { path: Option<String> },
    Function { name: Option<String> },
    Unrecognized,
}

impl ToolCall {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolCall::Read { .. } => "read",
            ToolCall::Write { .. } => "write",
            ToolCall::Function { .. } => "function",
            ToolCall::Unrecognized => "unrecognized",
        }
    }

    /// Path for file tools, name for functions.
    pub fn target(&self) -> &str {
        match self {
            ToolCall::Read { path } | ToolCall::Write { path } => path.as_deref().unwrap_or("?"),
            ToolCall::Function { name } => name.as_deref().unwrap_or("?"),
            ToolCall::Unrecognized => "?",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCallPhase {
    Started,
    Completed,
    Other,
}

impl ToolCallPhase {
    pub fn from_subtype(subtype: Option<&str>) -> Self {
        match subtype {
            Some("started") => ToolCallPhase::Started,
            Some("completed") => ToolCallPhase::Completed,
            _ => ToolCallPhase::Other,
        }
    }
}
