mod final_json;
mod model;
mod stream_json;

pub use final_json::extract_final_json;
pub use model::{
    StreamEvent, ToolCall, ToolCallPhase, EVENT_ASSISTANT, EVENT_RESULT, EVENT_SYSTEM,
    EVENT_THINKING, EVENT_TOOL_CALL, EVENT_UNKNOWN,
};
pub use stream_json::{assistant_text, duration_ms, parse_event, session_id, tool_call};
