use serde_json::Value;

use super::model::{StreamEvent, ToolCall, ToolCallPhase, EVENT_ASSISTANT, EVENT_UNKNOWN};

/// Parses one stdout line into a [`StreamEvent`].
///
/// Lines that are not JSON objects are noise and yield `None`.
pub fn parse_event(line: &str) -> Option<StreamEvent> {
    let value: Value = serde_json::from_str(line.trim()).ok()?;
    let Value::Object(data) = value else {
        return None;
    };

    let event_type = data
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or(EVENT_UNKNOWN)
        .to_string();
    let subtype = data
        .get("subtype")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(StreamEvent {
        event_type,
        subtype,
        data,
    })
}

/// Concatenated `text` blocks of an assistant event's `message.content`.
pub fn assistant_text(event: &StreamEvent) -> Option<String> {
    if !event.is(EVENT_ASSISTANT) {
        return None;
    }
    let items = event
        .data
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_array)?;

    let text: String = items
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .collect();
    Some(text)
}

pub fn session_id(event: &StreamEvent) -> Option<String> {
    if !event.is_session_init() {
        return None;
    }
    event.str_field("session_id").map(str::to_string)
}

pub fn duration_ms(event: &StreamEvent) -> Option<u64> {
    let v = event.data.get("duration_ms")?;
    v.as_u64()
        .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
}

pub fn tool_call(event: &StreamEvent) -> (ToolCall, ToolCallPhase) {
    let phase = ToolCallPhase::from_subtype(event.subtype.as_deref());
    let Some(call) = event.data.get("tool_call") else {
        return (ToolCall::Unrecognized, phase);
    };

    let arg_path = |shape: &Value| {
        shape
            .get("args")
            .and_then(|a| a.get("path"))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let parsed = if let Some(read) = call.get("readToolCall") {
        ToolCall::Read {
            path: arg_path(read),
        }
    } else if let Some(write) = call.get("writeToolCall") {
        ToolCall::Write {
            path: arg_path(write),
        }
    } else if let Some(func) = call.get("function") {
        ToolCall::Function {
            name: func.get("name").and_then(Value::as_str).map(str::to_string),
        }
    } else {
        ToolCall::Unrecognized
    };
    (parsed, phase)
}
