use crate::tool_event::{
    assistant_text, duration_ms, parse_event, session_id, tool_call, StreamEvent, ToolCallPhase,
    EVENT_ASSISTANT, EVENT_RESULT, EVENT_THINKING, EVENT_TOOL_CALL,
};
use crate::util::preview;

const PREVIEW_CHARS: usize = 150;

/// Folds stdout lines into the per-invocation aggregate and logs progress.
#[derive(Debug, Default)]
pub struct StreamObserver {
    events: Vec<StreamEvent>,
    text: String,
    session_id: Option<String>,
    duration_ms: Option<u64>,
    malformed: u64,
}

/// What the observer saw, handed to the result builder.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StreamSummary {
    pub events: Vec<StreamEvent>,
    pub text: String,
    pub session_id: Option<String>,
    pub duration_ms: Option<u64>,
}

impl StreamObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let Some(event) = parse_event(line) else {
            self.malformed += 1;
            tracing::debug!(line = %preview(line, PREVIEW_CHARS), "skipping non-event stdout line");
            return;
        };
        if event.is(EVENT_THINKING) {
            return;
        }

        log_event(&event);

        if let Some(text) = assistant_text(&event) {
            self.text.push_str(&text);
        }
        if self.session_id.is_none() {
            self.session_id = session_id(&event);
        }
        if event.is(EVENT_RESULT) {
            if let Some(ms) = duration_ms(&event) {
                self.duration_ms = Some(ms);
            }
        }
        self.events.push(event);
    }

    pub fn malformed_lines(&self) -> u64 {
        self.malformed
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn into_summary(self) -> StreamSummary {
        StreamSummary {
            events: self.events,
            text: self.text,
            session_id: self.session_id,
            duration_ms: self.duration_ms,
        }
    }
}

fn log_event(event: &StreamEvent) {
    if event.is_session_init() {
        tracing::info!(
            session_id = event.str_field("session_id").unwrap_or("-"),
            model = event.str_field("model").unwrap_or("-"),
            cwd = event.str_field("cwd").unwrap_or("-"),
            "agent session started"
        );
        return;
    }

    match event.event_type.as_str() {
        EVENT_ASSISTANT => {
            if let Some(text) = assistant_text(event).filter(|t| !t.is_empty()) {
                tracing::debug!(text = %preview(&text, PREVIEW_CHARS), "assistant");
            }
        }
        EVENT_TOOL_CALL => {
            let (call, phase) = tool_call(event);
            match phase {
                ToolCallPhase::Started => {
                    tracing::info!(tool = call.kind(), target = call.target(), "tool started")
                }
                ToolCallPhase::Completed => {
                    tracing::debug!(tool = call.kind(), target = call.target(), "tool completed")
                }
                ToolCallPhase::Other => {}
            }
        }
        EVENT_RESULT => {
            tracing::info!(
                duration_ms = duration_ms(event).unwrap_or_default(),
                subtype = event.subtype.as_deref().unwrap_or("-"),
                "agent result"
            );
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn aggregates_text_session_and_duration() {
        let mut obs = StreamObserver::new();
        for line in [
            r#"{"type":"system","subtype":"init","session_id":"s1","model":"m"}"#,
            r#"{"type":"thinking","text":"hmm"}"#,
            "garbage",
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Hello "}]}}"#,
            r#"{"type":"tool_call","subtype":"started","tool_call":{"readToolCall":{"args":{"path":"a.rs"}}}}"#,
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"world"}]}}"#,
            r#"{"type":"system","subtype":"init","session_id":"s2"}"#,
            r#"{"type":"result","duration_ms":1234}"#,
        ] {
            obs.observe_line(line);
        }

        assert_eq!(obs.malformed_lines(), 1);
        let summary = obs.into_summary();
        assert_eq!(summary.text, "Hello world");
        assert_eq!(summary.session_id.as_deref(), Some("s1"));
        assert_eq!(summary.duration_ms, Some(1234));
        let types: Vec<&str> = summary.events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["system", "assistant", "tool_call", "assistant", "system", "result"]
        );
    }

    #[test]
    fn duration_only_comes_from_result_events() {
        let assistant = r#"{"type":"assistant","duration_ms":5,"message":{"content":[]}}"#;
        let mut obs = StreamObserver::new();
        obs.observe_line(assistant);
        assert_eq!(obs.into_summary().duration_ms, None);

        let mut obs = StreamObserver::new();
        obs.observe_line(assistant);
        obs.observe_line(r#"{"type":"result","duration_ms":7.6}"#);
        assert_eq!(obs.into_summary().duration_ms, Some(8));
    }

    #[test]
    fn blank_lines_are_not_counted_as_malformed() {
        let mut obs = StreamObserver::new();
        obs.observe_line("   ");
        obs.observe_line("");
        assert_eq!(obs.malformed_lines(), 0);
        assert_eq!(obs.event_count(), 0);
    }
}
