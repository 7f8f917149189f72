use std::time::Duration;

use crate::tool_event::extract_final_json;
use crate::util::{strip_ansi, truncate_chars};

use super::observe::StreamSummary;
use super::types::{ExecutionResult, NO_EXIT_CODE};

/// stderr fragments emitted when cursor-agent drops its HTTP/2 connection
/// after the answer was already streamed.
pub const BENIGN_STDERR_SIGNATURES: &[&str] = &["Premature close", "NGHTTP2"];

pub const DEFAULT_USEFUL_OUTPUT_THRESHOLD: usize = 50;

const STDERR_ERROR_CHARS: usize = 500;

pub fn is_benign_transport_error(stderr: &str) -> bool {
    BENIGN_STDERR_SIGNATURES
        .iter()
        .any(|sig| stderr.contains(sig))
}

/// stderr with benign signature lines removed, trimmed and truncated.
fn non_benign_stderr(stderr: &str) -> Option<String> {
    let cleaned = strip_ansi(stderr);
    let kept: Vec<&str> = cleaned
        .lines()
        .filter(|line| !is_benign_transport_error(line))
        .collect();
    let joined = kept.join("\n");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(truncate_chars(trimmed, STDERR_ERROR_CHARS).to_string())
}

/// The final JSON payload if the text carries one, the raw text otherwise.
pub fn select_output(text: &str) -> String {
    extract_final_json(text).unwrap_or_else(|| text.to_string())
}

pub fn has_useful_output(output: &str, threshold: usize) -> bool {
    output.trim().chars().count() > threshold
}

/// `benign_seen` carries a signature spotted on a stderr line that may no
/// longer be part of the captured `stderr` tail.
pub fn build_result(
    summary: StreamSummary,
    stderr: &str,
    benign_seen: bool,
    stream_error: Option<&str>,
    exit_code: i32,
    useful_output_threshold: usize,
) -> ExecutionResult {
    let output = select_output(&summary.text);
    let benign = benign_seen || is_benign_transport_error(stderr);
    let useful = has_useful_output(&output, useful_output_threshold);
    let success = exit_code == 0 || (benign && useful);
    let stderr_error = non_benign_stderr(stderr);

    let error = if success {
        stderr_error
    } else {
        let parts: Vec<String> = stderr_error
            .into_iter()
            .chain(stream_error.map(str::to_string))
            .collect();
        if parts.is_empty() {
            Some(format!("cursor-agent exited with code {exit_code}"))
        } else {
            Some(parts.join(" | "))
        }
    };

    if success && exit_code != 0 {
        tracing::info!(
            exit_code,
            "non-zero exit with benign transport error and useful output, treating as success"
        );
    }

    ExecutionResult {
        success,
        output,
        error,
        return_code: exit_code,
        events: summary.events,
        session_id: summary.session_id,
        duration_ms: summary.duration_ms,
    }
}

/// Failed result carrying whatever was observed before the deadline.
pub fn timeout_result(summary: StreamSummary, timeout: Duration) -> ExecutionResult {
    ExecutionResult {
        success: false,
        output: select_output(&summary.text),
        error: Some(format!("Timeout after {}s", format_secs(timeout))),
        return_code: NO_EXIT_CODE,
        events: summary.events,
        session_id: summary.session_id,
        duration_ms: summary.duration_ms,
    }
}

fn format_secs(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        d.as_secs().to_string()
    } else {
        format!("{}", d.as_secs_f64())
    }
}
