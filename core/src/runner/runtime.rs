//! Coordinator for one cursor-agent process: pumps stdout/stderr, folds the
//! event stream, enforces the stderr/exit grace periods and the overall timeout.
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::util::{preview, TailBytes};

use super::classify;
use super::io_pump::{self, LineStream, PumpMsg};
use super::observe::StreamObserver;
use super::traits::RunnerSession;
use super::types::{ExecutionResult, NO_EXIT_CODE};

/// Knobs of the runtime, lifted out of [`RunnerConfig`].
#[derive(Debug, Clone)]
pub struct RuntimeLimits {
    pub max_line_bytes: usize,
    pub line_channel_capacity: usize,
    pub stderr_capture_bytes: usize,
    pub stderr_grace: Duration,
    pub exit_grace: Duration,
    pub useful_output_threshold: usize,
}

impl RuntimeLimits {
    pub fn from_config(cfg: &RunnerConfig) -> Self {
        Self {
            max_line_bytes: cfg.max_line_bytes,
            line_channel_capacity: cfg.line_channel_capacity.max(1),
            stderr_capture_bytes: cfg.stderr_capture_bytes,
            stderr_grace: Duration::from_millis(cfg.stderr_grace_ms),
            exit_grace: Duration::from_millis(cfg.exit_grace_ms),
            useful_output_threshold: cfg.useful_output_threshold,
        }
    }
}

impl Default for RuntimeLimits {
    fn default() -> Self {
        Self::from_config(&RunnerConfig::default())
    }
}

/// Per-invocation aggregate owned by the coordinator.
struct Collector {
    observer: StreamObserver,
    stderr: TailBytes,
    /// Sticky: the tail buffer may drop the line that carried the signature.
    benign_seen: bool,
    stream_errors: Vec<String>,
    stdout_open: bool,
    stderr_open: bool,
}

impl Collector {
    fn new(stderr_capture_bytes: usize) -> Self {
        Self {
            observer: StreamObserver::new(),
            stderr: TailBytes::new(stderr_capture_bytes),
            benign_seen: false,
            stream_errors: Vec::new(),
            stdout_open: true,
            stderr_open: true,
        }
    }

    fn apply(&mut self, msg: PumpMsg) {
        match msg {
            PumpMsg::Line {
                stream: LineStream::Stdout,
                line,
            } => self.observer.observe_line(&line),
            PumpMsg::Line {
                stream: LineStream::Stderr,
                line,
            } => {
                tracing::debug!(line = %preview(&line, 200), "agent stderr");
                if !self.benign_seen && classify::is_benign_transport_error(&line) {
                    tracing::debug!("benign transport error on stderr");
                    self.benign_seen = true;
                }
                self.stderr.push_line(&line);
            }
            PumpMsg::Oversized { stream, bytes } => {
                tracing::warn!(stream = stream.label(), bytes, "discarded oversized line");
                self.stream_errors.push(format!(
                    "{} line of {bytes} bytes exceeded the line limit and was discarded",
                    stream.label()
                ));
            }
            PumpMsg::Closed { stream, error } => {
                if let Some(error) = error {
                    self.stream_errors.push(error);
                }
                match stream {
                    LineStream::Stdout => self.stdout_open = false,
                    LineStream::Stderr => self.stderr_open = false,
                }
            }
        }
    }

    fn close_all(&mut self) {
        self.stdout_open = false;
        self.stderr_open = false;
    }

    fn stream_error(&self) -> Option<String> {
        (!self.stream_errors.is_empty()).then(|| self.stream_errors.join("; "))
    }
}

pub async fn run_session_runtime(
    mut session: Box<dyn RunnerSession>,
    limits: &RuntimeLimits,
    timeout: Option<Duration>,
) -> Result<ExecutionResult, RunnerError> {
    let stdout = session
        .stdout()
        .ok_or_else(|| RunnerError::Spawn("no stdout".into()))?;
    let stderr = session
        .stderr()
        .ok_or_else(|| RunnerError::Spawn("no stderr".into()))?;

    let started_at = Instant::now();
    let (line_tx, mut line_rx) = mpsc::channel::<PumpMsg>(limits.line_channel_capacity);
    let out_pump = io_pump::pump_stdout(stdout, limits.max_line_bytes, line_tx.clone());
    let err_pump = io_pump::pump_stderr(stderr, limits.max_line_bytes, line_tx);

    let mut collector = Collector::new(limits.stderr_capture_bytes);

    let driven = {
        let drive = drive(session.as_mut(), &mut line_rx, &mut collector, limits);
        match timeout {
            Some(limit) => tokio::time::timeout(limit, drive).await.ok(),
            None => Some(drive.await),
        }
    };

    let exit_code = match driven {
        Some(res) => {
            // stderr may have been abandoned after its grace period.
            err_pump.abort();
            out_pump.abort();
            match res {
                Ok(code) => code,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to collect agent exit status");
                    collector.stream_errors.push(e.to_string());
                    NO_EXIT_CODE
                }
            }
        }
        None => {
            let limit = timeout.unwrap_or_default();
            tracing::warn!(
                timeout_secs = limit.as_secs_f64(),
                events = collector.observer.event_count(),
                "agent timed out, killing process"
            );
            if let Err(e) = session.kill().await {
                tracing::warn!(error = %e, "failed to kill timed-out process");
            }
            match tokio::time::timeout(limits.exit_grace, session.wait()).await {
                Ok(Ok(code)) => tracing::debug!(code, "timed-out process reaped"),
                Ok(Err(e)) => tracing::debug!(error = %e, "wait after kill failed"),
                Err(_) => tracing::warn!("timed-out process did not exit after kill"),
            }
            out_pump.abort();
            err_pump.abort();
            return Ok(classify::timeout_result(
                collector.observer.into_summary(),
                limit,
            ));
        }
    };

    let malformed_lines = collector.observer.malformed_lines();
    let stream_error = collector.stream_error();
    let stderr_text = collector.stderr.whole_lines_lossy();
    if collector.stderr.dropped() > 0 {
        tracing::debug!(
            dropped = collector.stderr.dropped(),
            "stderr capture truncated to its tail"
        );
    }

    let result = classify::build_result(
        collector.observer.into_summary(),
        &stderr_text,
        collector.benign_seen,
        stream_error.as_deref(),
        exit_code,
        limits.useful_output_threshold,
    );
    tracing::debug!(
        elapsed_ms = started_at.elapsed().as_millis() as u64,
        exit_code,
        malformed_lines,
        "runtime finished"
    );
    Ok(result)
}

/// Streaming → stderr grace → exit. Returns the process exit code.
async fn drive(
    session: &mut dyn RunnerSession,
    line_rx: &mut mpsc::Receiver<PumpMsg>,
    collector: &mut Collector,
    limits: &RuntimeLimits,
) -> Result<i32, RunnerError> {
    while collector.stdout_open {
        match line_rx.recv().await {
            Some(msg) => collector.apply(msg),
            None => collector.close_all(),
        }
    }

    if collector.stderr_open {
        let drained = tokio::time::timeout(limits.stderr_grace, async {
            while collector.stderr_open {
                match line_rx.recv().await {
                    Some(msg) => collector.apply(msg),
                    None => collector.close_all(),
                }
            }
        })
        .await;
        if drained.is_err() {
            tracing::debug!(
                grace_ms = limits.stderr_grace.as_millis() as u64,
                "stderr still open after grace period, abandoning it"
            );
        }
    }

    match tokio::time::timeout(limits.exit_grace, session.wait()).await {
        Ok(code) => Ok(code?),
        Err(_) => {
            tracing::warn!(
                grace_ms = limits.exit_grace.as_millis() as u64,
                "process still running after stdout closed, killing it"
            );
            session.kill().await?;
            Ok(session.wait().await?)
        }
    }
}
