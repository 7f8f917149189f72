use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use subagent_core::config::RunnerConfig;
use subagent_core::runner::{
    run_session_runtime, AgentRunner, InvokeRequest, RunnerPlugin, RunnerSession,
    RunnerStartArgs, RuntimeLimits, NO_EXIT_CODE,
};
use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream};

#[derive(Clone, Copy)]
enum Pipe {
    CloseAfterWrite,
    KeepOpen,
}

#[derive(Clone, Copy)]
enum Exit {
    Code(i32),
    /// Never exits on its own; only a kill ends it.
    Hang,
    /// The exit status cannot be collected.
    WaitFails,
}

struct FakeSession {
    stdout: Option<DuplexStream>,
    stderr: Option<DuplexStream>,
    exit: Exit,
    killed: Arc<Mutex<bool>>,
}

#[async_trait]
impl RunnerSession for FakeSession {
    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    async fn kill(&mut self) -> anyhow::Result<()> {
        *self.killed.lock().unwrap() = true;
        Ok(())
    }

    async fn wait(&mut self) -> anyhow::Result<i32> {
        if *self.killed.lock().unwrap() {
            return Ok(NO_EXIT_CODE);
        }
        match self.exit {
            Exit::Code(code) => Ok(code),
            Exit::Hang => std::future::pending().await,
            Exit::WaitFails => anyhow::bail!("no child process"),
        }
    }
}

fn feed(text: String, pipe: Pipe) -> DuplexStream {
    let (mut wr, rd) = tokio::io::duplex(64 * 1024);
    tokio::spawn(async move {
        let _ = wr.write_all(text.as_bytes()).await;
        if let Pipe::KeepOpen = pipe {
            let _held = wr;
            std::future::pending::<()>().await;
        }
    });
    rd
}

struct Script {
    stdout: Vec<String>,
    stdout_pipe: Pipe,
    stderr: String,
    stderr_pipe: Pipe,
    exit: Exit,
}

impl Script {
    fn new(stdout: &[&str], exit: Exit) -> Self {
        Self {
            stdout: stdout.iter().map(|s| s.to_string()).collect(),
            stdout_pipe: Pipe::CloseAfterWrite,
            stderr: String::new(),
            stderr_pipe: Pipe::CloseAfterWrite,
            exit,
        }
    }

    fn stderr(mut self, text: &str, pipe: Pipe) -> Self {
        self.stderr = text.to_string();
        self.stderr_pipe = pipe;
        self
    }

    fn keep_stdout_open(mut self) -> Self {
        self.stdout_pipe = Pipe::KeepOpen;
        self
    }

    fn session(&self) -> (FakeSession, Arc<Mutex<bool>>) {
        let mut out = self.stdout.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        let killed = Arc::new(Mutex::new(false));
        let session = FakeSession {
            stdout: Some(feed(out, self.stdout_pipe)),
            stderr: Some(feed(self.stderr.clone(), self.stderr_pipe)),
            exit: self.exit,
            killed: killed.clone(),
        };
        (session, killed)
    }
}

fn fast_limits() -> RuntimeLimits {
    RuntimeLimits {
        stderr_grace: Duration::from_millis(100),
        exit_grace: Duration::from_millis(100),
        ..RuntimeLimits::default()
    }
}

const INIT: &str = r#"{"type":"system","subtype":"init","session_id":"sess-1","model":"auto","cwd":"/w"}"#;
const RESULT: &str = r#"{"type":"result","subtype":"success","duration_ms":4200}"#;

fn assistant(text: &str) -> String {
    serde_json::json!({
        "type": "assistant",
        "message": {"content": [{"type": "text", "text": text}]}
    })
    .to_string()
}

#[tokio::test]
async fn happy_path_extracts_final_json() {
    let answer = assistant("Done.\n```json\n{\"status\": \"ok\", \"files\": 2}\n```");
    let script = Script::new(
        &[
            INIT,
            r#"{"type":"thinking","text":"..."}"#,
            "not json at all",
            &answer,
            RESULT,
        ],
        Exit::Code(0),
    );
    let (session, _) = script.session();

    let res = run_session_runtime(Box::new(session), &fast_limits(), None)
        .await
        .unwrap();

    assert!(res.success);
    assert_eq!(res.return_code, 0);
    assert_eq!(res.output, r#"{"status": "ok", "files": 2}"#);
    assert_eq!(res.error, None);
    assert_eq!(res.session_id.as_deref(), Some("sess-1"));
    assert_eq!(res.duration_ms, Some(4200));
    let types: Vec<&str> = res.events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, vec!["system", "assistant", "result"]);
}

#[tokio::test]
async fn benign_transport_error_with_useful_output_succeeds() {
    let answer = assistant(&"The refactoring is complete and all tests pass. ".repeat(2));
    let script = Script::new(&[INIT, &answer], Exit::Code(1))
        .stderr("Error: Premature close\n", Pipe::CloseAfterWrite);
    let (session, _) = script.session();

    let res = run_session_runtime(Box::new(session), &fast_limits(), None)
        .await
        .unwrap();

    assert!(res.success);
    assert_eq!(res.return_code, 1);
    assert_eq!(res.error, None);
}

#[tokio::test]
async fn genuine_failure_reports_stderr() {
    let script = Script::new(&[INIT], Exit::Code(2))
        .stderr("Error: not authenticated\n", Pipe::CloseAfterWrite);
    let (session, _) = script.session();

    let res = run_session_runtime(Box::new(session), &fast_limits(), None)
        .await
        .unwrap();

    assert!(!res.success);
    assert_eq!(res.return_code, 2);
    assert_eq!(res.error.as_deref(), Some("Error: not authenticated"));
}

#[tokio::test]
async fn timeout_kills_and_keeps_partial_output() {
    let partial = assistant("half an answer");
    let script = Script::new(&[INIT, &partial], Exit::Hang).keep_stdout_open();
    let (session, killed) = script.session();

    let res = run_session_runtime(
        Box::new(session),
        &fast_limits(),
        Some(Duration::from_millis(200)),
    )
    .await
    .unwrap();

    assert!(!res.success);
    assert_eq!(res.return_code, NO_EXIT_CODE);
    assert_eq!(res.error.as_deref(), Some("Timeout after 0.2s"));
    assert_eq!(res.output, "half an answer");
    assert_eq!(res.session_id.as_deref(), Some("sess-1"));
    assert!(*killed.lock().unwrap());
}

#[tokio::test]
async fn stuck_stderr_is_abandoned_after_grace() {
    let script = Script::new(&[INIT, &assistant("ok")], Exit::Code(0))
        .stderr("still talking\n", Pipe::KeepOpen);
    let (session, _) = script.session();

    let started = Instant::now();
    let res = run_session_runtime(Box::new(session), &fast_limits(), None)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(res.success);
    assert_eq!(res.output, "ok");
}

#[tokio::test]
async fn lingering_process_is_force_killed() {
    let script = Script::new(&[INIT], Exit::Hang);
    let (session, killed) = script.session();

    let res = run_session_runtime(Box::new(session), &fast_limits(), None)
        .await
        .unwrap();

    assert!(*killed.lock().unwrap());
    assert!(!res.success);
    assert_eq!(res.return_code, NO_EXIT_CODE);
    assert_eq!(
        res.error.as_deref(),
        Some("cursor-agent exited with code -1")
    );
}

#[tokio::test]
async fn oversized_line_does_not_abort_the_stream() {
    let huge = format!(r#"{{"type":"assistant","blob":"{}"}}"#, "x".repeat(4096));
    let script = Script::new(&[INIT, &huge, &assistant("after the blob")], Exit::Code(3));
    let (session, _) = script.session();
    let limits = RuntimeLimits {
        max_line_bytes: 1024,
        ..fast_limits()
    };

    let res = run_session_runtime(Box::new(session), &limits, None)
        .await
        .unwrap();

    assert_eq!(res.output, "after the blob");
    assert_eq!(res.events.len(), 2);
    let error = res.error.unwrap_or_default();
    assert!(error.contains("exceeded the line limit"), "{error}");
}

#[tokio::test]
async fn empty_stream_with_zero_exit_is_success() {
    let script = Script::new(&[], Exit::Code(0));
    let (session, _) = script.session();

    let res = run_session_runtime(Box::new(session), &fast_limits(), None)
        .await
        .unwrap();

    assert!(res.success);
    assert_eq!(res.output, "");
    assert!(res.events.is_empty());
    assert_eq!(res.session_id, None);
}

#[tokio::test]
async fn benign_signature_counts_after_it_leaves_the_stderr_tail() {
    let answer = assistant(&"The migration ran and every table was verified. ".repeat(2));
    let mut stderr = String::from("Error: Premature close\n");
    for n in 0..64 {
        stderr.push_str(&format!("debug: retrying stream chunk number {n} of the transport layer\n"));
    }
    let script =
        Script::new(&[INIT, &answer], Exit::Code(1)).stderr(&stderr, Pipe::CloseAfterWrite);
    let (session, _) = script.session();
    let limits = RuntimeLimits {
        stderr_capture_bytes: 512,
        ..fast_limits()
    };

    let res = run_session_runtime(Box::new(session), &limits, None)
        .await
        .unwrap();

    assert!(res.success, "{res:?}");
    assert_eq!(res.return_code, 1);
    let error = res.error.unwrap_or_default();
    assert!(error.starts_with("debug: retrying stream chunk number"), "{error}");
    assert!(!error.contains("Premature close"));
}

#[tokio::test]
async fn failed_wait_keeps_what_was_streamed() {
    let script = Script::new(&[INIT, &assistant("partial work")], Exit::WaitFails);
    let (session, _) = script.session();

    let res = run_session_runtime(Box::new(session), &fast_limits(), None)
        .await
        .unwrap();

    assert!(!res.success);
    assert_eq!(res.return_code, NO_EXIT_CODE);
    assert_eq!(res.output, "partial work");
    assert_eq!(res.session_id.as_deref(), Some("sess-1"));
    assert_eq!(res.events.len(), 2);
    let error = res.error.unwrap_or_default();
    assert!(error.contains("no child process"), "{error}");
}

struct RecordingPlugin {
    script: Script,
    seen: Mutex<Option<RunnerStartArgs>>,
}

#[async_trait]
impl RunnerPlugin for RecordingPlugin {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start_session(
        &self,
        args: &RunnerStartArgs,
    ) -> anyhow::Result<Box<dyn RunnerSession>> {
        *self.seen.lock().unwrap() = Some(args.clone());
        let (session, _) = self.script.session();
        Ok(Box::new(session))
    }
}

struct FailingPlugin;

#[async_trait]
impl RunnerPlugin for FailingPlugin {
    fn name(&self) -> &str {
        "failing"
    }

    async fn start_session(
        &self,
        _args: &RunnerStartArgs,
    ) -> anyhow::Result<Box<dyn RunnerSession>> {
        anyhow::bail!("permission denied")
    }
}

#[tokio::test]
async fn runner_builds_command_and_runs_session() {
    let cwd = tempfile::tempdir().unwrap();
    let plugin = Arc::new(RecordingPlugin {
        script: Script::new(&[INIT, &assistant("done")], Exit::Code(0)),
        seen: Mutex::new(None),
    });
    let runner = AgentRunner::new(&RunnerConfig::default(), plugin.clone());

    let req = InvokeRequest::new("You are a tester.", "write tests", "sonnet", cwd.path())
        .with_context("crate: core")
        .with_role("tester");
    let res = runner
        .run_with(std::path::Path::new("/opt/cursor-agent"), req)
        .await;

    assert!(res.success);
    assert_eq!(res.output, "done");

    let seen = plugin.seen.lock().unwrap().clone().unwrap();
    assert_eq!(seen.cmd, "/opt/cursor-agent");
    assert_eq!(seen.cwd.as_deref(), Some(cwd.path()));
    let workspace = cwd.path().to_string_lossy().into_owned();
    assert_eq!(
        seen.args,
        vec![
            "--print".to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--model".to_string(),
            "sonnet".to_string(),
            "--workspace".to_string(),
            workspace,
            "-f".to_string(),
            "You are a tester.\n\n## CONTEXT\n\ncrate: core\n\n## TASK\n\nwrite tests".to_string(),
        ]
    );
}

#[tokio::test]
async fn spawn_failure_becomes_failed_result() {
    let cwd = tempfile::tempdir().unwrap();
    let runner = AgentRunner::new(&RunnerConfig::default(), Arc::new(FailingPlugin));

    let res = runner
        .run_with(
            std::path::Path::new("/opt/cursor-agent"),
            InvokeRequest::new("sys", "task", "auto", cwd.path()),
        )
        .await;

    assert!(!res.success);
    assert_eq!(res.return_code, NO_EXIT_CODE);
    let error = res.error.unwrap();
    assert!(error.contains("permission denied"), "{error}");
}

#[tokio::test]
async fn missing_working_directory_is_reported() {
    let runner = AgentRunner::new(&RunnerConfig::default(), Arc::new(FailingPlugin));

    let res = runner
        .run_with(
            std::path::Path::new("/opt/cursor-agent"),
            InvokeRequest::new("sys", "task", "auto", "/definitely/not/a/dir"),
        )
        .await;

    assert!(!res.success);
    assert_eq!(res.return_code, NO_EXIT_CODE);
    assert!(res.error.unwrap().contains("working directory does not exist"));
}
