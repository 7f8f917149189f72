use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::error::RunnerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStream {
    Stdout,
    Stderr,
}

impl LineStream {
    pub fn label(self) -> &'static str {
        match self {
            LineStream::Stdout => "stdout",
            LineStream::Stderr => "stderr",
        }
    }
}

/// What a pump forwards to the coordinator, in read order.
#[derive(Debug)]
pub enum PumpMsg {
    Line { stream: LineStream, line: String },
    /// A line exceeded the limit and was dropped up to its newline.
    Oversized { stream: LineStream, bytes: usize },
    /// Terminal message; `error` is set for non-transport read failures.
    Closed {
        stream: LineStream,
        error: Option<String>,
    },
}

/// Handle to a running pump; aborting it stops reading immediately.
#[derive(Debug)]
pub struct PumpHandle {
    abort: AbortHandle,
}

impl PumpHandle {
    pub fn abort(&self) {
        self.abort.abort();
    }
}

pub fn pump_stdout<R>(rd: R, max_line_bytes: usize, tx: mpsc::Sender<PumpMsg>) -> PumpHandle
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pump(rd, LineStream::Stdout, max_line_bytes, tx)
}

pub fn pump_stderr<R>(rd: R, max_line_bytes: usize, tx: mpsc::Sender<PumpMsg>) -> PumpHandle
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pump(rd, LineStream::Stderr, max_line_bytes, tx)
}

fn pump<R>(
    rd: R,
    stream: LineStream,
    max_line_bytes: usize,
    tx: mpsc::Sender<PumpMsg>,
) -> PumpHandle
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let reader = tokio::spawn(read_lines(rd, stream, max_line_bytes, tx.clone()));
    let abort = reader.abort_handle();

    // A panicking reader never sends `Closed`; report it on its behalf.
    tokio::spawn(async move {
        match reader.await {
            Ok(total) => tracing::trace!(stream = stream.label(), bytes = total, "pump finished"),
            Err(e) if e.is_panic() => {
                tracing::error!(stream = stream.label(), "pump task panicked");
                let _ = tx
                    .send(PumpMsg::Closed {
                        stream,
                        error: Some(format!("{} reader panicked", stream.label())),
                    })
                    .await;
            }
            Err(_) => {}
        }
    });

    PumpHandle { abort }
}

async fn read_lines<R>(
    mut rd: R,
    stream: LineStream,
    max_line_bytes: usize,
    tx: mpsc::Sender<PumpMsg>,
) -> u64
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut buf = vec![0u8; 16 * 1024];
    let mut total = 0u64;
    let mut splitter = LineSplitter::new(max_line_bytes);
    let mut error = None;

    loop {
        let n = match rd.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if is_transport_close(&e) => {
                tracing::debug!(stream = stream.label(), error = %e, "stream closed by peer");
                break;
            }
            Err(e) => {
                tracing::warn!(stream = stream.label(), error = %e, "stream read failed");
                let err = RunnerError::StreamIo {
                    stream: stream.label(),
                    source: e,
                };
                error = Some(err.to_string());
                break;
            }
        };
        total += n as u64;

        for piece in splitter.feed(&buf[..n]) {
            if tx.send(piece.into_msg(stream)).await.is_err() {
                // Coordinator is gone; nothing left to deliver to.
                return total;
            }
        }
    }

    if let Some(piece) = splitter.finish() {
        let _ = tx.send(piece.into_msg(stream)).await;
    }
    let _ = tx.send(PumpMsg::Closed { stream, error }).await;
    total
}

fn is_transport_close(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
    )
}

#[derive(Debug, PartialEq)]
enum Piece {
    Line(String),
    Oversized(usize),
}

impl Piece {
    fn into_msg(self, stream: LineStream) -> PumpMsg {
        match self {
            Piece::Line(line) => PumpMsg::Line { stream, line },
            Piece::Oversized(bytes) => PumpMsg::Oversized { stream, bytes },
        }
    }
}

/// Splits a byte stream on `\n`, bounding memory per line.
struct LineSplitter {
    max: usize,
    buf: Vec<u8>,
    /// Bytes dropped from the current over-long line, if any.
    skipped: Option<usize>,
}

impl LineSplitter {
    fn new(max: usize) -> Self {
        Self {
            max: max.max(1),
            buf: Vec::with_capacity(8 * 1024),
            skipped: None,
        }
    }

    fn feed(&mut self, mut data: &[u8]) -> Vec<Piece> {
        let mut out = Vec::new();
        while !data.is_empty() {
            let nl = data.iter().position(|&b| b == b'\n');
            let (chunk, rest, ended) = match nl {
                Some(pos) => (&data[..pos], &data[pos + 1..], true),
                None => (data, &data[data.len()..], false),
            };
            data = rest;

            if let Some(skipped) = self.skipped.as_mut() {
                *skipped += chunk.len();
            } else if self.buf.len() + chunk.len() > self.max {
                self.skipped = Some(self.buf.len() + chunk.len());
                self.buf.clear();
            } else {
                self.buf.extend_from_slice(chunk);
            }

            if ended {
                out.push(self.take());
            }
        }
        out
    }

    fn finish(&mut self) -> Option<Piece> {
        if self.skipped.is_none() && self.buf.is_empty() {
            return None;
        }
        Some(self.take())
    }

    fn take(&mut self) -> Piece {
        if let Some(bytes) = self.skipped.take() {
            return Piece::Oversized(bytes);
        }
        let mut line = std::mem::take(&mut self.buf);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Piece::Line(String::from_utf8_lossy(&line).into_owned())
    }
}
