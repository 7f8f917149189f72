use std::collections::VecDeque;

/// Keeps the last `cap` bytes pushed into it.
#[derive(Debug, Clone)]
pub struct TailBytes {
    inner: VecDeque<u8>,
    cap: usize,
    dropped: u64,
}

impl TailBytes {
    pub fn new(cap: usize) -> Self {
        Self {
            inner: VecDeque::with_capacity(cap.min(64 * 1024)),
            cap,
            dropped: 0,
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        let data = if data.len() > self.cap {
            self.dropped += (data.len() - self.cap) as u64;
            &data[data.len() - self.cap..]
        } else {
            data
        };
        let overflow = self
            .inner
            .len()
            .saturating_add(data.len())
            .saturating_sub(self.cap);
        if overflow > 0 {
            self.inner.drain(..overflow);
            self.dropped += overflow as u64;
        }
        self.inner.extend(data);
    }

    pub fn push_line(&mut self, line: &str) {
        self.push(line.as_bytes());
        self.push(b"\n");
    }

    /// Bytes discarded from the front so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn to_string_lossy(&self) -> String {
        let (a, b) = self.inner.as_slices();
        let mut vec = Vec::with_capacity(a.len() + b.len());
        vec.extend_from_slice(a);
        vec.extend_from_slice(b);
        String::from_utf8_lossy(&vec).into_owned()
    }

    /// Like [`to_string_lossy`](Self::to_string_lossy), but once the front has
    /// been cut it starts at the first complete line.
    pub fn whole_lines_lossy(&self) -> String {
        let text = self.to_string_lossy();
        if self.dropped == 0 {
            return text;
        }
        match text.find('\n') {
            Some(i) => text[i + 1..].to_string(),
            None => String::new(),
        }
    }
}
