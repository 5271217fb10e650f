//! Per-line output accumulator.
//!
//! A [`Sink`] collects everything a pipeline writes on two channels. Each
//! chunk is tagged with a marker from one per-sink counter, so the merged
//! [`Sink::output`] replays writes in the order they actually happened even
//! though the channels are stored apart.

#[derive(Debug, Clone)]
struct Chunk {
    marker: u64,
    data: String,
}

/// Dual-channel (stdout/stderr) output buffer for one accepted line.
#[derive(Debug, Default)]
pub struct Sink {
    next_marker: u64,
    stdout: Vec<Chunk>,
    stderr: Vec<Chunk>,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    fn tag(&mut self, data: impl Into<String>) -> Chunk {
        let marker = self.next_marker;
        self.next_marker += 1;
        Chunk {
            marker,
            data: data.into(),
        }
    }

    /// Append to stdout.
    pub fn write(&mut self, data: impl Into<String>) {
        let chunk = self.tag(data);
        self.stdout.push(chunk);
    }

    /// Append to stderr.
    pub fn error(&mut self, data: impl Into<String>) {
        let chunk = self.tag(data);
        self.stderr.push(chunk);
    }

    /// Concatenated stdout.
    pub fn stdout(&self) -> String {
        concat(&self.stdout)
    }

    /// Concatenated stderr.
    pub fn stderr(&self) -> String {
        concat(&self.stderr)
    }

    /// Replace stdout with `data`, leaving stderr untouched.
    pub fn set_stdout(&mut self, data: impl Into<String>) {
        self.stdout.clear();
        self.write(data);
    }

    /// Drop everything written to stdout so far.
    pub fn clear_stdout(&mut self) {
        self.stdout.clear();
    }

    /// Both channels merged in write order.
    pub fn output(&self) -> String {
        let mut out = String::new();
        let (mut i, mut j) = (0, 0);
        while i < self.stdout.len() || j < self.stderr.len() {
            let take_stdout = match (self.stdout.get(i), self.stderr.get(j)) {
                (Some(a), Some(b)) => a.marker < b.marker,
                (Some(_), None) => true,
                _ => false,
            };
            if take_stdout {
                out.push_str(&self.stdout[i].data);
                i += 1;
            } else {
                out.push_str(&self.stderr[j].data);
                j += 1;
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }

    /// Clear both channels.
    pub fn reset(&mut self) {
        self.stdout.clear();
        self.stderr.clear();
    }
}

fn concat(chunks: &[Chunk]) -> String {
    chunks.iter().map(|c| c.data.as_str()).collect()
}
