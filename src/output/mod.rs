//! Append-only execution log sink.
//!
//! Command execution, rate-limit waits, and cache activity are mirrored to a
//! sink for audit. The sink is advisory: the core never reads it back.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

/// Append-only text sink for audit output.
pub trait ExecutionSink: Send + Sync {
    fn append(&self, line: &str);
}

/// Shared handle to a sink, cloned into every component that logs.
pub type SharedSink = Arc<dyn ExecutionSink>;

/// Sink that forwards every line to the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ExecutionSink for TracingSink {
    fn append(&self, line: &str) {
        info!(target: "conductor::audit", "{}", line);
    }
}

/// Sink that retains lines in memory. Used by tests and by UIs that render
/// the log themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl ExecutionSink for MemorySink {
    fn append(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

/// Sink that writes lines to any `Write` target, one per line.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> ExecutionSink for WriterSink<W> {
    fn append(&self, line: &str) {
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "{}", line);
        let _ = writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_retains_lines_in_order() {
        let sink = MemorySink::new();
        sink.append("first");
        sink.append("second");
        assert_eq!(sink.lines(), vec!["first", "second"]);
    }

    #[test]
    fn writer_sink_appends_newline() {
        let sink = WriterSink::new(Vec::new());
        sink.append("hello");
        let buf = sink.writer.into_inner();
        assert_eq!(String::from_utf8(buf).unwrap(), "hello\n");
    }
}
