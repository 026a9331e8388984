//! The step writer: buffers bytes, flushes complete lines to a log
//! sink while mirroring raw bytes to an underlying writer (file +
//! console), and redacts secrets from flushed lines only.

use std::io::Write;
use std::sync::Arc;

use flowd_common::redact::redact_line;

use crate::event::sink::Sink;
use crate::event::types::Channel;

/// Flushes complete lines from `on_line`, redacting `secret_values`
/// first. A trailing partial line is held until `finish` is called.
pub struct StepWriter<M: Write> {
    run_id: String,
    step: String,
    channel: Channel,
    sink: Arc<dyn Sink>,
    mirror: M,
    secret_values: Vec<String>,
    buffer: Vec<u8>,
}

impl<M: Write> StepWriter<M> {
    pub fn new(run_id: impl Into<String>, step: impl Into<String>, channel: Channel, sink: Arc<dyn Sink>, mirror: M, secret_values: Vec<String>) -> Self {
        Self {
            run_id: run_id.into(),
            step: step.into(),
            channel,
            sink,
            mirror,
            secret_values,
            buffer: Vec::new(),
        }
    }

    fn flush_line(&mut self, line: &[u8]) {
        let text = String::from_utf8_lossy(line);
        let redacted = redact_line(&text, &self.secret_values);
        self.sink
            .emit_step_log(&self.run_id, &self.step, self.channel, &redacted);
    }

    /// Flushes whatever remains in the buffer as a final partial line.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            let remaining = std::mem::take(&mut self.buffer);
            self.flush_line(&remaining);
        }
        let _ = self.mirror.flush();
    }
}

impl<M: Write> Write for StepWriter<M> {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.mirror.write_all(data)?;
        self.buffer.extend_from_slice(data);
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let trimmed = &line[..line.len() - 1];
            self.flush_line(trimmed);
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.mirror.flush()
    }
}
