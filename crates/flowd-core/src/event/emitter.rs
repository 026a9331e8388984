//! Text and NDJSON emitters (C5). Both assign `sequence` from a
//! per-emitter monotonic counter under a mutex at emit time and
//! serialize writes under the same mutex so NDJSON output stays
//! line-atomic.

use std::io::Write;
use std::sync::Mutex;

use chrono::Utc;

use crate::event::sink::Sink;
use crate::event::types::{Channel, EventType, RunEvent};

struct SequencedWriter<W: Write + Send> {
    next_seq: i64,
    writer: W,
}

/// Renders a single event the way [`TextEmitter`] does, exposed for
/// callers that replay a persisted NDJSON event log as text.
pub fn render_text(event: &RunEvent) -> String {
    let mut line = format!("[{}] {}", event.sequence, event.event_type.as_str());
    line.push_str(&format!(" [run={}]", event.run_id));
    if let Some(step) = &event.step {
        line.push_str(&format!(" [step={step}]"));
    }
    if let Some(channel) = event.channel {
        let c = match channel {
            Channel::Stdout => "stdout",
            Channel::Stderr => "stderr",
        };
        line.push_str(&format!(" [channel={c}]"));
    }
    if let Some(message) = &event.message {
        line.push_str(&format!(" [msg={message}]"));
    }
    if let Some(data) = &event.data {
        line.push_str(&format!(" [data={data}]"));
    }
    line
}

/// Renders one line of text per event to an underlying writer.
pub struct TextEmitter<W: Write + Send> {
    inner: Mutex<SequencedWriter<W>>,
}

impl<W: Write + Send> TextEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(SequencedWriter {
                next_seq: 1,
                writer,
            }),
        }
    }

    fn emit(&self, run_id: &str, event_type: EventType, step: Option<&str>, channel: Option<Channel>, message: Option<&str>) {
        let mut guard = self.inner.lock().expect("emitter mutex poisoned");
        let sequence = guard.next_seq;
        guard.next_seq += 1;
        let event = RunEvent {
            sequence,
            timestamp: Utc::now(),
            event_type,
            run_id: run_id.to_string(),
            step: step.map(str::to_string),
            channel,
            message: message.map(str::to_string),
            data: None,
        };
        let _ = writeln!(guard.writer, "{}", render_text(&event));
    }
}

impl<W: Write + Send> Sink for TextEmitter<W> {
    fn emit_run_start(&self, run_id: &str, job_id: &str) {
        self.emit(run_id, EventType::RunStart, None, None, Some(job_id));
    }

    fn emit_run_finish(&self, run_id: &str, status: &str, err: Option<&str>) {
        let message = err.map(str::to_string).unwrap_or_else(|| status.to_string());
        self.emit(run_id, EventType::RunFinish, None, None, Some(&message));
    }

    fn emit_step_start(&self, run_id: &str, step: &str) {
        self.emit(run_id, EventType::StepStart, Some(step), None, None);
    }

    fn emit_step_finish(&self, run_id: &str, step: &str, exit_code: Option<i32>, err: Option<&str>) {
        let message = err
            .map(str::to_string)
            .or_else(|| exit_code.map(|c| c.to_string()));
        self.emit(run_id, EventType::StepFinish, Some(step), None, message.as_deref());
    }

    fn emit_step_log(&self, run_id: &str, step: &str, channel: Channel, message: &str) {
        self.emit(run_id, EventType::StepLog, Some(step), Some(channel), Some(message));
    }
}

/// Emits one JSON object per line, fields present only when set.
pub struct NdjsonEmitter<W: Write + Send> {
    inner: Mutex<SequencedWriter<W>>,
}

impl<W: Write + Send> NdjsonEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(SequencedWriter {
                next_seq: 1,
                writer,
            }),
        }
    }

    fn emit(&self, event: RunEvent) {
        let mut guard = self.inner.lock().expect("emitter mutex poisoned");
        let mut event = event;
        event.sequence = guard.next_seq;
        guard.next_seq += 1;
        event.timestamp = Utc::now();
        if let Ok(line) = serde_json::to_string(&event) {
            let _ = writeln!(guard.writer, "{line}");
        }
    }
}

impl<W: Write + Send> Sink for NdjsonEmitter<W> {
    fn emit_run_start(&self, run_id: &str, job_id: &str) {
        self.emit(RunEvent {
            sequence: 0,
            timestamp: Utc::now(),
            event_type: EventType::RunStart,
            run_id: run_id.to_string(),
            step: None,
            channel: None,
            message: Some(job_id.to_string()),
            data: None,
        });
    }

    fn emit_run_finish(&self, run_id: &str, status: &str, err: Option<&str>) {
        self.emit(RunEvent {
            sequence: 0,
            timestamp: Utc::now(),
            event_type: EventType::RunFinish,
            run_id: run_id.to_string(),
            step: None,
            channel: None,
            message: Some(status.to_string()),
            data: err.map(|e| serde_json::json!({ "error": e })),
        });
    }

    fn emit_step_start(&self, run_id: &str, step: &str) {
        self.emit(RunEvent {
            sequence: 0,
            timestamp: Utc::now(),
            event_type: EventType::StepStart,
            run_id: run_id.to_string(),
            step: Some(step.to_string()),
            channel: None,
            message: None,
            data: None,
        });
    }

    fn emit_step_finish(&self, run_id: &str, step: &str, exit_code: Option<i32>, err: Option<&str>) {
        self.emit(RunEvent {
            sequence: 0,
            timestamp: Utc::now(),
            event_type: EventType::StepFinish,
            run_id: run_id.to_string(),
            step: Some(step.to_string()),
            channel: None,
            message: err.map(str::to_string),
            data: exit_code.map(|c| serde_json::json!({ "exit_code": c })),
        });
    }

    fn emit_step_log(&self, run_id: &str, step: &str, channel: Channel, message: &str) {
        self.emit(RunEvent {
            sequence: 0,
            timestamp: Utc::now(),
            event_type: EventType::StepLog,
            run_id: run_id.to_string(),
            step: Some(step.to_string()),
            channel: Some(channel),
            message: Some(message.to_string()),
            data: None,
        });
    }
}
