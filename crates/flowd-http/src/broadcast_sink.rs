//! A `Sink` that republishes every call as a `RunEvent` onto a
//! `tokio::sync::broadcast` channel, which the SSE and NDJSON route
//! handlers subscribe to.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use flowd_core::{Channel, EventType, RunEvent, Sink};
use tokio::sync::broadcast;

pub struct BroadcastSink {
    next_seq: AtomicI64,
    sender: Mutex<broadcast::Sender<RunEvent>>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            next_seq: AtomicI64::new(1),
            sender: Mutex::new(sender),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.lock().expect("broadcast sink mutex poisoned").subscribe()
    }

    fn publish(&self, run_id: &str, event_type: EventType, step: Option<&str>, channel: Option<Channel>, message: Option<&str>, data: Option<serde_json::Value>) {
        let sequence = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let event = RunEvent {
            sequence,
            timestamp: Utc::now(),
            event_type,
            run_id: run_id.to_string(),
            step: step.map(str::to_string),
            channel,
            message: message.map(str::to_string),
            data,
        };
        let _ = self.sender.lock().expect("broadcast sink mutex poisoned").send(event);
    }
}

impl Sink for BroadcastSink {
    fn emit_run_start(&self, run_id: &str, job_id: &str) {
        self.publish(run_id, EventType::RunStart, None, None, Some(job_id), None);
    }

    fn emit_run_finish(&self, run_id: &str, status: &str, err: Option<&str>) {
        self.publish(
            run_id,
            EventType::RunFinish,
            None,
            None,
            Some(status),
            err.map(|e| serde_json::json!({ "error": e })),
        );
    }

    fn emit_step_start(&self, run_id: &str, step: &str) {
        self.publish(run_id, EventType::StepStart, Some(step), None, None, None);
    }

    fn emit_step_finish(&self, run_id: &str, step: &str, exit_code: Option<i32>, err: Option<&str>) {
        self.publish(
            run_id,
            EventType::StepFinish,
            Some(step),
            None,
            err,
            exit_code.map(|c| serde_json::json!({ "exit_code": c })),
        );
    }

    fn emit_step_log(&self, run_id: &str, step: &str, channel: Channel, message: &str) {
        self.publish(run_id, EventType::StepLog, Some(step), Some(channel), Some(message), None);
    }
}
