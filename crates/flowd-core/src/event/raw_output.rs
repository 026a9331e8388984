//! Demuxes `step.log` events into undecorated per-channel writers —
//! the raw `stdout`/`stderr` files next to a run's `events.ndjson`.

use std::io::Write;
use std::sync::Mutex;

use crate::event::sink::Sink;
use crate::event::types::Channel;

pub struct RawOutputSink<O: Write + Send, E: Write + Send> {
    stdout: Mutex<O>,
    stderr: Mutex<E>,
}

impl<O: Write + Send, E: Write + Send> RawOutputSink<O, E> {
    pub fn new(stdout: O, stderr: E) -> Self {
        Self {
            stdout: Mutex::new(stdout),
            stderr: Mutex::new(stderr),
        }
    }
}

impl<O: Write + Send, E: Write + Send> Sink for RawOutputSink<O, E> {
    fn emit_run_start(&self, _run_id: &str, _job_id: &str) {}
    fn emit_run_finish(&self, _run_id: &str, _status: &str, _err: Option<&str>) {}
    fn emit_step_start(&self, _run_id: &str, _step: &str) {}
    fn emit_step_finish(&self, _run_id: &str, _step: &str, _exit_code: Option<i32>, _err: Option<&str>) {}

    fn emit_step_log(&self, _run_id: &str, _step: &str, channel: Channel, message: &str) {
        match channel {
            Channel::Stdout => {
                let mut w = self.stdout.lock().expect("raw stdout writer mutex poisoned");
                let _ = writeln!(w, "{message}");
            }
            Channel::Stderr => {
                let mut w = self.stderr.lock().expect("raw stderr writer mutex poisoned");
                let _ = writeln!(w, "{message}");
            }
        }
    }
}
