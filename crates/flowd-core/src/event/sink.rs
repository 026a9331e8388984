//! The `Sink` trait every event consumer implements, and the composite
//! sink that fans a run's events out to zero or more of them.

use std::sync::Arc;

use crate::event::types::Channel;

pub trait Sink: Send + Sync {
    fn emit_run_start(&self, run_id: &str, job_id: &str);
    fn emit_run_finish(&self, run_id: &str, status: &str, err: Option<&str>);
    fn emit_step_start(&self, run_id: &str, step: &str);
    fn emit_step_finish(&self, run_id: &str, step: &str, exit_code: Option<i32>, err: Option<&str>);
    fn emit_step_log(&self, run_id: &str, step: &str, channel: Channel, message: &str);
}

/// Lets an `Arc<dyn Sink>` (or `Arc<ConcreteSink>`) be used anywhere a
/// `Box<dyn Sink>` child is expected, e.g. as a `CompositeSink` child
/// alongside the same `Arc` a caller keeps around for its own use (such
/// as subscribing to a broadcast sink after handing it to the engine).
impl<T: Sink + ?Sized> Sink for Arc<T> {
    fn emit_run_start(&self, run_id: &str, job_id: &str) {
        (**self).emit_run_start(run_id, job_id);
    }
    fn emit_run_finish(&self, run_id: &str, status: &str, err: Option<&str>) {
        (**self).emit_run_finish(run_id, status, err);
    }
    fn emit_step_start(&self, run_id: &str, step: &str) {
        (**self).emit_step_start(run_id, step);
    }
    fn emit_step_finish(&self, run_id: &str, step: &str, exit_code: Option<i32>, err: Option<&str>) {
        (**self).emit_step_finish(run_id, step, exit_code, err);
    }
    fn emit_step_log(&self, run_id: &str, step: &str, channel: Channel, message: &str) {
        (**self).emit_step_log(run_id, step, channel, message);
    }
}

/// Fans out to zero or more children. Zero children collapses to a
/// no-op with no per-event allocation.
pub struct CompositeSink {
    children: Vec<Box<dyn Sink>>,
}

impl CompositeSink {
    pub fn new(children: Vec<Box<dyn Sink>>) -> Self {
        Self { children }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Sink for CompositeSink {
    fn emit_run_start(&self, run_id: &str, job_id: &str) {
        for child in &self.children {
            child.emit_run_start(run_id, job_id);
        }
    }

    fn emit_run_finish(&self, run_id: &str, status: &str, err: Option<&str>) {
        for child in &self.children {
            child.emit_run_finish(run_id, status, err);
        }
    }

    fn emit_step_start(&self, run_id: &str, step: &str) {
        for child in &self.children {
            child.emit_step_start(run_id, step);
        }
    }

    fn emit_step_finish(&self, run_id: &str, step: &str, exit_code: Option<i32>, err: Option<&str>) {
        for child in &self.children {
            child.emit_step_finish(run_id, step, exit_code, err);
        }
    }

    fn emit_step_log(&self, run_id: &str, step: &str, channel: Channel, message: &str) {
        for child in &self.children {
            child.emit_step_log(run_id, step, channel, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSink(Arc<AtomicUsize>);

    impl Sink for CountingSink {
        fn emit_run_start(&self, _run_id: &str, _job_id: &str) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn emit_run_finish(&self, _run_id: &str, _status: &str, _err: Option<&str>) {}
        fn emit_step_start(&self, _run_id: &str, _step: &str) {}
        fn emit_step_finish(&self, _run_id: &str, _step: &str, _exit_code: Option<i32>, _err: Option<&str>) {}
        fn emit_step_log(&self, _run_id: &str, _step: &str, _channel: Channel, _message: &str) {}
    }

    #[test]
    fn empty_composite_is_a_no_op() {
        let composite = CompositeSink::new(Vec::new());
        assert!(composite.is_empty());
        composite.emit_run_start("r1", "job1");
    }

    #[test]
    fn composite_fans_out_to_every_child() {
        let counter = Arc::new(AtomicUsize::new(0));
        let composite = CompositeSink::new(vec![
            Box::new(CountingSink(counter.clone())),
            Box::new(CountingSink(counter.clone())),
        ]);
        composite.emit_run_start("r1", "job1");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
