//! Event pipeline (C5): sinks, emitters, and the step writer.

pub mod emitter;
pub mod raw_output;
pub mod sink;
pub mod types;
pub mod writer;

pub use emitter::{render_text, NdjsonEmitter, TextEmitter};
pub use raw_output::RawOutputSink;
pub use sink::{CompositeSink, Sink};
pub use types::{Channel, EventType, RunEvent};
pub use writer::StepWriter;
