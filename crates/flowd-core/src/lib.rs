//! Job model, argument binder, plan builder, event pipeline, discovery,
//! container adapter, and execution engine for flowd.

pub mod args;
pub mod artifacts;
pub mod config;
pub mod container;
pub mod discovery;
pub mod engine;
pub mod errors;
pub mod event;
pub mod plan;

pub use args::{bind, ArgSchema, ArgSpec, ArgType, Binding, FlagBag};
pub use artifacts::{create_run_dir, create_secure_file, write_secure_file};
pub use config::{load_config, Config};
pub use discovery::{discover, DiscoveredJob, DiscoveryResult};
pub use engine::{run_scripts, EngineError, ExecConfig, StepResult};
pub use event::{render_text, Channel, CompositeSink, EventType, NdjsonEmitter, RawOutputSink, RunEvent, Sink, TextEmitter};
pub use plan::{build_plan, ImageTrustPreview, Plan};
