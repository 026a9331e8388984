mod dispatch;
pub mod discover;
pub mod events;
pub mod list;
pub mod plan;
pub mod run;

pub use dispatch::dispatch;
