//! Typed run/stage events and sinks for observability.

mod event;
mod sink;

pub use event::{EventKind, PipelineEvent};
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
