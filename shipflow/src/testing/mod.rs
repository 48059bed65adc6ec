//! Test support: recording actions, fault injection, and fixtures.

pub mod actions;
pub mod fixtures;

pub use actions::{CountingFinalizer, FailingAction, RecordingAction, SleepAction};
pub use fixtures::{failing_stage, ok_stage, sleeping_stage, static_variables};
