//! Stage definitions: actions, gates, policies, and execution context.

mod action;
mod context;
mod def;
mod gate;

pub use action::{CommandAction, FnAction, StageAction};
pub use context::StageContext;
pub use def::{FailurePolicy, StageDef};
pub use gate::Gate;
