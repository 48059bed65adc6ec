//! Structured invocation of external tools.
//!
//! Stage actions never build shell strings: a command is an explicit
//! program, argument list, working directory, and environment, which
//! removes quoting and injection hazards from the pipeline boundary.

mod command;

pub use command::{run_command, CommandOutcome, CommandSpec};
