//! CLI subcommand implementations.
//!
//! Commands return `Ok(Err(refusal))` when the engine declined to act. That
//! is not a failure: the caller reports it and exits successfully.

use punch_core::Refusal;

/// Whether the engine applied a command.
pub type Outcome = Result<(), Refusal>;

/// Unwraps an engine result, or returns its refusal as the command outcome.
macro_rules! applied {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(refusal) => return Ok(Err(refusal)),
        }
    };
}

pub mod entries;
pub mod queue;
pub mod status;
pub mod timer;
pub mod util;
