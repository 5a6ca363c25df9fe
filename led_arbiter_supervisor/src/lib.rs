//! led_arbiter_supervisor
//!
//! Outside-world facing layer around `led_arbiter_core`:
//! - parse console input into requests
//! - feed requests to the engine one at a time
//! - concrete outputs and logging setup for the `led-arbiter` binary

pub mod adapter;
pub mod error;
pub mod logging;
pub mod output;
pub mod supervisor;

pub use adapter::{forward_lines, parse_line, Action, ConsoleInput, Request, Target};
pub use error::{Error, Result};
pub use output::{ConsoleOutput, RecordingOutput};
pub use supervisor::{IndicatorSupervisor, RunStats};
