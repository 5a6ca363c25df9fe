pub mod color;
pub mod output;
pub mod pattern;

pub mod error;
pub mod cfg;
pub mod state;
pub mod decide;
pub mod engine;

pub use color::Color;
pub use output::{IndicatorOutput, NullOutput};
pub use pattern::{Pattern, PatternKind, Step, StepCfg};

pub use error::{Error, Result};
pub use cfg::{CatalogCfg, IndicatorCfg};
pub use state::{IndicatorState, RunStatus};
pub use decide::{check_invariants, decide_visible};
pub use engine::{ArbitrationEngine, Transition};
