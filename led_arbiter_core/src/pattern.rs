//! Blink patterns: deterministic (color, hold) sequences played until cancelled.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::color::Color;
use crate::error::{Error, Result};
use crate::output::IndicatorOutput;

/// One emission: show `color`, then hold it for `hold` unless cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub color: Color,
    pub hold: Duration,
}

impl Step {
    pub const fn new(color: Color, hold: Duration) -> Self {
        Self { color, hold }
    }
}

/// Serialized form of a [`Step`] inside a custom pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCfg {
    pub color: Color,
    pub hold_ms: u64,
}

/// The closed set of pattern behaviours an indicator can be bound to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternKind {
    /// Red 2.4s, Blue 1.2s, repeating.
    AlternatingA,
    /// Green 0.5s, Off 1.0s, repeating.
    AlternatingB,
    /// Show one color once; the color is held until the indicator is stopped.
    SinglePulse { color: Color },
    Custom {
        steps: Vec<StepCfg>,
        #[serde(default = "default_repeat")]
        repeat: bool,
    },
}

fn default_repeat() -> bool {
    true
}

impl PatternKind {
    /// Build the concrete step table for this kind.
    pub fn pattern(&self) -> Pattern {
        match self {
            PatternKind::AlternatingA => Pattern::repeating(vec![
                Step::new(Color::Red, Duration::from_millis(2400)),
                Step::new(Color::Blue, Duration::from_millis(1200)),
            ]),
            PatternKind::AlternatingB => Pattern::repeating(vec![
                Step::new(Color::Green, Duration::from_millis(500)),
                Step::new(Color::Off, Duration::from_millis(1000)),
            ]),
            PatternKind::SinglePulse { color } => {
                Pattern::once(vec![Step::new(*color, Duration::ZERO)])
            }
            PatternKind::Custom { steps, repeat } => Pattern {
                steps: steps
                    .iter()
                    .map(|s| Step::new(s.color, Duration::from_millis(s.hold_ms)))
                    .collect(),
                repeat: *repeat,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let PatternKind::Custom { steps, repeat } = self {
            if steps.is_empty() {
                return Err(Error::config("custom pattern has no steps"));
            }
            // A repeating loop with no hold anywhere would never yield.
            if *repeat && steps.iter().all(|s| s.hold_ms == 0) {
                return Err(Error::config(
                    "repeating custom pattern needs at least one non-zero hold",
                ));
            }
        }
        Ok(())
    }
}

/// Resolves once the flag reads `true` or the sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    while !*cancel.borrow_and_update() {
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

/// A restartable step sequence. Each `run` starts from step 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    steps: Vec<Step>,
    repeat: bool,
}

impl Pattern {
    pub fn repeating(steps: Vec<Step>) -> Self {
        Self {
            steps,
            repeat: true,
        }
    }

    pub fn once(steps: Vec<Step>) -> Self {
        Self {
            steps,
            repeat: false,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_repeating(&self) -> bool {
        self.repeat
    }

    /// Drive `output` through the steps until `cancel` becomes `true`.
    ///
    /// The cancel flag is checked before every emission, and every hold returns
    /// early as soon as the flag flips. A dropped sender counts as cancellation.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>, output: &dyn IndicatorOutput) {
        if self.steps.is_empty() {
            return;
        }
        loop {
            for step in &self.steps {
                if *cancel.borrow() {
                    return;
                }
                output.set_color(step.color);
                if step.hold.is_zero() {
                    continue;
                }
                tokio::select! {
                    _ = tokio::time::sleep(step.hold) => {}
                    _ = cancelled(&mut cancel) => return,
                }
            }
            if !self.repeat {
                return;
            }
        }
    }

    /// Emission offsets from the start of a run, in order.
    ///
    /// Infinite for repeating patterns. `run` cancelled at `t` emits exactly the
    /// entries with offset <= `t`, give or take the one whose hold was interrupted.
    pub fn timeline(&self) -> impl Iterator<Item = (Duration, Color)> + '_ {
        let rounds = match (self.steps.is_empty(), self.repeat) {
            (true, _) => 0,
            (false, true) => usize::MAX,
            (false, false) => 1,
        };
        let mut at = Duration::ZERO;
        std::iter::repeat(self.steps.iter())
            .take(rounds)
            .flatten()
            .map(move |step| {
                let emitted = at;
                at += step.hold;
                (emitted, step.color)
            })
    }
}
