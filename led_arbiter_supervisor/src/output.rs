//! Concrete `IndicatorOutput`s: a colored console line per emission, and a recorder.

use std::io::Write;
use std::sync::Mutex;

use crossterm::style::Stylize;
use led_arbiter_core::{Color, IndicatorOutput};
use tokio::time::Instant;

/// Prints `HH:MM:SS.mmm - <Color>LED` to stdout, styled in the emitted color.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn new() -> Self {
        Self
    }

    fn label(color: Color) -> String {
        match color {
            Color::Red => "RedLED".red().to_string(),
            Color::Blue => "BlueLED".blue().to_string(),
            Color::Green => "GreenLED".green().to_string(),
            Color::Off => "ClearLED".to_string(),
        }
    }
}

impl IndicatorOutput for ConsoleOutput {
    fn set_color(&self, color: Color) {
        let stamp = chrono::Local::now().format("%H:%M:%S%.3f");
        let mut out = std::io::stdout().lock();
        // Write errors are ignored; the device seam is infallible.
        let _ = writeln!(out, "{stamp} - {}", Self::label(color));
    }
}

/// Keeps every emission with its timestamp. Uses the tokio clock, so a paused
/// test runtime records virtual time.
#[derive(Debug, Default)]
pub struct RecordingOutput {
    calls: Mutex<Vec<(Color, Instant)>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(Color, Instant)> {
        self.lock().clone()
    }

    pub fn colors(&self) -> Vec<Color> {
        self.lock().iter().map(|(c, _)| *c).collect()
    }

    pub fn last(&self) -> Option<Color> {
        self.lock().last().map(|(c, _)| *c)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Color, Instant)>> {
        self.calls.lock().expect("recording output mutex poisoned")
    }
}

impl IndicatorOutput for RecordingOutput {
    fn set_color(&self, color: Color) {
        self.lock().push((color, Instant::now()));
    }
}
