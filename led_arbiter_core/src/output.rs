use crate::color::Color;

/// The device seam: whatever physically shows a color.
///
/// Calls are assumed non-blocking and infallible. Implementations must be safe
/// to call from a pattern task and from the engine's control path at the same
/// time; the engine does not serialize them.
pub trait IndicatorOutput: Send + Sync {
    fn set_color(&self, color: Color);
}

/// Output that drops every call. Useful when only the engine's bookkeeping matters.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullOutput;

impl IndicatorOutput for NullOutput {
    fn set_color(&self, _color: Color) {}
}
