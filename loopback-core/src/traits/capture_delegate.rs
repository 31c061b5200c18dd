use crate::models::error::CaptureError;
use crate::models::state::EngineState;

/// Event delegate for capture engine notifications.
///
/// All methods are called from the capture thread, not the UI thread.
/// Implementations should marshal to the UI thread if needed.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the engine state changes.
    fn on_state_changed(&self, state: &EngineState);

    /// Called for every recovered acquisition or stream failure.
    fn on_error(&self, error: &CaptureError);

    /// Called when the default render endpoint switched under a live session.
    fn on_device_changed(&self, from: &str, to: &str);
}
