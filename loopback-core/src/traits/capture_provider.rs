use crate::models::error::CaptureError;
use crate::traits::capture_session::CaptureSession;

/// Access to the host audio stack for loopback capture.
///
/// Implemented by:
/// - `WasapiLoopbackHost` (Windows)
///
/// The host is moved onto the capture thread; every method is called from
/// that thread only.
pub trait LoopbackHost: Send + 'static {
    type Session: CaptureSession;

    /// Prepare the calling thread for audio calls (COM on Windows).
    fn attach_thread(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    /// Undo `attach_thread` before the capture thread exits.
    fn detach_thread(&mut self) {}

    /// Open the current default render endpoint in loopback mode and start it.
    fn acquire_default(&mut self) -> Result<Self::Session, CaptureError>;
}
