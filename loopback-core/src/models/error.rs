use thiserror::Error;

/// Errors that can occur while acquiring or running a loopback capture.
///
/// Inside the capture thread these are logged and retried; they only reach
/// the caller from `start()` and from host construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no default render endpoint available")]
    DeviceNotAvailable,

    #[error("{call} failed (status {code:#010x})")]
    Os { call: &'static str, code: u32 },

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("capture thread unavailable: {0}")]
    ThreadUnavailable(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Failure of a named OS call with its raw status code.
    pub fn os(call: &'static str, code: impl Into<i64>) -> Self {
        Self::Os {
            call,
            code: code.into() as u32,
        }
    }
}
