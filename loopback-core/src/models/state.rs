use super::format::MixFormat;

/// Capture engine state machine.
///
/// State transitions:
/// ```text
/// idle → acquiring → capturing
///           ↑   ↓        ↓
///           backoff ←────┘
/// (any) → idle on stop
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Acquiring,
    Capturing { device_id: String, format: MixFormat },
    Backoff,
}

impl EngineState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing { .. })
    }

    /// Identity of the endpoint being captured, if any.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::Capturing { device_id, .. } => Some(device_id),
            _ => None,
        }
    }
}
