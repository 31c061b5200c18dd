use serde::{Deserialize, Serialize};

/// Counters for debugging the capture thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureDiagnostics {
    pub sessions_started: u64,
    pub packets_delivered: u64,
    /// Packets not delivered because the consumer was busy or capture was stopping.
    pub packets_dropped: u64,
    pub packets_released: u64,
    pub frames_captured: u64,
    pub device_changes: u64,
    /// Acquisition and stream failures, all recovered.
    pub failures: u64,
}

/// Counters for the processing bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeDiagnostics {
    pub blocks_processed: u64,
    pub reconfigurations: u64,
    /// Packets received while no processor was attached or consuming.
    pub packets_ignored: u64,
}

/// RMS and peak level of the most recent block, 0.0–1.0 for normalized audio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioLevels {
    pub rms: f32,
    pub peak: f32,
}

impl AudioLevels {
    pub fn measure(samples: &[f32]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
        Self {
            rms: (sum_sq / samples.len() as f32).sqrt(),
            peak: samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max),
        }
    }

    /// Channel-wise maximum, used to fold several channels into one reading.
    pub fn max(self, other: Self) -> Self {
        Self {
            rms: self.rms.max(other.rms),
            peak: self.peak.max(other.peak),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn silence_measures_zero() {
        assert_eq!(AudioLevels::measure(&[0.0, 0.0, 0.0]), AudioLevels::default());
        assert_eq!(AudioLevels::measure(&[]), AudioLevels::default());
    }

    #[test]
    fn full_scale_rms() {
        let levels = AudioLevels::measure(&[1.0, -1.0, 1.0]);
        assert_relative_eq!(levels.rms, 1.0);
        assert_relative_eq!(levels.peak, 1.0);
    }

    #[test]
    fn peak_uses_absolute_value() {
        assert_relative_eq!(AudioLevels::measure(&[0.1, -0.5, 0.3]).peak, 0.5);
    }

    #[test]
    fn max_folds_channels() {
        let a = AudioLevels { rms: 0.2, peak: 0.9 };
        let b = AudioLevels { rms: 0.4, peak: 0.5 };
        assert_eq!(a.max(b), AudioLevels { rms: 0.4, peak: 0.9 });
    }
}
