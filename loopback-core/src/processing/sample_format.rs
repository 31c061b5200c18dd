//! Device-format to normalized `f32` sample conversion.
//!
//! Pure functions with no state. Supported encodings:
//! - 32-bit IEEE float (plain or extensible): copied bit for bit.
//! - 16-bit integer PCM: scaled by `1 / 32768`, mapping into `[-1.0, 1.0)`.
//!
//! Every other encoding converts to silence. Callers must tolerate that.

use crate::models::format::{MixFormat, SampleEncoding};

/// Divisor mapping signed 16-bit samples into `[-1.0, 1.0)`.
pub const PCM16_SCALE: f32 = 32768.0;

/// Convert `frames` frames of raw device data into interleaved `f32`.
///
/// Output length is always `frames * format.channels`.
pub fn convert(raw: &[u8], frames: usize, format: &MixFormat) -> Vec<f32> {
    let mut out = Vec::new();
    convert_into(raw, frames, format, &mut out);
    out
}

/// Like [`convert`], reusing `out` to avoid an allocation per packet.
///
/// `out` is resized to `frames * format.channels` and fully overwritten.
/// If `raw` holds fewer bytes than the frame count implies, the missing
/// tail is silence.
pub fn convert_into(raw: &[u8], frames: usize, format: &MixFormat, out: &mut Vec<f32>) {
    let total_samples = frames * format.channels as usize;
    out.clear();
    out.resize(total_samples, 0.0);

    match format.encoding() {
        SampleEncoding::Float32 => {
            for (dst, bytes) in out.iter_mut().zip(raw.chunks_exact(4)) {
                *dst = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
        }
        SampleEncoding::Pcm16 => {
            for (dst, bytes) in out.iter_mut().zip(raw.chunks_exact(2)) {
                *dst = i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / PCM16_SCALE;
            }
        }
        SampleEncoding::Unsupported => {}
    }
}

/// Fill `out` with `frames * channels` zeros, for packets flagged silent.
pub fn silence_into(frames: usize, channels: u16, out: &mut Vec<f32>) {
    out.clear();
    out.resize(frames * channels as usize, 0.0);
}
