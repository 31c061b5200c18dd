use serde::{Deserialize, Serialize};

/// `WAVE_FORMAT_PCM`
pub const WAVE_FORMAT_PCM: u16 = 0x0001;
/// `WAVE_FORMAT_IEEE_FLOAT`
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
/// `WAVE_FORMAT_EXTENSIBLE`
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Sub-format of an extensible wave format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubFormat {
    Pcm,
    IeeeFloat,
    Other,
}

/// Encoding tag of a device mix format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatTag {
    Pcm,
    IeeeFloat,
    Extensible(SubFormat),
    Other(u16),
}

impl FormatTag {
    /// Map a raw `wFormatTag`, with the sub-format for extensible formats.
    pub fn from_wave_tag(tag: u16, sub_format: Option<SubFormat>) -> Self {
        match tag {
            WAVE_FORMAT_PCM => Self::Pcm,
            WAVE_FORMAT_IEEE_FLOAT => Self::IeeeFloat,
            WAVE_FORMAT_EXTENSIBLE => Self::Extensible(sub_format.unwrap_or(SubFormat::Other)),
            other => Self::Other(other),
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::IeeeFloat | Self::Extensible(SubFormat::IeeeFloat))
    }

    pub fn is_pcm(&self) -> bool {
        matches!(self, Self::Pcm | Self::Extensible(SubFormat::Pcm))
    }
}

/// Sample encodings the converter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleEncoding {
    Float32,
    Pcm16,
    Unsupported,
}

/// The format a render endpoint is currently mixing in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Bytes per frame across all channels.
    pub block_align: u16,
    pub tag: FormatTag,
}

impl MixFormat {
    /// Builds a packed interleaved format (block align derived from depth).
    pub fn packed(channels: u16, sample_rate: u32, bits_per_sample: u16, tag: FormatTag) -> Self {
        Self {
            channels,
            sample_rate,
            bits_per_sample,
            block_align: channels * (bits_per_sample / 8),
            tag,
        }
    }

    /// Typical shared-mode mix format: 32-bit float.
    pub fn float32(channels: u16, sample_rate: u32) -> Self {
        Self::packed(channels, sample_rate, 32, FormatTag::Extensible(SubFormat::IeeeFloat))
    }

    pub fn pcm16(channels: u16, sample_rate: u32) -> Self {
        Self::packed(channels, sample_rate, 16, FormatTag::Pcm)
    }

    pub fn encoding(&self) -> SampleEncoding {
        match (self.tag, self.bits_per_sample) {
            (tag, 32) if tag.is_float() => SampleEncoding::Float32,
            (tag, 16) if tag.is_pcm() => SampleEncoding::Pcm16,
            _ => SampleEncoding::Unsupported,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.encoding() != SampleEncoding::Unsupported
    }
}

impl std::fmt::Display for MixFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ch, {} Hz, {}-bit {:?}",
            self.channels, self.sample_rate, self.bits_per_sample, self.tag
        )
    }
}
