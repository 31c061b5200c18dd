//! `WAVEFORMATEX` → [`MixFormat`].

use windows::core::GUID;
use windows::Win32::Media::Audio::{WAVEFORMATEX, WAVEFORMATEXTENSIBLE};

use loopback_core::models::format::{FormatTag, MixFormat, SubFormat, WAVE_FORMAT_EXTENSIBLE};

/// KSDATAFORMAT_SUBTYPE_PCM
const SUBTYPE_PCM: GUID = GUID::from_u128(0x00000001_0000_0010_8000_00aa00389b71);
/// KSDATAFORMAT_SUBTYPE_IEEE_FLOAT
const SUBTYPE_IEEE_FLOAT: GUID = GUID::from_u128(0x00000003_0000_0010_8000_00aa00389b71);

/// Bytes of `WAVEFORMATEXTENSIBLE` beyond the base `WAVEFORMATEX`.
const EXTENSIBLE_EXTRA_BYTES: u16 = 22;

/// Read a mix format returned by `IAudioClient::GetMixFormat`.
///
/// # Safety
/// `ptr` must point to a valid `WAVEFORMATEX`, followed by the extensible
/// tail when `cbSize` says so.
pub unsafe fn mix_format_from_ptr(ptr: *const WAVEFORMATEX) -> MixFormat {
    let base = std::ptr::read_unaligned(ptr);
    let tag = base.wFormatTag;
    let extra = base.cbSize;

    let sub_format = if tag == WAVE_FORMAT_EXTENSIBLE && extra >= EXTENSIBLE_EXTRA_BYTES {
        let ext = ptr as *const WAVEFORMATEXTENSIBLE;
        // packed struct; read through a raw pointer
        let guid = std::ptr::read_unaligned(std::ptr::addr_of!((*ext).SubFormat));
        Some(sub_format_from_guid(&guid))
    } else {
        None
    };

    MixFormat {
        channels: base.nChannels,
        sample_rate: base.nSamplesPerSec,
        bits_per_sample: base.wBitsPerSample,
        block_align: base.nBlockAlign,
        tag: FormatTag::from_wave_tag(tag, sub_format),
    }
}

fn sub_format_from_guid(guid: &GUID) -> SubFormat {
    if *guid == SUBTYPE_IEEE_FLOAT {
        SubFormat::IeeeFloat
    } else if *guid == SUBTYPE_PCM {
        SubFormat::Pcm
    } else {
        SubFormat::Other
    }
}
