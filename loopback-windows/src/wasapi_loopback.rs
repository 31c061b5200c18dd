//! WASAPI loopback host for system audio.
//!
//! Captures the mix going to the default render endpoint using
//! `AUDCLNT_STREAMFLAGS_LOOPBACK`. No special permissions needed on Windows.
//!
//! ## Notes
//! - Shared mode only; the stream runs in the endpoint's mix format
//! - DRM-protected audio is silenced in loopback
//! - Polled (not event-driven); the engine sleeps between polls

use windows::core::w;
use windows::Win32::Foundation::HANDLE;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;
use windows::Win32::System::Threading::*;

use loopback_core::models::error::CaptureError;
use loopback_core::models::format::MixFormat;
use loopback_core::traits::capture_provider::LoopbackHost;
use loopback_core::traits::capture_session::{CaptureSession, RawPacket};

use crate::device_enumerator::DeviceEnumerator;
use crate::wave_format;

/// Shared-mode buffer duration: 100 ms in 100 ns units.
const BUFFER_DURATION: i64 = 1_000_000;

/// WASAPI implementation of [`LoopbackHost`].
///
/// Moved onto the capture thread by the engine. `attach_thread` joins the
/// multithreaded COM apartment and registers the thread with MMCSS.
#[derive(Default)]
pub struct WasapiLoopbackHost {
    com_initialized: bool,
    mmcss_task: Option<HANDLE>,
}

// SAFETY: the MMCSS handle is only used on the capture thread that created it.
unsafe impl Send for WasapiLoopbackHost {}

impl WasapiLoopbackHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoopbackHost for WasapiLoopbackHost {
    type Session = WasapiSession;

    fn attach_thread(&mut self) -> Result<(), CaptureError> {
        if !self.com_initialized {
            unsafe {
                CoInitializeEx(None, COINIT_MULTITHREADED)
                    .ok()
                    .map_err(|e| CaptureError::os("CoInitializeEx", e.code().0))?;
            }
            self.com_initialized = true;
        }

        if self.mmcss_task.is_none() {
            let mut task_index: u32 = 0;
            match unsafe { AvSetMmThreadCharacteristicsW(w!("Pro Audio"), &mut task_index) } {
                Ok(handle) => self.mmcss_task = Some(handle),
                Err(e) => log::debug!("MMCSS registration failed: {}", e),
            }
        }

        Ok(())
    }

    fn detach_thread(&mut self) {
        if let Some(handle) = self.mmcss_task.take() {
            unsafe {
                let _ = AvRevertMmThreadCharacteristics(handle);
            }
        }
        if self.com_initialized {
            unsafe {
                CoUninitialize();
            }
            self.com_initialized = false;
        }
    }

    /// Sequence:
    /// 1. Get default render endpoint (multimedia role)
    /// 2. Activate IAudioClient
    /// 3. GetMixFormat
    /// 4. Initialize with LOOPBACK flag in shared mode
    /// 5. Get IAudioCaptureClient
    /// 6. Start
    fn acquire_default(&mut self) -> Result<WasapiSession, CaptureError> {
        let devices = DeviceEnumerator::new()?;
        let device = devices.default_render_device()?;
        let device_id = DeviceEnumerator::endpoint_id(&device)?;

        unsafe {
            let audio_client: IAudioClient = device
                .Activate(CLSCTX_ALL, None)
                .map_err(|e| CaptureError::os("IMMDevice::Activate", e.code().0))?;

            let mix_format_ptr = audio_client
                .GetMixFormat()
                .map_err(|e| CaptureError::os("IAudioClient::GetMixFormat", e.code().0))?;
            let mix = CoTaskMixFormat(mix_format_ptr);
            let format = wave_format::mix_format_from_ptr(mix.0);

            audio_client
                .Initialize(
                    AUDCLNT_SHAREMODE_SHARED,
                    AUDCLNT_STREAMFLAGS_LOOPBACK,
                    BUFFER_DURATION,
                    0,
                    mix.0,
                    None,
                )
                .map_err(|e| CaptureError::os("IAudioClient::Initialize", e.code().0))?;

            let capture_client: IAudioCaptureClient = audio_client
                .GetService()
                .map_err(|e| CaptureError::os("IAudioClient::GetService", e.code().0))?;

            audio_client
                .Start()
                .map_err(|e| CaptureError::os("IAudioClient::Start", e.code().0))?;

            Ok(WasapiSession {
                devices,
                audio_client,
                capture_client,
                _mix_format: mix,
                format,
                device_id,
            })
        }
    }
}

/// A started loopback stream on one render endpoint.
///
/// Dropping it stops the stream; COM references and the mix format are
/// released with it.
pub struct WasapiSession {
    devices: DeviceEnumerator,
    audio_client: IAudioClient,
    capture_client: IAudioCaptureClient,
    _mix_format: CoTaskMixFormat,
    format: MixFormat,
    device_id: String,
}

impl CaptureSession for WasapiSession {
    fn format(&self) -> &MixFormat {
        &self.format
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn default_device_id(&self) -> Result<String, CaptureError> {
        self.devices.default_render_device_id()
    }

    fn next_packet_size(&mut self) -> Result<u32, CaptureError> {
        unsafe {
            self.capture_client
                .GetNextPacketSize()
                .map_err(|e| CaptureError::os("IAudioCaptureClient::GetNextPacketSize", e.code().0))
        }
    }

    fn read_packet(&mut self) -> Result<RawPacket<'_>, CaptureError> {
        let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
        let mut num_frames: u32 = 0;
        let mut flags: u32 = 0;

        unsafe {
            self.capture_client
                .GetBuffer(&mut buffer_ptr, &mut num_frames, &mut flags, None, None)
                .map_err(|e| CaptureError::os("IAudioCaptureClient::GetBuffer", e.code().0))?;
        }

        let silent = flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0;
        let len = num_frames as usize * self.format.block_align as usize;
        let data = if buffer_ptr.is_null() || len == 0 {
            &[][..]
        } else {
            // SAFETY: WASAPI keeps the buffer valid until ReleaseBuffer, which
            // needs `&mut self` and so cannot run while this borrow is alive.
            unsafe { std::slice::from_raw_parts(buffer_ptr, len) }
        };

        Ok(RawPacket {
            data,
            frames: num_frames,
            silent,
        })
    }

    fn release_packet(&mut self, frames: u32) -> Result<(), CaptureError> {
        unsafe {
            self.capture_client
                .ReleaseBuffer(frames)
                .map_err(|e| CaptureError::os("IAudioCaptureClient::ReleaseBuffer", e.code().0))
        }
    }
}

impl Drop for WasapiSession {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.audio_client.Stop() {
                log::debug!("IAudioClient::Stop failed during teardown: {}", e);
            }
        }
    }
}

/// Mix format allocated by `GetMixFormat`, freed with `CoTaskMemFree`.
struct CoTaskMixFormat(*mut WAVEFORMATEX);

impl Drop for CoTaskMixFormat {
    fn drop(&mut self) {
        unsafe {
            CoTaskMemFree(Some(self.0 as *const _));
        }
    }
}
