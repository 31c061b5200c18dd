//! Default render endpoint lookup via the MMDevice API.
//!
//! Wraps `IMMDeviceEnumerator`. The endpoint ID string is the identity
//! token the capture engine compares to detect a default-device change.

use windows::Win32::Devices::FunctionDiscovery::PKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use loopback_core::models::error::CaptureError;

/// Role used for loopback: the endpoint media playback is routed to.
const LOOPBACK_ROLE: ERole = eMultimedia;

/// Render endpoint enumerator.
///
/// Requires COM to be initialized on the calling thread.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    pub fn new() -> Result<Self, CaptureError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                .map_err(|e| CaptureError::os("CoCreateInstance(MMDeviceEnumerator)", e.code().0))?;
            Ok(Self { enumerator })
        }
    }

    /// The current default render endpoint.
    pub fn default_render_device(&self) -> Result<IMMDevice, CaptureError> {
        unsafe {
            self.enumerator
                .GetDefaultAudioEndpoint(eRender, LOOPBACK_ROLE)
                .map_err(|_| CaptureError::DeviceNotAvailable)
        }
    }

    /// Identity token of the current default render endpoint.
    pub fn default_render_device_id(&self) -> Result<String, CaptureError> {
        let device = self.default_render_device()?;
        Self::endpoint_id(&device)
    }

    /// Friendly name of the current default render endpoint, if it has one.
    pub fn default_render_device_name(&self) -> Option<String> {
        let device = self.default_render_device().ok()?;
        Self::friendly_name(&device)
    }

    /// Endpoint ID string of `device`.
    pub fn endpoint_id(device: &IMMDevice) -> Result<String, CaptureError> {
        unsafe {
            let id = device
                .GetId()
                .map_err(|e| CaptureError::os("IMMDevice::GetId", e.code().0))?;
            let text = id.to_string();
            CoTaskMemFree(Some(id.0 as *const _));
            text.map_err(|e| CaptureError::Unknown(format!("endpoint id is not valid UTF-16: {}", e)))
        }
    }

    /// Read `PKEY_Device_FriendlyName` from the device's property store.
    pub fn friendly_name(device: &IMMDevice) -> Option<String> {
        unsafe {
            let store = device.OpenPropertyStore(STGM_READ).ok()?;
            let value = store.GetValue(&PKEY_Device_FriendlyName).ok()?;
            let name = value.to_string();
            if name.is_empty() {
                None
            } else {
                Some(name)
            }
        }
    }
}
