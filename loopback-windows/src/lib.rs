//! # loopback-windows
//!
//! Windows WASAPI backend for loopback-core.
//!
//! Provides:
//! - `WasapiLoopbackHost`: `LoopbackHost` over the default render endpoint
//! - `WasapiSession`: a started loopback stream (`CaptureSession`)
//! - `DeviceEnumerator`: default render endpoint identity and friendly name
//!
//! ## Platform Requirements
//! - Windows 7+ (shared-mode WASAPI loopback)
//! - Visual Studio Build Tools 2022 + Windows SDK for linking
//!
//! ## Usage
//! ```ignore
//! use loopback_core::{BridgeConfig, EngineConfig, LoopbackCaptureEngine, ProcessingBridge};
//! use loopback_windows::WasapiLoopbackHost;
//!
//! let bridge = ProcessingBridge::shared(BridgeConfig::default())?;
//! bridge.lock().attach_processor(Box::new(my_processor));
//! bridge.lock().set_consuming(true);
//! let engine = LoopbackCaptureEngine::new(WasapiLoopbackHost::new(), EngineConfig::default())?;
//! engine.start(bridge.clone())?;
//! ```

#[cfg(target_os = "windows")]
pub mod device_enumerator;
#[cfg(target_os = "windows")]
pub mod wasapi_loopback;
#[cfg(target_os = "windows")]
pub mod wave_format;

#[cfg(target_os = "windows")]
pub use device_enumerator::DeviceEnumerator;
#[cfg(target_os = "windows")]
pub use wasapi_loopback::{WasapiLoopbackHost, WasapiSession};
