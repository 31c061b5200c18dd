//! # loopback-core
//!
//! Platform-agnostic system-audio loopback capture.
//!
//! Provides the resilient capture engine, device-format sample conversion,
//! and the bridge that re-blocks captured audio for a block-based
//! processor. Platform backends (Windows WASAPI) implement the
//! `LoopbackHost` / `CaptureSession` traits and plug into the generic
//! `LoopbackCaptureEngine`.
//!
//! ## Architecture
//!
//! ```text
//! loopback-core (this crate)
//! ├── traits/       ← LoopbackHost, CaptureSession, PacketConsumer, BlockProcessor, CaptureDelegate
//! ├── models/       ← CaptureError, EngineState, MixFormat, EngineConfig, BridgeConfig, diagnostics
//! ├── processing/   ← sample conversion, AccumulationBuffer, deinterleaving, MeterProcessor
//! ├── engine/       ← LoopbackCaptureEngine (capture thread + resilience loop)
//! └── bridge/       ← ProcessingBridge (packets → fixed-size planar blocks)
//! ```
//!
//! ## Data flow
//!
//! ```text
//! OS packet → sample_format → try-lock SharedConsumer → ProcessingBridge
//!   → AccumulationBuffer → deinterleave → BlockProcessor::process_replacing
//! ```

pub mod bridge;
pub mod engine;
pub mod models;
pub mod processing;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use bridge::processing_bridge::{ProcessingBridge, ProcessingConfiguration, SharedBridge};
pub use engine::loopback_engine::LoopbackCaptureEngine;
pub use models::config::{BridgeConfig, EngineConfig, DEFAULT_BLOCK_SIZE, MAX_CHANNELS};
pub use models::diagnostics::{AudioLevels, BridgeDiagnostics, CaptureDiagnostics};
pub use models::error::CaptureError;
pub use models::format::{FormatTag, MixFormat, SampleEncoding, SubFormat};
pub use models::state::EngineState;
pub use processing::meter::{MeterHandle, MeterProcessor};
pub use traits::block_processor::BlockProcessor;
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::capture_provider::LoopbackHost;
pub use traits::capture_session::{CaptureSession, RawPacket};
pub use traits::packet_consumer::{AudioPacket, PacketConsumer, SharedConsumer};
