//! Resilient loopback capture engine.
//!
//! Runs a dedicated capture thread that keeps a loopback session on the
//! current default render endpoint alive for as long as the engine runs:
//!
//! ```text
//! ┌─ resilience loop ─────────────────────────────────────────────┐
//! │ acquire default endpoint ──fail──→ log, backoff, retry        │
//! │        ↓                                                      │
//! │ ┌─ steady state (every poll interval) ──────────────────────┐ │
//! │ │ device check (every second) ──changed──→ break            │ │
//! │ │ poll → read → convert → try-lock consumer → deliver/drop  │ │
//! │ │                       → release (always)                  │ │
//! │ │ any stream error ──→ break                                │ │
//! │ └───────────────────────────────────────────────────────────┘ │
//! │ drop session, backoff unless stopped                          │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing that happens on the capture thread is fatal; the engine only
//! exits when `stop()` clears the running flag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;

use crate::models::config::EngineConfig;
use crate::models::diagnostics::CaptureDiagnostics;
use crate::models::error::CaptureError;
use crate::models::format::MixFormat;
use crate::models::state::EngineState;
use crate::processing::sample_format;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_provider::LoopbackHost;
use crate::traits::capture_session::CaptureSession;
use crate::traits::packet_consumer::{AudioPacket, SharedConsumer};

/// Captures the default render endpoint in loopback and feeds a consumer.
///
/// Generic over the OS audio stack through [`LoopbackHost`]. The host is
/// lent to the capture thread while it runs and handed back when it exits,
/// so the engine can be stopped and started again.
pub struct LoopbackCaptureEngine<H: LoopbackHost> {
    config: EngineConfig,
    host: Arc<Mutex<Option<H>>>,
    running: Arc<AtomicBool>,
    capture_handle: Mutex<Option<thread::JoinHandle<()>>>,
    shared: Arc<EngineShared>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
}

impl<H: LoopbackHost> LoopbackCaptureEngine<H> {
    pub fn new(host: H, config: EngineConfig) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;

        Ok(Self {
            config,
            host: Arc::new(Mutex::new(Some(host))),
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: Mutex::new(None),
            shared: Arc::new(EngineShared::new()),
            delegate: None,
        })
    }

    /// Takes effect on the next `start()`.
    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Start capturing into `consumer`.
    ///
    /// Idempotent: if the engine is already running this returns `Ok(())`
    /// and leaves the running thread (and its consumer) untouched. Returns
    /// as soon as the thread is spawned, without waiting for a device.
    pub fn start(&self, consumer: SharedConsumer) -> Result<(), CaptureError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Loopback capture already running");
            return Ok(());
        }

        if self.host.lock().is_none() {
            self.running.store(false, Ordering::SeqCst);
            return Err(CaptureError::ThreadUnavailable(
                "previous capture thread has not released the audio host".into(),
            ));
        }

        let context = CaptureContext {
            config: self.config.clone(),
            running: Arc::clone(&self.running),
            shared: Arc::clone(&self.shared),
            delegate: self.delegate.clone(),
            consumer,
        };
        let host_slot = Arc::clone(&self.host);

        let spawned = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || {
                let running = RunningGuard(Arc::clone(&context.running));
                let Some(mut host) = host_slot.lock().take() else {
                    log::error!("Capture thread started without an audio host");
                    return;
                };
                context.run(&mut host);
                // A start() that sees the host must also see the flag cleared.
                drop(running);
                *host_slot.lock() = Some(host);
            });

        match spawned {
            Ok(handle) => {
                *self.capture_handle.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(CaptureError::ThreadUnavailable(format!(
                    "failed to spawn capture thread: {}",
                    e
                )))
            }
        }
    }

    /// Stop capturing and wait for the capture thread to exit.
    ///
    /// After this returns the consumer is never called again. Called on the
    /// capture thread itself (from inside a delivery) it only clears the
    /// running flag; the thread winds down once the delivery returns.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let Some(handle) = self.capture_handle.lock().take() else {
            return;
        };

        if handle.thread().id() == thread::current().id() {
            log::warn!("stop() called on the capture thread; exiting after the current delivery");
            return;
        }

        if handle.join().is_err() {
            log::error!("Loopback capture thread panicked");
            *self.shared.state.lock() = EngineState::Idle;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> EngineState {
        self.shared.state.lock().clone()
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        self.shared.counters.snapshot()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<H: LoopbackHost> Drop for LoopbackCaptureEngine<H> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State shared between the engine handle and its capture thread.
struct EngineShared {
    state: Mutex<EngineState>,
    counters: Counters,
}

impl EngineShared {
    fn new() -> Self {
        Self {
            state: Mutex::new(EngineState::Idle),
            counters: Counters::default(),
        }
    }
}

#[derive(Default)]
struct Counters {
    sessions_started: AtomicU64,
    packets_delivered: AtomicU64,
    packets_dropped: AtomicU64,
    packets_released: AtomicU64,
    frames_captured: AtomicU64,
    device_changes: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CaptureDiagnostics {
        CaptureDiagnostics {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            packets_delivered: self.packets_delivered.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            packets_released: self.packets_released.load(Ordering::Relaxed),
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            device_changes: self.device_changes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Clears the running flag when the capture thread exits, panics included.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Why a steady-state session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionExit {
    Stopped,
    DeviceChanged,
    Failed,
}

/// Everything the capture thread owns.
struct CaptureContext {
    config: EngineConfig,
    running: Arc<AtomicBool>,
    shared: Arc<EngineShared>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    consumer: SharedConsumer,
}

impl CaptureContext {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Outer resilience loop.
    fn run<H: LoopbackHost>(&self, host: &mut H) {
        let mut attached = false;
        while self.is_running() {
            match host.attach_thread() {
                Ok(()) => {
                    attached = true;
                    break;
                }
                Err(e) => {
                    self.report_failure("Capture thread attach failed", &e);
                    self.backoff();
                }
            }
        }

        while self.is_running() {
            self.set_state(EngineState::Acquiring);

            match host.acquire_default() {
                Ok(mut session) => {
                    let exit = self.run_session(&mut session);
                    drop(session);
                    log::info!("Capture cycle ended ({:?}). Cleaning up for possible restart", exit);
                }
                Err(e) => self.report_failure("Loopback acquisition failed", &e),
            }

            if self.is_running() {
                self.backoff();
            }
        }

        if attached {
            host.detach_thread();
        }
        self.set_state(EngineState::Idle);
    }

    fn run_session<S: CaptureSession>(&self, session: &mut S) -> SessionExit {
        let format = *session.format();
        let device_id = session.device_id().to_owned();

        log::info!("Started loopback capture on {}: {}", device_id, format);
        if !format.is_supported() {
            log::warn!("Unsupported mix format ({}); packets will be delivered as silence", format);
        }

        Counters::bump(&self.shared.counters.sessions_started, 1);
        self.set_state(EngineState::Capturing {
            device_id: device_id.clone(),
            format,
        });

        match self.pump(session, &format, &device_id) {
            Ok(exit) => exit,
            Err(e) => {
                log::error!("Loopback stream failed: {}", e);
                self.count_failure(&e);
                SessionExit::Failed
            }
        }
    }

    /// Inner steady-state loop.
    fn pump<S: CaptureSession>(
        &self,
        session: &mut S,
        format: &MixFormat,
        device_id: &str,
    ) -> Result<SessionExit, CaptureError> {
        let mut samples: Vec<f32> = Vec::new();
        let mut last_device_check = Instant::now();
        let mut first_packet = true;

        while self.is_running() {
            thread::sleep(self.config.poll_interval);

            if last_device_check.elapsed() >= self.config.device_check_interval {
                last_device_check = Instant::now();
                match session.default_device_id() {
                    Ok(current) if current != device_id => {
                        log::info!("Default device change detected ({} -> {}). Restarting", device_id, current);
                        Counters::bump(&self.shared.counters.device_changes, 1);
                        if let Some(ref delegate) = self.delegate {
                            delegate.on_device_changed(device_id, &current);
                        }
                        return Ok(SessionExit::DeviceChanged);
                    }
                    Ok(_) => {}
                    Err(e) => log::debug!("Default device query failed: {}", e),
                }
            }

            let mut pending = session.next_packet_size()?;
            while pending > 0 {
                let frames = {
                    let packet = session.read_packet()?;
                    if packet.silent {
                        sample_format::silence_into(packet.frames as usize, format.channels, &mut samples);
                    } else {
                        sample_format::convert_into(packet.data, packet.frames as usize, format, &mut samples);
                    }
                    packet.frames
                };

                if frames > 0 {
                    self.deliver(&samples, format, frames, &mut first_packet);
                }

                session.release_packet(frames)?;
                Counters::bump(&self.shared.counters.packets_released, 1);

                pending = session.next_packet_size()?;
            }
        }

        Ok(SessionExit::Stopped)
    }

    /// Hand samples to the consumer if it is free; drop them if it is busy.
    fn deliver(&self, samples: &[f32], format: &MixFormat, frames: u32, first_packet: &mut bool) {
        let counters = &self.shared.counters;
        Counters::bump(&counters.frames_captured, frames as u64);

        let Some(mut consumer) = self.consumer.try_lock() else {
            Counters::bump(&counters.packets_dropped, 1);
            return;
        };
        if !self.is_running() {
            Counters::bump(&counters.packets_dropped, 1);
            return;
        }

        consumer.on_packet(&AudioPacket {
            samples,
            channels: format.channels,
            sample_rate: format.sample_rate,
        });
        drop(consumer);

        Counters::bump(&counters.packets_delivered, 1);
        if *first_packet {
            log::debug!("Captured first packet. Frames: {}", frames);
            *first_packet = false;
        }
    }

    /// Sleep out the retry backoff, waking early if stopped.
    fn backoff(&self) {
        self.set_state(EngineState::Backoff);

        let deadline = Instant::now() + self.config.retry_backoff;
        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(self.config.poll_interval));
        }
    }

    fn report_failure(&self, context: &str, error: &CaptureError) {
        log::warn!("{}: {}", context, error);
        self.count_failure(error);
    }

    fn count_failure(&self, error: &CaptureError) {
        Counters::bump(&self.shared.counters.failures, 1);
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }

    fn set_state(&self, state: EngineState) {
        *self.shared.state.lock() = state.clone();
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&state);
        }
    }
}
