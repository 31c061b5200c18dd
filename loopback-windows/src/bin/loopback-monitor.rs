//! Capture system audio through the processing bridge and log its level.
//!
//! Usage: `loopback-monitor [SECONDS]` (default 10). `RUST_LOG` controls
//! verbosity; `RUST_LOG=debug` shows per-session detail.

#[cfg(target_os = "windows")]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let seconds = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<u64>() {
            Ok(n) => n,
            Err(_) => {
                eprintln!("usage: loopback-monitor [SECONDS]");
                std::process::exit(2);
            }
        },
        None => 10,
    };

    if let Err(e) = monitor::run(seconds) {
        log::error!("Loopback monitor failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(target_os = "windows"))]
fn main() {
    eprintln!("loopback-monitor requires Windows (WASAPI)");
    std::process::exit(1);
}

#[cfg(target_os = "windows")]
mod monitor {
    use std::thread;
    use std::time::Duration;

    use loopback_core::{
        BridgeConfig, CaptureError, EngineConfig, EngineState, LoopbackCaptureEngine, MeterProcessor,
        ProcessingBridge,
    };
    use loopback_windows::{DeviceEnumerator, WasapiLoopbackHost};
    use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_MULTITHREADED};

    const METER_CHANNELS: usize = 2;

    pub fn run(seconds: u64) -> Result<(), CaptureError> {
        log_default_device();

        let bridge = ProcessingBridge::shared(BridgeConfig::default())?;
        let (meter, levels) = MeterProcessor::new(METER_CHANNELS);
        {
            let mut bridge = bridge.lock();
            bridge.attach_processor(Box::new(meter));
            bridge.set_consuming(true);
        }

        let engine = LoopbackCaptureEngine::new(WasapiLoopbackHost::new(), EngineConfig::default())?;
        engine.start(bridge.clone())?;

        for _ in 0..seconds {
            thread::sleep(Duration::from_secs(1));

            let level = levels.levels();
            let stats = engine.diagnostics();
            let state = match engine.state() {
                EngineState::Capturing { format, .. } => format.to_string(),
                other => format!("{:?}", other),
            };
            log::info!(
                "[{}] rms {:.4} peak {:.4} | delivered {} dropped {} device changes {}",
                state,
                level.rms,
                level.peak,
                stats.packets_delivered,
                stats.packets_dropped,
                stats.device_changes
            );
        }

        engine.stop();

        let bridge = bridge.lock();
        let summary = bridge.diagnostics();
        log::info!(
            "Stopped: {} blocks processed, {} reconfigurations, {} failures",
            summary.blocks_processed,
            summary.reconfigurations,
            engine.diagnostics().failures
        );
        Ok(())
    }

    fn log_default_device() {
        if unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) }.is_err() {
            return;
        }
        match DeviceEnumerator::new().ok().and_then(|d| d.default_render_device_name()) {
            Some(name) => log::info!("Default render device: {}", name),
            None => log::info!("No default render device yet; capture will wait for one"),
        }
        unsafe { CoUninitialize() };
    }
}
