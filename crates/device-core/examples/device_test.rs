//! Walks the device-test modal flow against the mock backend: acquire the
//! microphone, meter its level, record a short clip, release everything.
//!
//! Run with: cargo run --example device_test

use std::sync::Arc;
use std::time::Duration;

use livecall_device_core::device::{
    AcquisitionPurpose, MediaConstraints, MediaDeviceManager, MockMediaBackend,
};
use livecall_device_core::recorder::{AudioRecorder, MockCaptureEncoder};
use livecall_device_core::MicLevelMonitor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let backend = Arc::new(MockMediaBackend::new());
    backend.set_level(0.65);
    let manager = MediaDeviceManager::new(backend.clone());

    let acquisition = manager
        .acquire(AcquisitionPurpose::MicrophoneTest, MediaConstraints::audio_only())
        .await?;
    let mic = acquisition
        .audio_track()
        .expect("audio-only acquisition carries a microphone track")
        .clone();

    let monitor = MicLevelMonitor::new(backend.clone());
    monitor.start(&mic);

    let recorder = AudioRecorder::new(Arc::new(MockCaptureEncoder::new()));
    recorder.start(&mic).await?;

    tokio::time::sleep(Duration::from_secs(2)).await;
    println!("mic level: {:.2}", monitor.level());

    if let Some(recording) = recorder.stop() {
        println!(
            "recorded {} bytes of {} over {}s",
            recording.data.len(),
            recording.mime_type,
            recording.duration_seconds
        );
    }

    // modal close path: cancel timers, release hardware
    monitor.stop();
    manager.release(AcquisitionPurpose::MicrophoneTest);
    println!("live tracks after close: {}", backend.live_track_count());
    Ok(())
}
