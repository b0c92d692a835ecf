//! Microphone level metering
//!
//! The device-test modal shows a live input-level bar while the user speaks.
//! The monitor samples the backend on a short interval and keeps the latest
//! normalized level; the sampling task is aborted on `stop()`, on a dead
//! track, and on drop.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::device::platform::MediaBackend;
use crate::device::types::MediaTrack;

/// Sampling cadence used when none is configured
pub const DEFAULT_LEVEL_INTERVAL: Duration = Duration::from_millis(50);

/// Periodic input-level sampler for one audio track
#[derive(Debug)]
pub struct MicLevelMonitor {
    backend: Arc<dyn MediaBackend>,
    interval: Duration,
    level: Arc<Mutex<f32>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MicLevelMonitor {
    /// Create a monitor over the given backend
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            backend,
            interval: DEFAULT_LEVEL_INTERVAL,
            level: Arc::new(Mutex::new(0.0)),
            task: Mutex::new(None),
        }
    }

    /// Override the sampling cadence
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Begin sampling a live audio track. Replaces any running sampler.
    pub fn start(&self, track: &MediaTrack) {
        self.stop();

        let backend = self.backend.clone();
        let level = self.level.clone();
        let track = track.clone();
        let every = self.interval;
        *self.task.lock() = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match backend.sample_level(&track) {
                    Ok(value) => *level.lock() = value,
                    Err(error) => {
                        debug!(%error, "level sampling ended");
                        break;
                    }
                }
            }
        }));
    }

    /// Latest sampled level, `0.0..=1.0`; zero before the first sample
    pub fn level(&self) -> f32 {
        *self.level.lock()
    }

    /// Whether the sampling task is running
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    /// Cancel the sampling task and reset the level
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        *self.level.lock() = 0.0;
    }
}

impl Drop for MicLevelMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::platform::MockMediaBackend;
    use crate::device::types::MediaKind;

    #[tokio::test(start_paused = true)]
    async fn samples_the_backend_level() {
        let backend = Arc::new(MockMediaBackend::new());
        backend.set_level(0.8);
        let monitor = MicLevelMonitor::new(backend.clone());
        let track = MediaTrack::new(MediaKind::Audio, "Mock Microphone");

        monitor.start(&track);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!((monitor.level() - 0.8).abs() < f32::EPSILON);
        assert!(monitor.is_running());

        monitor.stop();
        assert_eq!(monitor.level(), 0.0);
        assert!(!monitor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn sampling_ends_when_the_track_stops() {
        let backend = Arc::new(MockMediaBackend::new());
        let monitor = MicLevelMonitor::new(backend);
        let track = MediaTrack::new(MediaKind::Audio, "Mock Microphone");

        monitor.start(&track);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(monitor.is_running());

        track.stop();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!monitor.is_running());
    }
}
