//! Synthesized ringtone
//!
//! The ringing cue is generated, not played from an asset: one short
//! dual-tone pulse (the 440 Hz + 480 Hz ringback pair) with an exponential
//! decay envelope, rendered as PCM and handed to a [`ToneSink`], repeated on
//! a fixed schedule.
//!
//! A sink that cannot be constructed leaves the synthesizer permanently
//! silent: a ringtone failure must never block call progress, so the
//! constructor logs and continues rather than erroring.

use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::MediaResult;

/// Lower frequency of the ringback pair
pub const RINGTONE_LOW_HZ: f32 = 440.0;
/// Upper frequency of the ringback pair
pub const RINGTONE_HIGH_HZ: f32 = 480.0;
/// Pulse repetition period
pub const DEFAULT_RING_INTERVAL: Duration = Duration::from_secs(2);

/// Parameters of one rendered pulse
#[derive(Debug, Clone, PartialEq)]
pub struct TonePulse {
    /// First tone frequency in Hz
    pub low_hz: f32,
    /// Second tone frequency in Hz
    pub high_hz: f32,
    /// Pulse length in milliseconds
    pub duration_ms: u32,
    /// PCM sample rate
    pub sample_rate: u32,
    /// Decay exponent; larger fades faster
    pub decay: f32,
}

impl Default for TonePulse {
    fn default() -> Self {
        Self {
            low_hz: RINGTONE_LOW_HZ,
            high_hz: RINGTONE_HIGH_HZ,
            duration_ms: 800,
            sample_rate: 8000,
            decay: 4.0,
        }
    }
}

impl TonePulse {
    /// Number of PCM samples in one pulse
    pub fn sample_count(&self) -> usize {
        (self.sample_rate as u64 * self.duration_ms as u64 / 1000) as usize
    }

    /// Render the pulse as i16 PCM: two summed sines under a decay envelope
    pub fn render(&self) -> Vec<i16> {
        let length = self.duration_ms as f32 / 1000.0;
        (0..self.sample_count())
            .map(|i| {
                let t = i as f32 / self.sample_rate as f32;
                let envelope = (-self.decay * t / length).exp();
                let mix = ((TAU * self.low_hz * t).sin() + (TAU * self.high_hz * t).sin()) * 0.5;
                (mix * envelope * i16::MAX as f32 * 0.8) as i16
            })
            .collect()
    }
}

/// Platform capability that plays rendered PCM.
///
/// `play` queues the pulse and returns immediately; queued audio finishes on
/// its own, which is what lets `stop()` cancel the schedule without cutting
/// an in-flight pulse short.
pub trait ToneSink: Send + Sync + std::fmt::Debug {
    /// Queue one pulse for playout
    fn play(&self, samples: &[i16], sample_rate: u32) -> MediaResult<()>;
}

/// Periodic two-tone ringing cue
#[derive(Debug)]
pub struct RingtoneSynthesizer {
    sink: Option<Arc<dyn ToneSink>>,
    pulse: TonePulse,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RingtoneSynthesizer {
    /// Create a synthesizer over a sink construction result.
    ///
    /// A failed construction is logged and yields a silent synthesizer whose
    /// `start`/`stop` remain callable no-ops.
    pub fn new(sink: MediaResult<Arc<dyn ToneSink>>) -> Self {
        let sink = match sink {
            Ok(sink) => Some(sink),
            Err(error) => {
                warn!(%error, "tone synthesis unavailable, ringtone will be silent");
                None
            }
        };
        Self {
            sink,
            pulse: TonePulse::default(),
            interval: DEFAULT_RING_INTERVAL,
            task: Mutex::new(None),
        }
    }

    /// Create a synthesizer over a working sink
    pub fn with_sink(sink: Arc<dyn ToneSink>) -> Self {
        Self::new(Ok(sink))
    }

    /// A permanently silent synthesizer
    pub fn disabled() -> Self {
        Self {
            sink: None,
            pulse: TonePulse::default(),
            interval: DEFAULT_RING_INTERVAL,
            task: Mutex::new(None),
        }
    }

    /// Override the repetition period
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override the pulse parameters
    pub fn with_pulse(mut self, pulse: TonePulse) -> Self {
        self.pulse = pulse;
        self
    }

    /// Whether a sink is available
    pub fn is_audible(&self) -> bool {
        self.sink.is_some()
    }

    /// Whether the repeat schedule is running
    pub fn is_ringing(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    /// Emit one pulse immediately and repeat on the configured interval.
    /// No-op when already ringing or when the sink is unavailable.
    pub fn start(&self) {
        let Some(sink) = self.sink.clone() else {
            debug!("ringtone start requested but synthesis is disabled");
            return;
        };

        let mut task = self.task.lock();
        if task.as_ref().map(|t| !t.is_finished()).unwrap_or(false) {
            return;
        }

        let samples = self.pulse.render();
        let sample_rate = self.pulse.sample_rate;
        let period = self.interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                // the first tick completes immediately: pulse, then repeat
                ticker.tick().await;
                if let Err(error) = sink.play(&samples, sample_rate) {
                    warn!(%error, "ringtone pulse failed");
                }
            }
        }));
    }

    /// Cancel the repeat schedule. An in-flight pulse finishes naturally.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for RingtoneSynthesizer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sink that counts pulses instead of playing them; used by tests
#[derive(Debug, Default)]
pub struct MockToneSink {
    pulses: std::sync::atomic::AtomicUsize,
}

impl MockToneSink {
    /// Create a counting sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Pulses played so far
    pub fn pulse_count(&self) -> usize {
        self.pulses.load(std::sync::atomic::Ordering::Acquire)
    }
}

impl ToneSink for MockToneSink {
    fn play(&self, _samples: &[i16], _sample_rate: u32) -> MediaResult<()> {
        self.pulses.fetch_add(1, std::sync::atomic::Ordering::AcqRel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;

    #[test]
    fn pulse_renders_with_decaying_envelope() {
        let pulse = TonePulse::default();
        let samples = pulse.render();
        assert_eq!(samples.len(), pulse.sample_count());

        // energy at the head must exceed energy at the tail
        let head: i64 = samples[..400].iter().map(|s| (*s as i64).abs()).sum();
        let tail: i64 = samples[samples.len() - 400..]
            .iter()
            .map(|s| (*s as i64).abs())
            .sum();
        assert!(head > tail * 2, "head {head} tail {tail}");
    }

    #[tokio::test(start_paused = true)]
    async fn start_pulses_immediately_and_repeats() {
        let sink = Arc::new(MockToneSink::new());
        let ringtone = RingtoneSynthesizer::with_sink(sink.clone());

        ringtone.start();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(sink.pulse_count(), 1);

        tokio::time::sleep(Duration::from_millis(4100)).await;
        assert_eq!(sink.pulse_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_the_schedule() {
        let sink = Arc::new(MockToneSink::new());
        let ringtone = RingtoneSynthesizer::with_sink(sink.clone());

        ringtone.start();
        tokio::time::sleep(Duration::from_millis(2100)).await;
        let before = sink.pulse_count();
        assert!(before >= 2);

        ringtone.stop();
        assert!(!ringtone.is_ringing());
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(sink.pulse_count(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent_while_ringing() {
        let sink = Arc::new(MockToneSink::new());
        let ringtone = RingtoneSynthesizer::with_sink(sink.clone());

        ringtone.start();
        ringtone.start();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(sink.pulse_count(), 1);
    }

    #[tokio::test]
    async fn failed_sink_construction_degrades_to_silence() {
        let ringtone =
            RingtoneSynthesizer::new(Err(MediaError::unsupported("no audio output context")));
        assert!(!ringtone.is_audible());

        // callable without panicking or scheduling anything
        ringtone.start();
        assert!(!ringtone.is_ringing());
        ringtone.stop();
    }
}
