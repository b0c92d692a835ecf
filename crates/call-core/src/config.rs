//! Client configuration
//!
//! One config struct covers the controller and the sync client. Every knob
//! has a production default; tests shrink the intervals instead of mocking
//! the clock configuration away.

use std::time::Duration;

use url::Url;

use livecall_device_core::MediaConstraints;

use crate::call::PeerInfo;

/// Configuration for a livecall endpoint
#[derive(Debug, Clone)]
pub struct CallClientConfig {
    /// Identity this endpoint signs signaling requests with
    pub local_user: PeerInfo,
    /// Signaling REST base URL; `None` selects in-memory (local-only) signaling
    pub signaling_url: Option<Url>,
    /// Cadence of the call-state sync poll
    pub poll_interval: Duration,
    /// Cadence of the ringtone pulse
    pub ringtone_interval: Duration,
    /// Cadence of recorded audio fragments
    pub chunk_interval: Duration,
    /// When set, an outgoing call connects itself after this delay unless a
    /// remote answer arrives first
    pub auto_accept_delay: Option<Duration>,
    /// Constraint set requested for call media
    pub media_constraints: MediaConstraints,
}

impl CallClientConfig {
    /// Create a config for the given local identity with production defaults
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            local_user: PeerInfo::new(user_id, display_name),
            signaling_url: None,
            poll_interval: Duration::from_secs(2),
            ringtone_interval: Duration::from_secs(2),
            chunk_interval: Duration::from_millis(100),
            auto_accept_delay: None,
            media_constraints: MediaConstraints::call_defaults(),
        }
    }

    /// Point the client at a signaling REST endpoint
    pub fn with_signaling_url(mut self, url: Url) -> Self {
        self.signaling_url = Some(url);
        self
    }

    /// Override the sync poll cadence
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the ringtone pulse cadence
    pub fn with_ringtone_interval(mut self, interval: Duration) -> Self {
        self.ringtone_interval = interval;
        self
    }

    /// Override the recording fragment cadence
    pub fn with_chunk_interval(mut self, interval: Duration) -> Self {
        self.chunk_interval = interval;
        self
    }

    /// Arm the local auto-accept timer for outgoing calls
    pub fn with_auto_accept_delay(mut self, delay: Duration) -> Self {
        self.auto_accept_delay = Some(delay);
        self
    }

    /// Override the media constraint set requested for calls
    pub fn with_media_constraints(mut self, constraints: MediaConstraints) -> Self {
        self.media_constraints = constraints;
        self
    }
}
