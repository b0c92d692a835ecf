//! Controller events for UI integration
//!
//! The controller reports every observable change over an unbounded channel
//! handed out at construction. Sends never block and a dropped receiver is
//! tolerated, so event emission can happen inside state transitions.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use livecall_device_core::{MediaError, MediaKind};

use crate::call::{CallId, CallState};

/// Receiving half of the controller's event stream
pub type CallEventReceiver = mpsc::UnboundedReceiver<CallEvent>;

pub(crate) type CallEventSender = mpsc::UnboundedSender<CallEvent>;

/// Something the call UI needs to react to
#[derive(Debug, Clone)]
pub enum CallEvent {
    /// The local call state machine moved
    StateChanged {
        /// Session identifier, absent for the initial idle state
        call_id: Option<CallId>,
        /// State before the transition
        previous: CallState,
        /// State after the transition
        state: CallState,
        /// Human-readable cause ("call answered", "remote declined", ...)
        reason: Option<String>,
        /// When the transition happened
        timestamp: DateTime<Utc>,
    },

    /// Media acquisition completed for the active call
    MediaAcquired {
        call_id: CallId,
        has_video: bool,
        has_audio: bool,
    },

    /// Media acquisition failed; the call continues without local media.
    /// `remediation` is the user-facing message for the retry affordance.
    MediaFailed {
        call_id: CallId,
        error: MediaError,
        remediation: String,
    },

    /// A track's enabled state was flipped (mute / camera toggle)
    TrackToggled {
        call_id: CallId,
        kind: MediaKind,
        enabled: bool,
    },
}
