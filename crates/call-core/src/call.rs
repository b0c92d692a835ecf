//! Call model: the signaling wire records and the local state machine
//!
//! Two lifecycles live here and must not be conflated:
//!
//! - [`SessionStatus`] is the *remote* session status stored in the signaling
//!   channel and shared by both endpoints. Its transitions are monotone along
//!   `ringing -> {answered, declined} -> ended`; `ringing` is never revisited.
//! - [`CallState`] is the *local* endpoint's view driven by
//!   `CallSessionController`, which additionally has `Idle` before a call
//!   exists and `Connected` while media flows.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use livecall_device_core::MediaError;

/// Opaque call identifier minted by the signaling store
pub type CallId = String;

/// Remote session status as stored in the signaling channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created, awaiting the receiver
    Ringing,
    /// Receiver accepted
    Answered,
    /// Receiver refused before connecting (terminal)
    Declined,
    /// Either endpoint hung up (terminal)
    Ended,
}

impl SessionStatus {
    /// Whether the status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Declined | SessionStatus::Ended)
    }

    /// Whether the monotone lifecycle permits moving to `next`
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        match (self, next) {
            (SessionStatus::Ringing, SessionStatus::Answered)
            | (SessionStatus::Ringing, SessionStatus::Declined)
            | (SessionStatus::Ringing, SessionStatus::Ended)
            | (SessionStatus::Answered, SessionStatus::Ended) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Ringing => "ringing",
            SessionStatus::Answered => "answered",
            SessionStatus::Declined => "declined",
            SessionStatus::Ended => "ended",
        };
        write!(f, "{s}")
    }
}

/// One call session record as exchanged with the signaling channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSession {
    /// Opaque token identifying the session
    pub call_id: CallId,
    /// Caller identity (email)
    pub caller_id: String,
    /// Caller display name
    pub caller_display_name: String,
    /// Receiver identity (email)
    pub receiver_id: String,
    /// Receiver display name
    pub receiver_display_name: String,
    /// Current lifecycle status
    pub status: SessionStatus,
    /// When the session was created
    pub started_at: DateTime<Utc>,
    /// When the session reached a terminal status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Connected duration, present once ended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
}

impl CallSession {
    /// Whether the given identity is caller or receiver of this session
    pub fn involves(&self, user_id: &str) -> bool {
        self.caller_id == user_id || self.receiver_id == user_id
    }
}

/// Body of the session-creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallRequest {
    /// Caller identity (email)
    pub caller_email: String,
    /// Caller display name
    pub caller_name: String,
    /// Receiver identity (email)
    pub receiver_email: String,
    /// Receiver display name
    pub receiver_name: String,
}

/// Local endpoint call state driven by `CallSessionController`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallState {
    /// No call exists yet
    Idle,
    /// Call placed or received, awaiting connection
    Ringing,
    /// Call connected, media may flow
    Connected,
    /// Refused before connecting (terminal)
    Declined,
    /// Ended (terminal)
    Ended,
}

impl CallState {
    /// Whether the state admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Declined | CallState::Ended)
    }

    /// Whether a call exists and is not yet over
    pub fn is_in_progress(&self) -> bool {
        matches!(self, CallState::Ringing | CallState::Connected)
    }

    /// Whether media can flow
    pub fn is_active(&self) -> bool {
        matches!(self, CallState::Connected)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallState::Idle => "idle",
            CallState::Ringing => "ringing",
            CallState::Connected => "connected",
            CallState::Declined => "declined",
            CallState::Ended => "ended",
        };
        write!(f, "{s}")
    }
}

/// Direction of a call from the local endpoint's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallDirection {
    /// Placed from this endpoint
    Outgoing,
    /// Received from the signaling channel
    Incoming,
}

/// One call participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    /// Stable identity (email)
    pub user_id: String,
    /// Name shown in the call UI
    pub display_name: String,
}

impl PeerInfo {
    /// Create a participant record
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Snapshot of the controller's active call
#[derive(Debug, Clone)]
pub struct CallInfo {
    /// Session identifier (locally minted when signaling was unreachable)
    pub call_id: CallId,
    /// Current local state
    pub state: CallState,
    /// Direction from this endpoint
    pub direction: CallDirection,
    /// The other participant
    pub peer: PeerInfo,
    /// When the call was created locally
    pub created_at: DateTime<Utc>,
    /// When the call connected, if it did
    pub connected_at: Option<DateTime<Utc>>,
    /// When the call reached a terminal state, if it did
    pub ended_at: Option<DateTime<Utc>>,
    /// Whether the call runs without a signaling-backed session
    pub local_only: bool,
    /// The most recent media acquisition failure, if unresolved
    pub last_media_error: Option<MediaError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_status_is_monotone() {
        use SessionStatus::*;

        assert!(Ringing.can_transition_to(Answered));
        assert!(Ringing.can_transition_to(Declined));
        assert!(Ringing.can_transition_to(Ended));
        assert!(Answered.can_transition_to(Ended));

        // ringing is never revisited, terminals admit nothing
        for from in [Answered, Declined, Ended] {
            assert!(!from.can_transition_to(Ringing));
        }
        for next in [Ringing, Answered, Declined, Ended] {
            assert!(!Declined.can_transition_to(next));
            assert!(!Ended.can_transition_to(next));
        }
    }

    #[test]
    fn call_session_uses_the_wire_field_names() {
        let session = CallSession {
            call_id: "call-1".into(),
            caller_id: "agent@desk.example".into(),
            caller_display_name: "Agent".into(),
            receiver_id: "jane@customer.example".into(),
            receiver_display_name: "Jane Doe".into(),
            status: SessionStatus::Ringing,
            started_at: Utc::now(),
            ended_at: None,
            duration_seconds: None,
        };

        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"callId\":\"call-1\""));
        assert!(json.contains("\"status\":\"ringing\""));
        assert!(!json.contains("endedAt"));

        let back: CallSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn create_request_matches_the_rest_body() {
        let request = CreateCallRequest {
            caller_email: "agent@desk.example".into(),
            caller_name: "Agent".into(),
            receiver_email: "jane@customer.example".into(),
            receiver_name: "Jane Doe".into(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"callerEmail\""));
        assert!(json.contains("\"receiverName\""));
    }
}
