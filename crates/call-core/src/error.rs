//! Error types for call and signaling operations

use thiserror::Error;

use livecall_device_core::MediaError;

use crate::call::{CallState, SessionStatus};

/// Result type alias for call-core operations
pub type CallResult<T> = Result<T, CallError>;

/// Error kinds for call lifecycle and signaling operations
#[derive(Error, Debug, Clone)]
pub enum CallError {
    /// An operation was invoked in a state it is not valid for
    #[error("invalid call state: expected {expected}, current state is {actual}")]
    InvalidCallState {
        expected: &'static str,
        actual: CallState,
    },

    /// An operation needs an active call and none exists
    #[error("no active call")]
    NoActiveCall,

    /// A remote session arrived in a status the operation cannot adopt
    #[error("unexpected session status: expected {expected}, got {actual}")]
    UnexpectedSessionStatus {
        expected: SessionStatus,
        actual: SessionStatus,
    },

    /// The signaling channel could not be reached or answered garbage.
    /// Degrades the client to local-only operation; never fatal.
    #[error("signaling unavailable: {reason}")]
    SignalingUnavailable { reason: String },

    /// A device/recording/playback failure, passed through from device-core
    #[error(transparent)]
    Media(#[from] MediaError),
}

impl CallError {
    /// Create a signaling-unavailable error
    pub fn signaling_unavailable(reason: impl Into<String>) -> Self {
        Self::SignalingUnavailable { reason: reason.into() }
    }

    /// Create an invalid-state error
    pub fn invalid_state(expected: &'static str, actual: CallState) -> Self {
        Self::InvalidCallState { expected, actual }
    }

    /// Whether a retry may succeed without user intervention
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SignalingUnavailable { .. })
    }

    /// Coarse grouping used for log fields and metrics
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidCallState { .. }
            | Self::NoActiveCall
            | Self::UnexpectedSessionStatus { .. } => "state",
            Self::SignalingUnavailable { .. } => "signaling",
            Self::Media(_) => "media",
        }
    }
}
