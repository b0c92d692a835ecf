//! Error types for device and media operations
//!
//! Every failure a capture feature can hit maps to one `MediaError` kind, and
//! every kind carries a distinct user-facing remediation message. The UI layer
//! surfaces the remediation text instead of the raw error; nothing in this
//! taxonomy is fatal to the hosting application.

use thiserror::Error;

/// Result type alias for media operations
pub type MediaResult<T> = Result<T, MediaError>;

/// Error kinds for capture, recording, and playback operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// The user (or platform policy) refused camera/microphone access
    #[error("camera or microphone access was denied")]
    PermissionDenied,

    /// No device matching the request is attached
    #[error("no capture device found: {detail}")]
    DeviceNotFound { detail: String },

    /// The device exists but is held by another application
    #[error("capture device is busy: {detail}")]
    DeviceBusy { detail: String },

    /// The requested constraint set cannot be satisfied by any device
    #[error("capture constraints cannot be satisfied: {detail}")]
    ConstraintsUnsatisfiable { detail: String },

    /// Media capture is disallowed in a non-secure context
    #[error("media capture requires a secure context")]
    EnvironmentInsecure,

    /// The platform lacks the capture capability entirely
    #[error("media capture is not supported: {detail}")]
    Unsupported { detail: String },

    /// No encoder is available for the requested recording format
    #[error("audio recording is unavailable: {reason}")]
    RecorderUnavailable { reason: String },

    /// A voice clip cannot be decoded or played on this platform
    #[error("voice clip cannot be played: {reason}")]
    PlaybackUnsupported { reason: String },
}

impl MediaError {
    /// Create a device-not-found error
    pub fn device_not_found(detail: impl Into<String>) -> Self {
        Self::DeviceNotFound { detail: detail.into() }
    }

    /// Create a device-busy error
    pub fn device_busy(detail: impl Into<String>) -> Self {
        Self::DeviceBusy { detail: detail.into() }
    }

    /// Create a constraints-unsatisfiable error
    pub fn constraints_unsatisfiable(detail: impl Into<String>) -> Self {
        Self::ConstraintsUnsatisfiable { detail: detail.into() }
    }

    /// Create an unsupported-platform error
    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::Unsupported { detail: detail.into() }
    }

    /// Create a recorder-unavailable error
    pub fn recorder_unavailable(reason: impl Into<String>) -> Self {
        Self::RecorderUnavailable { reason: reason.into() }
    }

    /// Create a playback-unsupported error
    pub fn playback_unsupported(reason: impl Into<String>) -> Self {
        Self::PlaybackUnsupported { reason: reason.into() }
    }

    /// Whether an acquisition should be retried once with a minimal
    /// constraint set before the error is surfaced.
    pub fn is_constraint_related(&self) -> bool {
        matches!(self, Self::ConstraintsUnsatisfiable { .. })
    }

    /// User-facing remediation text. The messages are deliberately distinct
    /// per kind because the remediation steps differ: "access denied" needs a
    /// settings change, "no device" needs hardware, "busy" needs another app
    /// closed, "insecure" needs a different origin.
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Camera or microphone access was denied. Allow access in your browser or system settings, then retry."
            }
            Self::DeviceNotFound { .. } => {
                "No camera or microphone was found. Connect a device or select a different one in settings."
            }
            Self::DeviceBusy { .. } => {
                "The camera or microphone is in use by another application. Close it and retry."
            }
            Self::ConstraintsUnsatisfiable { .. } => {
                "Your device does not support the requested quality profile. Retry with default settings."
            }
            Self::EnvironmentInsecure => {
                "Calls require a secure (HTTPS or localhost) connection. Reopen the dashboard over HTTPS."
            }
            Self::Unsupported { .. } => {
                "This platform cannot capture audio or video. Join from a supported browser or device."
            }
            Self::RecorderUnavailable { .. } => {
                "Voice recording is not available here. Send a text reply instead."
            }
            Self::PlaybackUnsupported { .. } => {
                "This voice clip cannot be played on this device."
            }
        }
    }

    /// Coarse grouping used for log fields and metrics
    pub fn category(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission",
            Self::DeviceNotFound { .. } | Self::DeviceBusy { .. } => "device",
            Self::ConstraintsUnsatisfiable { .. } => "constraints",
            Self::EnvironmentInsecure | Self::Unsupported { .. } => "environment",
            Self::RecorderUnavailable { .. } => "recorder",
            Self::PlaybackUnsupported { .. } => "playback",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn remediation_messages_are_distinct_per_kind() {
        let errors = vec![
            MediaError::PermissionDenied,
            MediaError::device_not_found("camera"),
            MediaError::device_busy("mic"),
            MediaError::constraints_unsatisfiable("1080p"),
            MediaError::EnvironmentInsecure,
            MediaError::unsupported("no capture api"),
            MediaError::recorder_unavailable("no opus encoder"),
            MediaError::playback_unsupported("bad container"),
        ];
        let messages: HashSet<&str> = errors.iter().map(|e| e.remediation()).collect();
        assert_eq!(messages.len(), errors.len());
    }

    #[test]
    fn only_constraint_failures_trigger_fallback() {
        assert!(MediaError::constraints_unsatisfiable("x").is_constraint_related());
        assert!(!MediaError::PermissionDenied.is_constraint_related());
        assert!(!MediaError::device_busy("x").is_constraint_related());
    }
}
