//! Capture-device acquisition
//!
//! ```text
//! ┌─────────────────────┐    ┌─────────────────────┐    ┌─────────────────────┐
//! │  Call / test modal  │    │ MediaDeviceManager  │    │   MediaBackend      │
//! │                     │───▶│ purpose registry    │───▶│ platform capture    │
//! │ acquire / release   │    │ constraint fallback │    │ (mock / embedder)   │
//! └─────────────────────┘    └─────────────────────┘    └─────────────────────┘
//! ```
//!
//! Acquisition policy lives in [`manager::MediaDeviceManager`]; the platform
//! seam is [`platform::MediaBackend`]. The invariants enforced here:
//!
//! - at most one [`MediaAcquisition`] per [`AcquisitionPurpose`],
//! - every track stopped on release, on every exit path,
//! - ideal constraints retried once with the minimal set before erroring.

pub mod manager;
pub mod platform;
pub mod types;

pub use manager::{MediaAcquisition, MediaDeviceManager};
pub use platform::{default_backend, MediaBackend, MockDevice, MockMediaBackend};
pub use types::{
    AcquisitionPurpose, AudioConstraints, MediaConstraints, MediaKind, MediaTrack,
    VideoConstraints,
};
