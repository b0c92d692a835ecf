//! Platform capture backends
//!
//! The [`MediaBackend`] trait is the seam between acquisition policy and the
//! platform's actual capture capability (a browser's user-media API, an OS
//! capture stack, ...). The hosting application supplies the production
//! implementation; this crate ships [`MockMediaBackend`], an in-memory
//! backend used by tests, examples, and local development.

use std::sync::Arc;

use async_trait::async_trait;

use crate::device::types::{MediaConstraints, MediaTrack};
use crate::error::MediaResult;

pub mod mock_impl;

pub use mock_impl::{MockDevice, MockMediaBackend};

/// Platform capture capability.
///
/// Implementations classify their native failures into the `MediaError`
/// taxonomy; the manager layer never inspects platform-specific errors.
#[async_trait]
pub trait MediaBackend: Send + Sync + std::fmt::Debug {
    /// Whether the hosting context is allowed to capture at all.
    /// Non-secure origins must report `false`.
    fn is_secure_context(&self) -> bool;

    /// Open live tracks for the requested constraint set.
    ///
    /// Returns one track per requested device slot (camera, microphone).
    async fn open_tracks(&self, constraints: &MediaConstraints) -> MediaResult<Vec<MediaTrack>>;

    /// Sample the instantaneous input level of a live audio track,
    /// normalized to `0.0..=1.0`.
    fn sample_level(&self, track: &MediaTrack) -> MediaResult<f32>;
}

/// Backend used when the embedder does not supply one: the in-memory mock.
/// Production deployments pass their own [`MediaBackend`] instead.
pub fn default_backend() -> Arc<dyn MediaBackend> {
    Arc::new(MockMediaBackend::new())
}
