//! Media Device Manager
//!
//! The sole owner of camera/microphone acquisition policy. Every feature that
//! needs live hardware asks the manager for a [`MediaAcquisition`] under a
//! named [`AcquisitionPurpose`]; the manager guarantees that at most one
//! acquisition exists per purpose and that starting a new one releases the
//! prior one first.
//!
//! An acquisition is a scoped guard: `release()` stops every track and is
//! idempotent, and the final owner dropping the guard stops the tracks as a
//! backstop. Callers are still expected to release explicitly on every exit
//! path (close, error, teardown); the drop impl exists so a panic or missed
//! path cannot strand a live device.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::device::platform::MediaBackend;
use crate::device::types::{AcquisitionPurpose, MediaConstraints, MediaKind, MediaTrack};
use crate::error::{MediaError, MediaResult};

#[derive(Debug)]
struct AcquisitionInner {
    purpose: AcquisitionPurpose,
    tracks: Vec<MediaTrack>,
    released: AtomicBool,
    acquired_at: DateTime<Utc>,
}

impl AcquisitionInner {
    fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            for track in &self.tracks {
                track.stop();
            }
            debug!(purpose = %self.purpose, tracks = self.tracks.len(), "acquisition released");
        }
    }
}

impl Drop for AcquisitionInner {
    fn drop(&mut self) {
        self.release();
    }
}

/// A live handle over the tracks opened for one purpose.
///
/// Cloning is cheap and shares the underlying tracks; releasing through any
/// clone releases them all.
#[derive(Debug, Clone)]
pub struct MediaAcquisition {
    inner: Arc<AcquisitionInner>,
}

impl MediaAcquisition {
    fn new(purpose: AcquisitionPurpose, tracks: Vec<MediaTrack>) -> Self {
        Self {
            inner: Arc::new(AcquisitionInner {
                purpose,
                tracks,
                released: AtomicBool::new(false),
                acquired_at: Utc::now(),
            }),
        }
    }

    /// The purpose this acquisition was made for
    pub fn purpose(&self) -> AcquisitionPurpose {
        self.inner.purpose
    }

    /// When the acquisition was established
    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.inner.acquired_at
    }

    /// All tracks in the acquisition
    pub fn tracks(&self) -> &[MediaTrack] {
        &self.inner.tracks
    }

    /// The camera track, if one was requested and opened
    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.inner.tracks.iter().find(|t| t.kind() == MediaKind::Video)
    }

    /// The microphone track, if one was requested and opened
    pub fn audio_track(&self) -> Option<&MediaTrack> {
        self.inner.tracks.iter().find(|t| t.kind() == MediaKind::Audio)
    }

    /// Whether `release` has already run
    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    /// Stop every track. Subsequent calls are no-ops.
    pub fn release(&self) {
        self.inner.release();
    }
}

/// Acquisition policy and registry for capture devices
#[derive(Debug)]
pub struct MediaDeviceManager {
    backend: Arc<dyn MediaBackend>,
    active: DashMap<AcquisitionPurpose, MediaAcquisition>,
}

impl MediaDeviceManager {
    /// Create a manager over the given platform backend
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            backend,
            active: DashMap::new(),
        }
    }

    /// The platform backend, for features that sample it directly
    /// (level metering in the device-test modal).
    pub fn backend(&self) -> Arc<dyn MediaBackend> {
        self.backend.clone()
    }

    /// Acquire tracks for a purpose.
    ///
    /// Any prior acquisition for the same purpose is released first. The
    /// ideal constraint set is attempted once; a constraint-related rejection
    /// is retried once with [`MediaConstraints::minimal`] before the error is
    /// surfaced. All failures map to the `MediaError` taxonomy and none is
    /// fatal to the calling feature.
    pub async fn acquire(
        &self,
        purpose: AcquisitionPurpose,
        constraints: MediaConstraints,
    ) -> MediaResult<MediaAcquisition> {
        if let Some((_, prior)) = self.active.remove(&purpose) {
            warn!(%purpose, "replacing outstanding acquisition");
            prior.release();
        }

        if !self.backend.is_secure_context() {
            return Err(MediaError::EnvironmentInsecure);
        }

        let tracks = match self.backend.open_tracks(&constraints).await {
            Ok(tracks) => tracks,
            Err(error) if error.is_constraint_related() => {
                let minimal = constraints.minimal();
                warn!(%error, %purpose, "ideal constraints rejected, retrying with minimal set");
                self.backend.open_tracks(&minimal).await?
            }
            Err(error) => {
                debug!(%error, %purpose, "acquisition failed");
                return Err(error);
            }
        };

        let acquisition = MediaAcquisition::new(purpose, tracks);
        self.active.insert(purpose, acquisition.clone());
        info!(
            %purpose,
            video = acquisition.video_track().is_some(),
            audio = acquisition.audio_track().is_some(),
            "media acquisition established"
        );
        Ok(acquisition)
    }

    /// Release the acquisition registered for a purpose.
    /// No-op when none is outstanding.
    pub fn release(&self, purpose: AcquisitionPurpose) {
        if let Some((_, acquisition)) = self.active.remove(&purpose) {
            acquisition.release();
        }
    }

    /// Release every outstanding acquisition (component teardown)
    pub fn release_all(&self) {
        let purposes: Vec<AcquisitionPurpose> = self.active.iter().map(|e| *e.key()).collect();
        for purpose in purposes {
            self.release(purpose);
        }
    }

    /// The acquisition currently registered for a purpose, if any
    pub fn acquisition(&self, purpose: AcquisitionPurpose) -> Option<MediaAcquisition> {
        self.active.get(&purpose).map(|e| e.value().clone())
    }

    /// Whether an unreleased acquisition is registered for a purpose
    pub fn has_acquisition(&self, purpose: AcquisitionPurpose) -> bool {
        self.active
            .get(&purpose)
            .map(|e| !e.value().is_released())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::platform::MockMediaBackend;

    fn manager() -> (MediaDeviceManager, Arc<MockMediaBackend>) {
        let backend = Arc::new(MockMediaBackend::new());
        (MediaDeviceManager::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let (manager, backend) = manager();
        let acq = manager
            .acquire(AcquisitionPurpose::Call, MediaConstraints::call_defaults())
            .await
            .unwrap();

        manager.release(AcquisitionPurpose::Call);
        manager.release(AcquisitionPurpose::Call);
        acq.release();

        assert!(acq.is_released());
        assert_eq!(backend.live_track_count(), 0);
    }

    #[tokio::test]
    async fn acquiring_same_purpose_releases_prior() {
        let (manager, backend) = manager();
        let first = manager
            .acquire(AcquisitionPurpose::Call, MediaConstraints::call_defaults())
            .await
            .unwrap();
        let second = manager
            .acquire(AcquisitionPurpose::Call, MediaConstraints::call_defaults())
            .await
            .unwrap();

        assert!(first.is_released());
        assert!(!second.is_released());
        // only the second acquisition's camera+mic remain live
        assert_eq!(backend.live_track_count(), 2);
    }

    #[tokio::test]
    async fn distinct_purposes_coexist() {
        let (manager, backend) = manager();
        let call = manager
            .acquire(AcquisitionPurpose::Call, MediaConstraints::call_defaults())
            .await
            .unwrap();
        let test = manager
            .acquire(AcquisitionPurpose::MicrophoneTest, MediaConstraints::audio_only())
            .await
            .unwrap();

        assert!(!call.is_released());
        assert!(!test.is_released());
        assert_eq!(backend.live_track_count(), 3);

        manager.release_all();
        assert_eq!(backend.live_track_count(), 0);
    }

    #[tokio::test]
    async fn constraint_rejection_retries_once_with_minimal_set() {
        let (manager, backend) = manager();
        backend.fail_next(MediaError::constraints_unsatisfiable("1280x720 unsupported"));

        let acq = manager
            .acquire(AcquisitionPurpose::Call, MediaConstraints::call_defaults())
            .await
            .unwrap();
        assert!(acq.video_track().is_some());

        let seen = backend.seen_constraints();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], MediaConstraints::call_defaults());
        assert_eq!(seen[1], MediaConstraints::call_defaults().minimal());
    }

    #[tokio::test]
    async fn non_constraint_errors_surface_without_retry() {
        let (manager, backend) = manager();
        backend.fail_next(MediaError::PermissionDenied);

        let result = manager
            .acquire(AcquisitionPurpose::Call, MediaConstraints::call_defaults())
            .await;
        assert_eq!(result.unwrap_err(), MediaError::PermissionDenied);
        assert_eq!(backend.request_count(), 1);
        assert!(!manager.has_acquisition(AcquisitionPurpose::Call));
    }

    #[tokio::test]
    async fn insecure_context_is_rejected_before_the_backend_is_asked() {
        let backend = Arc::new(MockMediaBackend::insecure());
        let manager = MediaDeviceManager::new(backend.clone());

        let result = manager
            .acquire(AcquisitionPurpose::CameraTest, MediaConstraints::video_only())
            .await;
        assert_eq!(result.unwrap_err(), MediaError::EnvironmentInsecure);
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn dropping_the_last_handle_stops_tracks() {
        let (manager, backend) = manager();
        let acq = manager
            .acquire(AcquisitionPurpose::CameraTest, MediaConstraints::video_only())
            .await
            .unwrap();
        assert_eq!(backend.live_track_count(), 1);

        // registry holds one clone, caller holds the other
        drop(acq);
        assert_eq!(backend.live_track_count(), 1);

        // removing the registry entry drops the final owner
        manager.release(AcquisitionPurpose::CameraTest);
        assert_eq!(backend.live_track_count(), 0);
    }
}
