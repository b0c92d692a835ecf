//! Call session controller
//!
//! The single source of truth for one call's lifecycle on the local
//! endpoint. States move `Idle -> Ringing -> Connected -> Ended`, with
//! `Ringing -> Declined` as the alternate terminal; terminal states are
//! absorbing.
//!
//! Media acquisition is deliberately non-blocking: `start()` transitions to
//! `Ringing` and returns while a spawned task awaits the hardware. A failed
//! acquisition never terminates the call (audio-only or signaling-only
//! participation stays valid); it surfaces a `MediaFailed` event with a
//! remediation message and leaves `retry_media()` as the retry affordance.
//!
//! Resource safety: `end()` and `decline()` stop the ringtone, release the
//! held acquisition, and cancel the auto-accept timer in the same turn. An
//! acquisition that completes after the call reached a terminal state is
//! released by the acquisition task itself.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use livecall_device_core::device::{AcquisitionPurpose, MediaAcquisition, MediaDeviceManager};
use livecall_device_core::{MediaError, MediaKind, RingtoneSynthesizer};

use crate::call::{CallDirection, CallId, CallInfo, CallSession, CallState, CreateCallRequest, PeerInfo, SessionStatus};
use crate::config::CallClientConfig;
use crate::error::{CallError, CallResult};
use crate::events::{CallEvent, CallEventReceiver, CallEventSender};
use crate::sync::SignalingTransport;

#[derive(Debug)]
struct ActiveCall {
    call_id: CallId,
    peer: PeerInfo,
    direction: CallDirection,
    created_at: chrono::DateTime<Utc>,
    connected_at: Option<chrono::DateTime<Utc>>,
    ended_at: Option<chrono::DateTime<Utc>>,
    local_only: bool,
    acquisition: Option<MediaAcquisition>,
    last_media_error: Option<MediaError>,
    media_task: Option<JoinHandle<()>>,
    accept_timer: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct CallCore {
    state: CallState,
    active: Option<ActiveCall>,
}

fn set_state(core: &mut CallCore, next: CallState, reason: &str, events: &CallEventSender) {
    let previous = core.state;
    if previous == next {
        return;
    }
    core.state = next;
    info!(%previous, state = %next, reason, "call state changed");
    let _ = events.send(CallEvent::StateChanged {
        call_id: core.active.as_ref().map(|a| a.call_id.clone()),
        previous,
        state: next,
        reason: Some(reason.to_string()),
        timestamp: Utc::now(),
    });
}

/// Drives one call's lifecycle and mediates the user-facing controls
#[derive(Debug)]
pub struct CallSessionController {
    config: CallClientConfig,
    media: Arc<MediaDeviceManager>,
    ringtone: Arc<RingtoneSynthesizer>,
    signaling: Arc<dyn SignalingTransport>,
    core: Arc<Mutex<CallCore>>,
    event_tx: CallEventSender,
}

impl CallSessionController {
    /// Create a controller and the event stream the UI consumes
    pub fn new(
        config: CallClientConfig,
        media: Arc<MediaDeviceManager>,
        ringtone: Arc<RingtoneSynthesizer>,
        signaling: Arc<dyn SignalingTransport>,
    ) -> (Arc<Self>, CallEventReceiver) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let controller = Arc::new(Self {
            config,
            media,
            ringtone,
            signaling,
            core: Arc::new(Mutex::new(CallCore {
                state: CallState::Idle,
                active: None,
            })),
            event_tx,
        });
        (controller, event_rx)
    }

    /// The configuration this controller runs with
    pub fn config(&self) -> &CallClientConfig {
        &self.config
    }

    /// Current local call state
    pub async fn state(&self) -> CallState {
        self.core.lock().await.state
    }

    /// Snapshot of the active (or finished) call, if one exists
    pub async fn call_info(&self) -> Option<CallInfo> {
        let core = self.core.lock().await;
        core.active.as_ref().map(|active| CallInfo {
            call_id: active.call_id.clone(),
            state: core.state,
            direction: active.direction,
            peer: active.peer.clone(),
            created_at: active.created_at,
            connected_at: active.connected_at,
            ended_at: active.ended_at,
            local_only: active.local_only,
            last_media_error: active.last_media_error.clone(),
        })
    }

    /// Place an outgoing call. Valid only from `Idle`.
    ///
    /// Requests a session from the signaling channel (degrading to a
    /// locally-minted id when the channel is unreachable or refuses),
    /// transitions to `Ringing`, starts the ringtone, and spawns the media
    /// acquisition without blocking.
    pub async fn start(&self, peer: PeerInfo) -> CallResult<CallId> {
        {
            let core = self.core.lock().await;
            if core.state != CallState::Idle {
                return Err(CallError::invalid_state("idle", core.state));
            }
        }

        let request = CreateCallRequest {
            caller_email: self.config.local_user.user_id.clone(),
            caller_name: self.config.local_user.display_name.clone(),
            receiver_email: peer.user_id.clone(),
            receiver_name: peer.display_name.clone(),
        };
        let (call_id, local_only) = match self.signaling.create_call(&request).await {
            Ok(Some(session)) => (session.call_id, false),
            Ok(None) => {
                warn!("signaling rejected call creation, continuing local-only");
                (local_call_id(), true)
            }
            Err(error) => {
                warn!(%error, "signaling unreachable, continuing local-only");
                (local_call_id(), true)
            }
        };

        let mut core = self.core.lock().await;
        if core.state != CallState::Idle {
            // lost a race while the signaling request was in flight
            return Err(CallError::invalid_state("idle", core.state));
        }

        core.active = Some(ActiveCall {
            call_id: call_id.clone(),
            peer,
            direction: CallDirection::Outgoing,
            created_at: Utc::now(),
            connected_at: None,
            ended_at: None,
            local_only,
            acquisition: None,
            last_media_error: None,
            media_task: None,
            accept_timer: None,
        });
        set_state(&mut core, CallState::Ringing, "call placed", &self.event_tx);
        self.ringtone.start();

        let media_task = self.spawn_acquisition(call_id.clone());
        if let Some(delay) = self.config.auto_accept_delay {
            let timer = self.spawn_auto_accept(delay);
            if let Some(active) = core.active.as_mut() {
                active.accept_timer = Some(timer);
            }
        }
        if let Some(active) = core.active.as_mut() {
            active.media_task = Some(media_task);
        }
        Ok(call_id)
    }

    /// Adopt a ringing session observed for this endpoint (receiver side).
    /// Valid only from `Idle`.
    pub async fn attach_incoming(&self, session: &CallSession) -> CallResult<()> {
        if session.status != SessionStatus::Ringing {
            return Err(CallError::UnexpectedSessionStatus {
                expected: SessionStatus::Ringing,
                actual: session.status,
            });
        }

        let mut core = self.core.lock().await;
        if core.state != CallState::Idle {
            return Err(CallError::invalid_state("idle", core.state));
        }

        core.active = Some(ActiveCall {
            call_id: session.call_id.clone(),
            peer: PeerInfo::new(&session.caller_id, &session.caller_display_name),
            direction: CallDirection::Incoming,
            created_at: session.started_at,
            connected_at: None,
            ended_at: None,
            local_only: false,
            acquisition: None,
            last_media_error: None,
            media_task: None,
            accept_timer: None,
        });
        set_state(&mut core, CallState::Ringing, "incoming call", &self.event_tx);
        self.ringtone.start();

        let media_task = self.spawn_acquisition(session.call_id.clone());
        if let Some(active) = core.active.as_mut() {
            active.media_task = Some(media_task);
        }
        Ok(())
    }

    /// Mark the call connected. Valid only from `Ringing`; stops the
    /// ringtone and cancels the auto-accept timer.
    pub async fn mark_connected(&self) -> CallResult<()> {
        Self::transition_to_connected(&self.core, &self.ringtone, &self.event_tx, "call answered")
            .await
    }

    /// Answer an incoming ringing call: notify the signaling channel, then
    /// connect locally.
    pub async fn answer(&self) -> CallResult<()> {
        let call_id = {
            let core = self.core.lock().await;
            if core.state != CallState::Ringing {
                return Err(CallError::invalid_state("ringing", core.state));
            }
            let active = core.active.as_ref().ok_or(CallError::NoActiveCall)?;
            (!active.local_only).then(|| active.call_id.clone())
        };

        if let Some(call_id) = call_id {
            match self.signaling.answer(&call_id).await {
                Ok(acknowledged) => {
                    if !acknowledged {
                        debug!(%call_id, "signaling did not acknowledge the answer");
                    }
                }
                Err(error) => warn!(%error, "could not notify signaling of the answer"),
            }
        }
        Self::transition_to_connected(&self.core, &self.ringtone, &self.event_tx, "call answered")
            .await
    }

    /// Flip the camera track's enabled state. Reported no-op (`Ok(None)`)
    /// when no acquisition or no such track is held yet.
    pub async fn toggle_video(&self) -> CallResult<Option<bool>> {
        self.toggle_track(MediaKind::Video).await
    }

    /// Flip the microphone track's enabled state. Reported no-op
    /// (`Ok(None)`) when no acquisition or no such track is held yet.
    pub async fn toggle_audio(&self) -> CallResult<Option<bool>> {
        self.toggle_track(MediaKind::Audio).await
    }

    async fn toggle_track(&self, kind: MediaKind) -> CallResult<Option<bool>> {
        let core = self.core.lock().await;
        if !core.state.is_in_progress() {
            return Err(CallError::invalid_state("an in-progress call", core.state));
        }
        let active = core.active.as_ref().ok_or(CallError::NoActiveCall)?;

        let Some(acquisition) = active.acquisition.as_ref() else {
            warn!(%kind, "track toggle requested before media acquisition completed");
            return Ok(None);
        };
        let track = match kind {
            MediaKind::Video => acquisition.video_track(),
            MediaKind::Audio => acquisition.audio_track(),
        };
        let Some(track) = track else {
            warn!(%kind, "acquisition holds no such track");
            return Ok(None);
        };

        let enabled = track.toggle_enabled();
        debug!(%kind, enabled, "track toggled");
        let _ = self.event_tx.send(CallEvent::TrackToggled {
            call_id: active.call_id.clone(),
            kind,
            enabled,
        });
        Ok(Some(enabled))
    }

    /// Re-run media acquisition after a failure, while the call is live.
    /// No-op when an acquisition is already held or one is in flight.
    pub async fn retry_media(&self) -> CallResult<()> {
        let mut core = self.core.lock().await;
        if !core.state.is_in_progress() {
            return Err(CallError::invalid_state("an in-progress call", core.state));
        }
        let active = core.active.as_mut().ok_or(CallError::NoActiveCall)?;

        if active.acquisition.is_some() {
            return Ok(());
        }
        if active
            .media_task
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
        {
            debug!("media acquisition already in flight");
            return Ok(());
        }

        let call_id = active.call_id.clone();
        active.media_task = Some(self.spawn_acquisition(call_id));
        Ok(())
    }

    /// End the call. Valid from any state; terminal states and `Idle` make
    /// it a no-op, so calling `end()` twice observes the same result as once.
    pub async fn end(&self) -> CallResult<()> {
        let notify = {
            let mut core = self.core.lock().await;
            if core.state.is_terminal() {
                debug!("end() on a finished call is a no-op");
                return Ok(());
            }
            if core.state == CallState::Idle {
                return Ok(());
            }

            self.ringtone.stop();
            let notify = core.active.as_mut().and_then(|active| {
                if let Some(timer) = active.accept_timer.take() {
                    timer.abort();
                }
                if let Some(acquisition) = active.acquisition.take() {
                    acquisition.release();
                }
                active.ended_at = Some(Utc::now());
                (!active.local_only).then(|| active.call_id.clone())
            });
            set_state(&mut core, CallState::Ended, "call ended locally", &self.event_tx);
            notify
            // an acquisition still in flight is released by its own task
            // when it observes the terminal state
        };

        if let Some(call_id) = notify {
            if let Err(error) = self.signaling.end_call(&call_id).await {
                warn!(%error, "could not notify signaling of call end");
            }
        }
        Ok(())
    }

    /// Decline an incoming ringing call (alternate terminal).
    pub async fn decline(&self) -> CallResult<()> {
        let notify = {
            let mut core = self.core.lock().await;
            if core.state != CallState::Ringing {
                return Err(CallError::invalid_state("ringing", core.state));
            }

            self.ringtone.stop();
            let notify = core.active.as_mut().and_then(|active| {
                if let Some(timer) = active.accept_timer.take() {
                    timer.abort();
                }
                if let Some(acquisition) = active.acquisition.take() {
                    acquisition.release();
                }
                active.ended_at = Some(Utc::now());
                (!active.local_only).then(|| active.call_id.clone())
            });
            set_state(&mut core, CallState::Declined, "call declined locally", &self.event_tx);
            notify
        };

        if let Some(call_id) = notify {
            if let Err(error) = self.signaling.decline(&call_id).await {
                warn!(%error, "could not notify signaling of the decline");
            }
        }
        Ok(())
    }

    /// Fold a sync-client poll result into the local state machine.
    ///
    /// Remote `answered` connects a ringing call; remote `declined`/`ended`
    /// finish it locally without re-notifying the channel.
    pub async fn apply_remote_sessions(&self, sessions: &[CallSession]) {
        enum RemoteAction {
            Connect,
            Decline,
            End,
        }

        let action = {
            let core = self.core.lock().await;
            let Some(active) = core.active.as_ref() else {
                return;
            };
            let Some(session) = sessions.iter().find(|s| s.call_id == active.call_id) else {
                return;
            };
            match (core.state, session.status) {
                (CallState::Ringing, SessionStatus::Answered) => RemoteAction::Connect,
                (CallState::Ringing, SessionStatus::Declined) => RemoteAction::Decline,
                (CallState::Ringing, SessionStatus::Ended)
                | (CallState::Connected, SessionStatus::Ended) => RemoteAction::End,
                _ => return,
            }
        };

        match action {
            RemoteAction::Connect => {
                let _ = Self::transition_to_connected(
                    &self.core,
                    &self.ringtone,
                    &self.event_tx,
                    "remote answered",
                )
                .await;
            }
            RemoteAction::Decline => self.finish_from_remote(CallState::Declined, "remote declined").await,
            RemoteAction::End => self.finish_from_remote(CallState::Ended, "remote ended").await,
        }
    }

    /// A callback suitable for [`CallSyncClient::subscribe`] that feeds every
    /// poll result into this controller.
    ///
    /// [`CallSyncClient::subscribe`]: crate::sync::CallSyncClient::subscribe
    pub fn remote_update_fn(self: Arc<Self>) -> impl Fn(Vec<CallSession>) + Send + Sync + 'static {
        move |sessions| {
            let controller = self.clone();
            tokio::spawn(async move {
                controller.apply_remote_sessions(&sessions).await;
            });
        }
    }

    async fn finish_from_remote(&self, terminal: CallState, reason: &str) {
        let mut core = self.core.lock().await;
        if core.state.is_terminal() {
            return;
        }
        self.ringtone.stop();
        if let Some(active) = core.active.as_mut() {
            if let Some(timer) = active.accept_timer.take() {
                timer.abort();
            }
            if let Some(acquisition) = active.acquisition.take() {
                acquisition.release();
            }
            active.ended_at = Some(Utc::now());
        }
        set_state(&mut core, terminal, reason, &self.event_tx);
    }

    async fn transition_to_connected(
        core: &Arc<Mutex<CallCore>>,
        ringtone: &Arc<RingtoneSynthesizer>,
        events: &CallEventSender,
        reason: &str,
    ) -> CallResult<()> {
        let mut core = core.lock().await;
        if core.state != CallState::Ringing {
            return Err(CallError::invalid_state("ringing", core.state));
        }
        ringtone.stop();
        if let Some(active) = core.active.as_mut() {
            active.connected_at = Some(Utc::now());
            if let Some(timer) = active.accept_timer.take() {
                timer.abort();
            }
        }
        set_state(&mut core, CallState::Connected, reason, events);
        Ok(())
    }

    fn spawn_acquisition(&self, call_id: CallId) -> JoinHandle<()> {
        let media = self.media.clone();
        let constraints = self.config.media_constraints.clone();
        let core = self.core.clone();
        let events = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = media.acquire(AcquisitionPurpose::Call, constraints).await;
            let mut core = core.lock().await;
            match outcome {
                Ok(acquisition) => {
                    let still_live = core.state.is_in_progress()
                        && core
                            .active
                            .as_ref()
                            .map(|a| a.call_id == call_id)
                            .unwrap_or(false);
                    if !still_live {
                        debug!("call finished before acquisition completed, releasing");
                        acquisition.release();
                        return;
                    }

                    let has_video = acquisition.video_track().is_some();
                    let has_audio = acquisition.audio_track().is_some();
                    if let Some(active) = core.active.as_mut() {
                        active.acquisition = Some(acquisition);
                        active.last_media_error = None;
                    }
                    info!(has_video, has_audio, "call media acquired");
                    let _ = events.send(CallEvent::MediaAcquired {
                        call_id,
                        has_video,
                        has_audio,
                    });
                }
                Err(error) => {
                    let remediation = error.remediation().to_string();
                    warn!(%error, "media acquisition failed, call continues without local media");
                    if let Some(active) = core.active.as_mut() {
                        active.last_media_error = Some(error.clone());
                    }
                    let _ = events.send(CallEvent::MediaFailed {
                        call_id,
                        error,
                        remediation,
                    });
                }
            }
        })
    }

    fn spawn_auto_accept(&self, delay: std::time::Duration) -> JoinHandle<()> {
        let core = self.core.clone();
        let ringtone = self.ringtone.clone();
        let events = self.event_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if Self::transition_to_connected(&core, &ringtone, &events, "auto-accepted").await.is_ok() {
                debug!("call auto-accepted after delay");
            }
        })
    }
}

fn local_call_id() -> CallId {
    format!("local-{}", uuid::Uuid::new_v4())
}
