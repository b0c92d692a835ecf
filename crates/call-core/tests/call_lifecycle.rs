//! Controller lifecycle properties
//!
//! All timer-driven behavior runs under tokio's paused clock, so intervals
//! and delays are deterministic.

use std::sync::Arc;
use std::time::Duration;

use livecall_call_core::sync::InMemorySignaling;
use livecall_call_core::{
    CallClientConfig, CallError, CallEvent, CallEventReceiver, CallSessionController, CallState,
    PeerInfo,
};
use livecall_device_core::device::{AcquisitionPurpose, MediaDeviceManager, MockMediaBackend};
use livecall_device_core::ringtone::MockToneSink;
use livecall_device_core::{MediaError, RingtoneSynthesizer};

struct Rig {
    controller: Arc<CallSessionController>,
    events: CallEventReceiver,
    backend: Arc<MockMediaBackend>,
    sink: Arc<MockToneSink>,
    media: Arc<MediaDeviceManager>,
    signaling: InMemorySignaling,
}

fn rig_with(config: CallClientConfig) -> Rig {
    let backend = Arc::new(MockMediaBackend::new());
    let media = Arc::new(MediaDeviceManager::new(backend.clone()));
    let sink = Arc::new(MockToneSink::new());
    let ringtone = Arc::new(RingtoneSynthesizer::with_sink(sink.clone()));
    let signaling = InMemorySignaling::new();

    let (controller, events) =
        CallSessionController::new(config, media.clone(), ringtone, Arc::new(signaling.clone()));
    Rig {
        controller,
        events,
        backend,
        sink,
        media,
        signaling,
    }
}

fn rig() -> Rig {
    rig_with(CallClientConfig::new("agent@desk.example", "Agent"))
}

fn jane() -> PeerInfo {
    PeerInfo::new("jane@customer.example", "Jane Doe")
}

/// Let spawned tasks (acquisition, ringtone) run under the paused clock
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

fn drain(events: &mut CallEventReceiver) -> Vec<CallEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn outgoing_call_reaches_connected_and_ends_cleanly() {
    let mut rig = rig();

    let call_id = rig.controller.start(jane()).await.unwrap();
    assert_eq!(rig.controller.state().await, CallState::Ringing);
    settle().await;

    // ringtone pulsed immediately, media was acquired in the background
    assert!(rig.sink.pulse_count() >= 1);
    assert_eq!(rig.backend.live_track_count(), 2);

    rig.controller.mark_connected().await.unwrap();
    assert_eq!(rig.controller.state().await, CallState::Connected);

    rig.controller.end().await.unwrap();
    assert_eq!(rig.controller.state().await, CallState::Ended);
    assert_eq!(rig.backend.live_track_count(), 0);

    let info = rig.controller.call_info().await.unwrap();
    assert_eq!(info.call_id, call_id);
    assert!(info.connected_at.is_some());
    assert!(info.ended_at.is_some());
    assert!(!info.local_only);

    let events = drain(&mut rig.events);
    assert!(events.iter().any(|e| matches!(e, CallEvent::MediaAcquired { .. })));
}

#[tokio::test(start_paused = true)]
async fn end_is_idempotent() {
    let mut rig = rig();
    rig.controller.start(jane()).await.unwrap();
    settle().await;

    rig.controller.end().await.unwrap();
    let info_once = rig.controller.call_info().await.unwrap();
    let pulses_once = rig.sink.pulse_count();

    rig.controller.end().await.unwrap();
    let info_twice = rig.controller.call_info().await.unwrap();

    assert_eq!(rig.controller.state().await, CallState::Ended);
    assert_eq!(info_once.ended_at, info_twice.ended_at);
    assert_eq!(rig.sink.pulse_count(), pulses_once);
    assert_eq!(rig.backend.live_track_count(), 0);

    // exactly one transition to Ended was observed
    let endings = drain(&mut rig.events)
        .into_iter()
        .filter(|e| matches!(e, CallEvent::StateChanged { state: CallState::Ended, .. }))
        .count();
    assert_eq!(endings, 1);
}

#[tokio::test(start_paused = true)]
async fn ended_is_absorbing() {
    let rig = rig();
    rig.controller.start(jane()).await.unwrap();
    settle().await;
    rig.controller.end().await.unwrap();

    // no operation leaves Ended
    assert!(matches!(
        rig.controller.start(jane()).await,
        Err(CallError::InvalidCallState { .. })
    ));
    assert!(matches!(
        rig.controller.mark_connected().await,
        Err(CallError::InvalidCallState { .. })
    ));
    assert!(matches!(
        rig.controller.toggle_video().await,
        Err(CallError::InvalidCallState { .. })
    ));
    assert!(matches!(
        rig.controller.toggle_audio().await,
        Err(CallError::InvalidCallState { .. })
    ));
    assert!(matches!(
        rig.controller.retry_media().await,
        Err(CallError::InvalidCallState { .. })
    ));
    assert_eq!(rig.controller.state().await, CallState::Ended);
}

#[tokio::test(start_paused = true)]
async fn permission_denied_keeps_the_call_ringing_with_remediation() {
    let mut rig = rig();
    rig.backend.fail_next(MediaError::PermissionDenied);

    rig.controller.start(jane()).await.unwrap();
    settle().await;

    // the call survives the failure
    assert_eq!(rig.controller.state().await, CallState::Ringing);

    // the failure event carries an actionable, denial-specific message
    let failed = drain(&mut rig.events)
        .into_iter()
        .find_map(|e| match e {
            CallEvent::MediaFailed { error, remediation, .. } => Some((error, remediation)),
            _ => None,
        })
        .expect("media failure event");
    assert_eq!(failed.0, MediaError::PermissionDenied);
    assert!(failed.1.contains("denied"));

    let info = rig.controller.call_info().await.unwrap();
    assert_eq!(info.last_media_error, Some(MediaError::PermissionDenied));

    // the ringtone keeps going
    let before = rig.sink.pulse_count();
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(rig.sink.pulse_count() > before);
}

#[tokio::test(start_paused = true)]
async fn toggle_before_acquisition_is_a_reported_noop() {
    let rig = rig();
    // acquisition stays pending failure-free: deny it so no tracks attach
    rig.backend.fail_next(MediaError::PermissionDenied);
    rig.controller.start(jane()).await.unwrap();
    settle().await;

    assert_eq!(rig.controller.toggle_video().await.unwrap(), None);
    assert_eq!(rig.controller.toggle_audio().await.unwrap(), None);
    assert_eq!(rig.controller.state().await, CallState::Ringing);
}

#[tokio::test(start_paused = true)]
async fn toggle_flips_tracks_without_reacquiring() {
    let mut rig = rig();
    rig.controller.start(jane()).await.unwrap();
    settle().await;
    let requests_after_acquisition = rig.backend.request_count();

    assert_eq!(rig.controller.toggle_video().await.unwrap(), Some(false));
    assert_eq!(rig.controller.toggle_video().await.unwrap(), Some(true));
    assert_eq!(rig.controller.toggle_audio().await.unwrap(), Some(false));

    // flipping enabled state never re-acquires hardware
    assert_eq!(rig.backend.request_count(), requests_after_acquisition);

    let acquisition = rig.media.acquisition(AcquisitionPurpose::Call).unwrap();
    assert!(acquisition.video_track().unwrap().is_enabled());
    assert!(!acquisition.audio_track().unwrap().is_enabled());

    let toggles = drain(&mut rig.events)
        .into_iter()
        .filter(|e| matches!(e, CallEvent::TrackToggled { .. }))
        .count();
    assert_eq!(toggles, 3);
}

#[tokio::test(start_paused = true)]
async fn retry_media_recovers_after_a_failure() {
    let mut rig = rig();
    rig.backend.fail_next(MediaError::device_busy("camera in use"));

    rig.controller.start(jane()).await.unwrap();
    settle().await;
    assert_eq!(rig.backend.live_track_count(), 0);

    rig.controller.retry_media().await.unwrap();
    settle().await;

    assert_eq!(rig.backend.live_track_count(), 2);
    assert_eq!(rig.controller.toggle_video().await.unwrap(), Some(false));
    let info = rig.controller.call_info().await.unwrap();
    assert_eq!(info.last_media_error, None);

    let events = drain(&mut rig.events);
    assert!(events.iter().any(|e| matches!(e, CallEvent::MediaFailed { .. })));
    assert!(events.iter().any(|e| matches!(e, CallEvent::MediaAcquired { .. })));
}

#[tokio::test(start_paused = true)]
async fn auto_accept_connects_after_the_delay() {
    let rig = rig_with(
        CallClientConfig::new("agent@desk.example", "Agent")
            .with_auto_accept_delay(Duration::from_secs(3)),
    );

    rig.controller.start(jane()).await.unwrap();
    settle().await;
    assert_eq!(rig.controller.state().await, CallState::Ringing);

    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert_eq!(rig.controller.state().await, CallState::Connected);

    // ringtone stopped with the connection
    let pulses = rig.sink.pulse_count();
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(rig.sink.pulse_count(), pulses);
}

#[tokio::test(start_paused = true)]
async fn incoming_call_can_be_attached_and_answered() {
    // receiver adopts a ringing session created by the caller
    let caller = rig();
    caller.controller.start(jane()).await.unwrap();
    let session = caller.signaling.snapshot().await.pop().unwrap();

    // the receiver endpoint shares the caller's signaling store
    let backend = Arc::new(MockMediaBackend::new());
    let media = Arc::new(MediaDeviceManager::new(backend.clone()));
    let sink = Arc::new(MockToneSink::new());
    let (controller, _events) = CallSessionController::new(
        CallClientConfig::new("jane@customer.example", "Jane Doe"),
        media,
        Arc::new(RingtoneSynthesizer::with_sink(sink.clone())),
        Arc::new(caller.signaling.clone()),
    );

    controller.attach_incoming(&session).await.unwrap();
    settle().await;
    assert_eq!(controller.state().await, CallState::Ringing);
    assert!(sink.pulse_count() >= 1);
    assert_eq!(backend.live_track_count(), 2);

    controller.answer().await.unwrap();
    assert_eq!(controller.state().await, CallState::Connected);

    // the shared store saw the answer
    let remote = caller.signaling.snapshot().await.pop().unwrap();
    assert_eq!(
        remote.status,
        livecall_call_core::SessionStatus::Answered
    );

    controller.end().await.unwrap();
    assert_eq!(backend.live_track_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn decline_is_the_alternate_terminal_from_ringing() {
    let rig = rig();
    rig.controller.start(jane()).await.unwrap();
    settle().await;

    rig.controller.decline().await.unwrap();
    assert_eq!(rig.controller.state().await, CallState::Declined);
    assert_eq!(rig.backend.live_track_count(), 0);

    // declined is terminal too
    assert!(matches!(
        rig.controller.mark_connected().await,
        Err(CallError::InvalidCallState { .. })
    ));
    // end() on a declined call stays a no-op
    rig.controller.end().await.unwrap();
    assert_eq!(rig.controller.state().await, CallState::Declined);
}

#[tokio::test]
async fn signaling_outage_degrades_to_local_only() {
    // the in-memory store cannot fail, so exercise the soft path with a REST
    // client pointed at a port nothing listens on
    use livecall_call_core::{RestSignalingClient, RetryConfig};
    use url::Url;

    let backend = Arc::new(MockMediaBackend::new());
    let media = Arc::new(MediaDeviceManager::new(backend.clone()));
    let signaling = RestSignalingClient::new(
        Url::parse("http://127.0.0.1:9/signaling").unwrap(),
    )
    .with_retry(RetryConfig::none());

    let (controller, _events) = CallSessionController::new(
        CallClientConfig::new("agent@desk.example", "Agent"),
        media,
        Arc::new(RingtoneSynthesizer::disabled()),
        Arc::new(signaling),
    );

    let call_id = controller.start(jane()).await.unwrap();
    assert!(call_id.starts_with("local-"));
    assert_eq!(controller.state().await, CallState::Ringing);
    let info = controller.call_info().await.unwrap();
    assert!(info.local_only);

    // ending a local-only call skips the channel and still terminates
    controller.end().await.unwrap();
    assert_eq!(controller.state().await, CallState::Ended);
}
