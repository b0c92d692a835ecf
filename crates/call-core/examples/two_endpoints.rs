//! Two endpoints completing a call through the shared in-memory signaling
//! store: the agent places a call, the customer endpoint observes it through
//! its sync subscription, answers, and both sides hang up cleanly.
//!
//! Run with: cargo run --example two_endpoints

use std::sync::Arc;
use std::time::Duration;

use livecall_call_core::sync::{CallSyncClient, InMemorySignaling};
use livecall_call_core::{CallClientConfig, CallEvent, CallSessionController, PeerInfo};
use livecall_device_core::device::{MediaDeviceManager, MockMediaBackend};
use livecall_device_core::ringtone::MockToneSink;
use livecall_device_core::RingtoneSynthesizer;

fn endpoint(
    user_id: &str,
    display_name: &str,
    signaling: &InMemorySignaling,
) -> (
    Arc<CallSessionController>,
    livecall_call_core::CallEventReceiver,
    Arc<MockMediaBackend>,
) {
    let backend = Arc::new(MockMediaBackend::new());
    let media = Arc::new(MediaDeviceManager::new(backend.clone()));
    let config = CallClientConfig::new(user_id, display_name)
        .with_poll_interval(Duration::from_millis(500));
    let ringtone = Arc::new(
        RingtoneSynthesizer::with_sink(Arc::new(MockToneSink::new()))
            .with_interval(config.ringtone_interval),
    );
    let (controller, events) =
        CallSessionController::new(config, media, ringtone, Arc::new(signaling.clone()));
    (controller, events, backend)
}

fn spawn_event_logger(tag: &'static str, mut events: livecall_call_core::CallEventReceiver) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                CallEvent::StateChanged { previous, state, reason, .. } => {
                    println!("[{tag}] {previous} -> {state} ({})", reason.unwrap_or_default());
                }
                CallEvent::MediaAcquired { has_video, has_audio, .. } => {
                    println!("[{tag}] media acquired (video: {has_video}, audio: {has_audio})");
                }
                CallEvent::MediaFailed { remediation, .. } => {
                    println!("[{tag}] media failed: {remediation}");
                }
                CallEvent::TrackToggled { kind, enabled, .. } => {
                    println!("[{tag}] {kind} track enabled: {enabled}");
                }
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let signaling = InMemorySignaling::new();

    let (agent, agent_events, _) = endpoint("agent@desk.example", "Agent", &signaling);
    let (customer, customer_events, customer_backend) =
        endpoint("jane@customer.example", "Jane Doe", &signaling);
    spawn_event_logger("agent", agent_events);
    spawn_event_logger("customer", customer_events);

    // the agent's endpoint mirrors remote transitions into its controller
    let agent_sync = CallSyncClient::new(Arc::new(signaling.clone()))
        .with_poll_interval(agent.config().poll_interval);
    let _agent_subscription =
        agent_sync.subscribe("agent@desk.example", agent.clone().remote_update_fn());

    // agent places the call
    let call_id = agent
        .start(PeerInfo::new("jane@customer.example", "Jane Doe"))
        .await?;
    println!("call placed: {call_id}");

    // the customer endpoint discovers the ringing session on its next poll
    let customer_sync = CallSyncClient::new(Arc::new(signaling.clone()))
        .with_poll_interval(customer.config().poll_interval);
    let ringing = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let calls = customer_sync
                .calls_for_user("jane@customer.example")
                .await
                .unwrap_or_default();
            if let Some(session) = calls.into_iter().find(|c| c.call_id == call_id) {
                break session;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await?;

    customer.attach_incoming(&ringing).await?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    customer.answer().await?;

    // within one poll interval the agent observes the answer and connects
    tokio::time::sleep(Duration::from_millis(700)).await;

    // mid-call controls flip tracks without re-acquiring hardware
    let _ = customer.toggle_video().await?;
    let _ = customer.toggle_audio().await?;

    customer.end().await?;
    tokio::time::sleep(Duration::from_millis(700)).await;
    agent.end().await?;

    println!(
        "customer live tracks after hangup: {}",
        customer_backend.live_track_count()
    );
    Ok(())
}
