//! Call-core: call lifecycle and cross-endpoint state sync for livecall
//!
//! ```text
//! UI controls ──▶ CallSessionController ──▶ MediaDeviceManager (device-core)
//!                     │         ▲
//!                     ▼         │ apply_remote_sessions
//!              SignalingTransport ◀── CallSyncClient (polling)
//! ```
//!
//! - [`controller::CallSessionController`] owns one call's state machine,
//!   orchestrates device acquisition, and exposes the user-facing controls
//!   (mute, camera toggle, end).
//! - [`sync::CallSyncClient`] mirrors call-state transitions across
//!   independent endpoints through the signaling store, with bounded
//!   (one-poll-interval) visibility latency.
//! - Signaling is a trait seam: [`sync::RestSignalingClient`] in production,
//!   [`sync::InMemorySignaling`] for tests and local-only operation.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use livecall_call_core::{CallClientConfig, CallSessionController, PeerInfo};
//! use livecall_call_core::sync::{CallSyncClient, InMemorySignaling};
//! use livecall_device_core::device::{MediaDeviceManager, MockMediaBackend};
//! use livecall_device_core::RingtoneSynthesizer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let signaling = Arc::new(InMemorySignaling::new());
//! let media = Arc::new(MediaDeviceManager::new(Arc::new(MockMediaBackend::new())));
//! let config = CallClientConfig::new("agent@desk.example", "Agent");
//!
//! let (controller, mut events) = CallSessionController::new(
//!     config,
//!     media,
//!     Arc::new(RingtoneSynthesizer::disabled()),
//!     signaling.clone(),
//! );
//!
//! // place a call; media acquisition proceeds in the background
//! let call_id = controller.start(PeerInfo::new("jane@customer.example", "Jane Doe")).await?;
//!
//! // mirror remote transitions into the controller
//! let sync = CallSyncClient::new(signaling);
//! let _subscription = sync.subscribe("agent@desk.example", controller.clone().remote_update_fn());
//!
//! controller.end().await?;
//! # let _ = (call_id, events);
//! # Ok(())
//! # }
//! ```

pub mod call;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod recovery;
pub mod sync;

pub use call::{
    CallDirection, CallId, CallInfo, CallSession, CallState, CreateCallRequest, PeerInfo,
    SessionStatus,
};
pub use config::CallClientConfig;
pub use controller::CallSessionController;
pub use error::{CallError, CallResult};
pub use events::{CallEvent, CallEventReceiver};
pub use recovery::{retry_with_backoff, RetryConfig};
pub use sync::{CallSyncClient, InMemorySignaling, RestSignalingClient, SignalingTransport, SyncSubscription};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
