//! Cross-endpoint call-state synchronization
//!
//! Independent client instances share no process memory; the signaling store
//! is the only coordination point. [`CallSyncClient`] propagates transitions
//! by polling `calls_for_user` on a fixed interval and invoking the
//! subscriber's callback with the current set on every successful poll,
//! changed or not. Visibility of a remote transition is therefore bounded by
//! one poll interval, never immediate; the rest of the subsystem is written
//! against that bound.
//!
//! The poller table is owned by the client instance, keyed by subscribed
//! identity: at most one polling task per identity, re-subscribing cancels
//! the predecessor, and the returned [`SyncSubscription`] guard aborts its
//! own task on `unsubscribe()` or drop. Guards are generation-checked so a
//! stale guard can never cancel the subscription that replaced it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::call::{CallSession, CreateCallRequest, PeerInfo};
use crate::error::CallResult;

pub mod memory;
pub mod rest;
pub mod transport;

pub use memory::InMemorySignaling;
pub use rest::RestSignalingClient;
pub use transport::SignalingTransport;

/// Poll cadence used when none is configured
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug)]
struct Poller {
    generation: u64,
    task: JoinHandle<()>,
}

/// Client-side view of the signaling channel
#[derive(Debug)]
pub struct CallSyncClient {
    transport: Arc<dyn SignalingTransport>,
    poll_interval: Duration,
    pollers: Arc<DashMap<String, Poller>>,
    generations: AtomicU64,
}

impl CallSyncClient {
    /// Create a sync client over the given transport
    pub fn new(transport: Arc<dyn SignalingTransport>) -> Self {
        Self {
            transport,
            poll_interval: DEFAULT_POLL_INTERVAL,
            pollers: Arc::new(DashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    /// Override the poll cadence
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The underlying transport, shared with the controller
    pub fn transport(&self) -> Arc<dyn SignalingTransport> {
        self.transport.clone()
    }

    /// Post a new ringing session
    pub async fn create_call(
        &self,
        caller: &PeerInfo,
        receiver: &PeerInfo,
    ) -> CallResult<Option<CallSession>> {
        let request = CreateCallRequest {
            caller_email: caller.user_id.clone(),
            caller_name: caller.display_name.clone(),
            receiver_email: receiver.user_id.clone(),
            receiver_name: receiver.display_name.clone(),
        };
        self.transport.create_call(&request).await
    }

    /// Mark a session answered
    pub async fn answer(&self, call_id: &str) -> CallResult<bool> {
        self.transport.answer(call_id).await
    }

    /// Mark a session declined
    pub async fn decline(&self, call_id: &str) -> CallResult<bool> {
        self.transport.decline(call_id).await
    }

    /// Mark a session ended
    pub async fn end_call(&self, call_id: &str) -> CallResult<bool> {
        self.transport.end_call(call_id).await
    }

    /// Fetch one session by id
    pub async fn get_call(&self, call_id: &str) -> CallResult<Option<CallSession>> {
        self.transport.get_call(call_id).await
    }

    /// Every session involving an identity
    pub async fn calls_for_user(&self, user_id: &str) -> CallResult<Vec<CallSession>> {
        self.transport.calls_for_user(user_id).await
    }

    /// Begin polling sessions for an identity.
    ///
    /// `on_change` runs with the full current set on every successful poll,
    /// whether or not anything changed; a failed poll is logged and skipped,
    /// so sync silently stalls until the next interval. Any prior
    /// subscription for the same identity is cancelled first.
    pub fn subscribe<F>(&self, user_id: &str, on_change: F) -> SyncSubscription
    where
        F: Fn(Vec<CallSession>) + Send + Sync + 'static,
    {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some((_, prior)) = self.pollers.remove(user_id) {
            prior.task.abort();
            debug!(user_id, "replaced existing call-state subscription");
        }

        let transport = self.transport.clone();
        let user = user_id.to_string();
        let period = self.poll_interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                // first tick is immediate, so a fresh subscriber observes the
                // current set right away
                ticker.tick().await;
                match transport.calls_for_user(&user).await {
                    Ok(calls) => on_change(calls),
                    Err(error) => {
                        warn!(%error, user = %user, "call-state poll failed, retrying next interval");
                    }
                }
            }
        });

        self.pollers
            .insert(user_id.to_string(), Poller { generation, task });
        SyncSubscription {
            user_id: user_id.to_string(),
            generation,
            pollers: self.pollers.clone(),
        }
    }

    /// Cancel the subscription for an identity, if any
    pub fn unsubscribe(&self, user_id: &str) {
        if let Some((_, poller)) = self.pollers.remove(user_id) {
            poller.task.abort();
        }
    }

    /// Number of identities currently being polled
    pub fn active_subscriptions(&self) -> usize {
        self.pollers.len()
    }
}

impl Drop for CallSyncClient {
    fn drop(&mut self) {
        for entry in self.pollers.iter() {
            entry.value().task.abort();
        }
    }
}

/// Handle that stops one identity's polling.
///
/// Dropping the guard cancels the subscription too; failing to keep it (or
/// call [`unsubscribe`](SyncSubscription::unsubscribe)) would otherwise leak
/// a persistent timer.
#[must_use = "dropping the subscription guard stops polling"]
#[derive(Debug)]
pub struct SyncSubscription {
    user_id: String,
    generation: u64,
    pollers: Arc<DashMap<String, Poller>>,
}

impl SyncSubscription {
    /// The identity this subscription polls for
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Stop the polling task and deregister the callback
    pub fn unsubscribe(self) {
        // Drop does the work; consuming self makes the intent explicit
    }

    fn cancel(&self) {
        // only cancel the poller this guard created; a newer subscription for
        // the same identity has a higher generation and must survive
        if let Some((_, poller)) = self
            .pollers
            .remove_if(&self.user_id, |_, p| p.generation == self.generation)
        {
            poller.task.abort();
        }
    }
}

impl Drop for SyncSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
