//! In-memory signaling store
//!
//! A shared-store transport: clones share the same session table, so two
//! clients built from clones of one `InMemorySignaling` observe each other's
//! transitions exactly as they would through the REST channel. Used by tests
//! and as the explicit local-only fallback when no signaling URL is
//! configured.
//!
//! The store enforces the server-side rules: the status lifecycle is
//! monotone, and a transition requested on an already-terminal session is
//! acknowledged without effect.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::call::{CallSession, CreateCallRequest, SessionStatus};
use crate::error::CallResult;
use crate::sync::transport::SignalingTransport;

/// Shared in-memory [`SignalingTransport`]
#[derive(Debug, Clone, Default)]
pub struct InMemorySignaling {
    calls: Arc<RwLock<HashMap<String, CallSession>>>,
}

impl InMemorySignaling {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Every session currently in the store (test helper)
    pub async fn snapshot(&self) -> Vec<CallSession> {
        self.calls.read().await.values().cloned().collect()
    }

    async fn transition(&self, call_id: &str, next: SessionStatus) -> CallResult<bool> {
        let mut calls = self.calls.write().await;
        let Some(call) = calls.get_mut(call_id) else {
            debug!(call_id, "transition requested for unknown session");
            return Ok(false);
        };

        if call.status.is_terminal() {
            // no-op server-side; acknowledge so duplicate requests stay idempotent
            debug!(call_id, status = %call.status, "transition on terminal session ignored");
            return Ok(true);
        }
        if !call.status.can_transition_to(next) {
            debug!(call_id, from = %call.status, to = %next, "transition rejected");
            return Ok(false);
        }

        call.status = next;
        if next.is_terminal() {
            let now = Utc::now();
            call.ended_at = Some(now);
            if next == SessionStatus::Ended {
                call.duration_seconds =
                    Some((now - call.started_at).num_seconds().max(0) as u64);
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl SignalingTransport for InMemorySignaling {
    async fn create_call(&self, request: &CreateCallRequest) -> CallResult<Option<CallSession>> {
        let session = CallSession {
            call_id: format!("call-{}", Uuid::new_v4()),
            caller_id: request.caller_email.clone(),
            caller_display_name: request.caller_name.clone(),
            receiver_id: request.receiver_email.clone(),
            receiver_display_name: request.receiver_name.clone(),
            status: SessionStatus::Ringing,
            started_at: Utc::now(),
            ended_at: None,
            duration_seconds: None,
        };
        self.calls
            .write()
            .await
            .insert(session.call_id.clone(), session.clone());
        Ok(Some(session))
    }

    async fn answer(&self, call_id: &str) -> CallResult<bool> {
        self.transition(call_id, SessionStatus::Answered).await
    }

    async fn decline(&self, call_id: &str) -> CallResult<bool> {
        self.transition(call_id, SessionStatus::Declined).await
    }

    async fn end_call(&self, call_id: &str) -> CallResult<bool> {
        self.transition(call_id, SessionStatus::Ended).await
    }

    async fn get_call(&self, call_id: &str) -> CallResult<Option<CallSession>> {
        Ok(self.calls.read().await.get(call_id).cloned())
    }

    async fn calls_for_user(&self, user_id: &str) -> CallResult<Vec<CallSession>> {
        Ok(self
            .calls
            .read()
            .await
            .values()
            .filter(|c| c.involves(user_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateCallRequest {
        CreateCallRequest {
            caller_email: "agent@desk.example".into(),
            caller_name: "Agent".into(),
            receiver_email: "jane@customer.example".into(),
            receiver_name: "Jane Doe".into(),
        }
    }

    #[tokio::test]
    async fn lifecycle_is_monotone() {
        let store = InMemorySignaling::new();
        let session = store.create_call(&request()).await.unwrap().unwrap();

        assert!(store.answer(&session.call_id).await.unwrap());
        let answered = store.get_call(&session.call_id).await.unwrap().unwrap();
        assert_eq!(answered.status, SessionStatus::Answered);

        // answered sessions cannot be declined
        assert!(!store.decline(&session.call_id).await.unwrap());

        assert!(store.end_call(&session.call_id).await.unwrap());
        let ended = store.get_call(&session.call_id).await.unwrap().unwrap();
        assert_eq!(ended.status, SessionStatus::Ended);
        assert!(ended.ended_at.is_some());
        assert!(ended.duration_seconds.is_some());
    }

    #[tokio::test]
    async fn terminal_sessions_ignore_late_transitions() {
        let store = InMemorySignaling::new();
        let session = store.create_call(&request()).await.unwrap().unwrap();

        store.end_call(&session.call_id).await.unwrap();

        // acknowledged, but without effect
        assert!(store.answer(&session.call_id).await.unwrap());
        assert!(store.end_call(&session.call_id).await.unwrap());
        let current = store.get_call(&session.call_id).await.unwrap().unwrap();
        assert_eq!(current.status, SessionStatus::Ended);
    }

    #[tokio::test]
    async fn clones_share_the_store() {
        let store = InMemorySignaling::new();
        let peer_view = store.clone();

        let session = store.create_call(&request()).await.unwrap().unwrap();
        let seen = peer_view
            .calls_for_user("jane@customer.example")
            .await
            .unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].call_id, session.call_id);

        let none = peer_view.calls_for_user("nobody@example").await.unwrap();
        assert!(none.is_empty());
    }
}
