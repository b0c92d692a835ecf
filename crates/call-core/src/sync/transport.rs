//! Signaling transport seam
//!
//! The sync client and the controller speak to the signaling channel only
//! through this trait. Two implementations ship here: the REST client used
//! in production and the shared in-memory store used by tests and local-only
//! operation.
//!
//! Soft-failure convention: a signaling response without `success: true` is
//! logged and mapped to an empty result (`Ok(None)`, `Ok(false)`,
//! `Ok(vec![])`), never an `Err`. Only transport-level failures (the channel
//! itself unreachable or answering garbage) surface as
//! [`CallError::SignalingUnavailable`].

use async_trait::async_trait;

use crate::call::{CallSession, CreateCallRequest};
use crate::error::CallResult;

/// Remote coordination point for call sessions
#[async_trait]
pub trait SignalingTransport: Send + Sync + std::fmt::Debug {
    /// Create a ringing session; `None` when the channel refused it
    async fn create_call(&self, request: &CreateCallRequest) -> CallResult<Option<CallSession>>;

    /// Mark the session answered; `false` when the channel refused it
    async fn answer(&self, call_id: &str) -> CallResult<bool>;

    /// Mark the session declined; `false` when the channel refused it
    async fn decline(&self, call_id: &str) -> CallResult<bool>;

    /// Mark the session ended; `false` when the channel refused it
    async fn end_call(&self, call_id: &str) -> CallResult<bool>;

    /// Fetch one session by id
    async fn get_call(&self, call_id: &str) -> CallResult<Option<CallSession>>;

    /// Every session in which the identity is caller or receiver
    async fn calls_for_user(&self, user_id: &str) -> CallResult<Vec<CallSession>>;
}
