//! REST signaling transport
//!
//! Speaks the signaling surface consumed by every endpoint:
//!
//! ```text
//! POST /video-calls                      create a ringing session
//! PUT  /video-calls/{id}/answer          mark answered
//! PUT  /video-calls/{id}/decline         mark declined
//! PUT  /video-calls/{id}/end             mark ended
//! GET  /video-calls/{id}                 fetch one session
//! GET  /video-calls/user/{email}         sessions involving an identity
//! ```
//!
//! Every response is a `{success: bool, ...}` envelope. Envelopes without
//! `success: true` are soft failures (logged, empty result); transport-level
//! failures are retried with jittered backoff and then surface as
//! `SignalingUnavailable`.

use reqwest::Method;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use async_trait::async_trait;

use crate::call::{CallSession, CreateCallRequest};
use crate::error::{CallError, CallResult};
use crate::recovery::{retry_with_backoff, RetryConfig};
use crate::sync::transport::SignalingTransport;

#[derive(Debug, Deserialize)]
struct CallEnvelope {
    #[serde(default)]
    success: bool,
    call: Option<CallSession>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallsEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    calls: Vec<CallSession>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AckEnvelope {
    #[serde(default)]
    success: bool,
    message: Option<String>,
}

/// [`SignalingTransport`] over the signaling REST surface
#[derive(Debug, Clone)]
pub struct RestSignalingClient {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryConfig,
}

impl RestSignalingClient {
    /// Create a client for the given base URL
    pub fn new(base_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            retry: RetryConfig::quick(),
        }
    }

    /// Override the retry policy for transient transport failures
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> CallResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                CallError::signaling_unavailable("signaling base URL cannot carry paths")
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    async fn send<T>(&self, operation: &str, method: Method, url: Url, body: Option<&CreateCallRequest>) -> CallResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        retry_with_backoff(operation, &self.retry, || async {
            let mut request = self.http.request(method.clone(), url.clone());
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request
                .send()
                .await
                .map_err(|e| CallError::signaling_unavailable(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(CallError::signaling_unavailable(format!(
                    "signaling answered {status}"
                )));
            }

            let text = response
                .text()
                .await
                .map_err(|e| CallError::signaling_unavailable(e.to_string()))?;
            serde_json::from_str::<T>(&text).map_err(|e| {
                debug!(operation, body = %text, "unparseable signaling response");
                CallError::signaling_unavailable(format!("bad signaling payload: {e}"))
            })
        })
        .await
    }

    async fn transition(&self, call_id: &str, action: &str) -> CallResult<bool> {
        let url = self.endpoint(&["video-calls", call_id, action])?;
        let envelope: AckEnvelope = self
            .send(action, Method::PUT, url, None)
            .await?;
        if !envelope.success {
            debug!(call_id, action, message = ?envelope.message, "transition rejected by signaling");
        }
        Ok(envelope.success)
    }
}

#[async_trait]
impl SignalingTransport for RestSignalingClient {
    async fn create_call(&self, request: &CreateCallRequest) -> CallResult<Option<CallSession>> {
        let url = self.endpoint(&["video-calls"])?;
        let envelope: CallEnvelope = self
            .send("create_call", Method::POST, url, Some(request))
            .await?;
        if !envelope.success {
            debug!(message = ?envelope.message, "call creation rejected by signaling");
            return Ok(None);
        }
        Ok(envelope.call)
    }

    async fn answer(&self, call_id: &str) -> CallResult<bool> {
        self.transition(call_id, "answer").await
    }

    async fn decline(&self, call_id: &str) -> CallResult<bool> {
        self.transition(call_id, "decline").await
    }

    async fn end_call(&self, call_id: &str) -> CallResult<bool> {
        self.transition(call_id, "end").await
    }

    async fn get_call(&self, call_id: &str) -> CallResult<Option<CallSession>> {
        let url = self.endpoint(&["video-calls", call_id])?;
        let envelope: CallEnvelope = self.send("get_call", Method::GET, url, None).await?;
        if !envelope.success {
            debug!(call_id, message = ?envelope.message, "session fetch rejected by signaling");
            return Ok(None);
        }
        Ok(envelope.call)
    }

    async fn calls_for_user(&self, user_id: &str) -> CallResult<Vec<CallSession>> {
        let url = self.endpoint(&["video-calls", "user", user_id])?;
        let envelope: CallsEnvelope = self
            .send("calls_for_user", Method::GET, url, None)
            .await?;
        if !envelope.success {
            debug!(user_id, message = ?envelope.message, "session list rejected by signaling");
            return Ok(Vec::new());
        }
        Ok(envelope.calls)
    }
}
