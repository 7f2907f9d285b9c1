//! Scripted transport for unit tests

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::TransportError;
use crate::transport::{RawResponse, Transport, WireRequest};

/// Canned reply for one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, serde_json::Value),
    Raw(u16, &'static str),
    Fail,
}

/// A request as the transport saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub token: Option<String>,
    pub body: Option<String>,
}

/// Transport that answers from per-path queues and records every call.
///
/// When a path's queue has one reply left it is reused for every later call,
/// so a single scripted reply acts as a fixed response.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<Recorded>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every call sleeps first, so concurrent callers overlap.
    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn reply(&self, path: &str, reply: Reply) {
        self.replies
            .lock()
            .entry(path.to_owned())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.path == path).count()
    }

    fn next_reply(&self, path: &str) -> Reply {
        let mut replies = self.replies.lock();
        match replies.get_mut(path) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Reply::Fail),
            Some(queue) => queue.front().cloned().unwrap_or(Reply::Fail),
            None => Reply::Raw(404, r#"{"error":true,"message":"not scripted"}"#),
        }
    }
}

impl Transport for ScriptedTransport {
    fn send<'a>(
        &'a self,
        request: &'a WireRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().push(Recorded {
                method: request.method.to_string(),
                path: request.path.clone(),
                token: request
                    .headers
                    .get(finance_auth::AUTH_TOKEN_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned),
                body: request.body.clone(),
            });

            match self.delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }

            match self.next_reply(&request.path) {
                Reply::Json(status, value) => Ok(RawResponse {
                    status,
                    body: serde_json::to_vec(&value).unwrap_or_default(),
                }),
                Reply::Raw(status, body) => Ok(RawResponse {
                    status,
                    body: body.as_bytes().to_vec(),
                }),
                Reply::Fail => Err(TransportError::Http("connection refused".into())),
            }
        })
    }
}

/// Refresh reply carrying a fresh pair.
pub fn tokens(access: &str, refresh: &str) -> Reply {
    Reply::Json(
        200,
        serde_json::json!({"tokens": {"accessToken": access, "refreshToken": refresh}}),
    )
}
