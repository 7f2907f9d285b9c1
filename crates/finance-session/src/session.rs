//! Refresh-token exchange with single-flight coordination
//!
//! `renew()` is called from request-time paths only (a missing access token,
//! or a 401). Any number of callers may ask concurrently; the first installs a
//! shared pending future before its first suspension point, everyone else
//! awaits that same future. The handle is dropped when the exchange settles,
//! success or failure, so the next `renew()` starts fresh.
//!
//! The exchange itself goes straight to the transport without an access
//! token, so it can never re-enter the 401 recovery path of `ApiClient`.

use std::sync::Arc;

use common::Secret;
use finance_auth::{CredentialStore, REFRESH_ENDPOINT, RefreshRequest, RefreshResponse};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use reqwest::Method;
use tracing::{debug, info, warn};

use crate::transport::{Transport, WireRequest};

type PendingRenewal = Shared<BoxFuture<'static, bool>>;

/// Owns the refresh-token exchange for one client session.
///
/// Cheap to clone; clones share the pending-renewal handle.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    credentials: CredentialStore,
    transport: Arc<dyn Transport>,
    pending: Mutex<Option<PendingRenewal>>,
}

impl SessionManager {
    pub fn new(credentials: CredentialStore, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                credentials,
                transport,
                pending: Mutex::new(None),
            }),
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    /// Whether an exchange is currently in flight.
    pub fn is_renewing(&self) -> bool {
        self.inner.pending.lock().is_some()
    }

    /// Obtain a fresh token pair.
    ///
    /// Returns `true` when the store now holds a new access/refresh pair.
    /// On `false` the credentials have been cleared.
    pub async fn renew(&self) -> bool {
        let renewal = {
            let mut pending = self.inner.pending.lock();
            match pending.clone() {
                Some(in_flight) => {
                    debug!("joining in-flight token renewal");
                    in_flight
                }
                None => {
                    let Some(refresh) = self.inner.credentials.refresh_token() else {
                        debug!("no refresh token stored, renewal impossible");
                        if let Err(e) = self.inner.credentials.clear() {
                            warn!(error = %e, "failed to clear credentials");
                        }
                        return false;
                    };

                    let inner = self.inner.clone();
                    let renewal = async move {
                        let renewed = inner.exchange(refresh).await;
                        inner.pending.lock().take();
                        renewed
                    }
                    .boxed()
                    .shared();
                    *pending = Some(renewal.clone());
                    renewal
                }
            }
        };

        renewal.await
    }
}

impl SessionInner {
    /// One network exchange. Persists the new pair on success, clears every
    /// credential on any failure.
    async fn exchange(&self, refresh: Secret<String>) -> bool {
        let renewed = match self.try_exchange(&refresh).await {
            Ok(()) => {
                info!("token renewal succeeded");
                true
            }
            Err(reason) => {
                warn!(reason, "token renewal failed, clearing credentials");
                if let Err(e) = self.credentials.clear() {
                    warn!(error = %e, "failed to clear credentials");
                }
                false
            }
        };

        let outcome = if renewed { "success" } else { "failure" };
        metrics::counter!("session_refresh_total", "outcome" => outcome).increment(1);
        renewed
    }

    async fn try_exchange(&self, refresh: &Secret<String>) -> Result<(), String> {
        let body = serde_json::to_string(&RefreshRequest {
            refresh_token: refresh.expose_str().to_owned(),
            remember_me: false,
        })
        .map_err(|e| format!("encoding refresh request: {e}"))?;
        let request = WireRequest::new(Method::POST, REFRESH_ENDPOINT).with_body(Some(body));

        let response = self
            .transport
            .send(&request)
            .await
            .map_err(|e| e.to_string())?;
        if !response.is_success() {
            return Err(format!("refresh endpoint returned {}", response.status));
        }

        let parsed: RefreshResponse = serde_json::from_slice(&response.body)
            .map_err(|e| format!("invalid refresh response: {e}"))?;
        let pair = parsed
            .pair()
            .ok_or_else(|| "refresh response is missing tokens".to_owned())?;

        self.credentials
            .set(&pair.access_token, &pair.refresh_token, None)
            .map_err(|e| format!("persisting renewed tokens: {e}"))
    }
}
