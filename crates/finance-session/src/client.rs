//! Authenticated request client
//!
//! `ApiClient::request` is the single primitive page controllers and the
//! router use to reach the API. It never returns `Err`: transport failures,
//! error statuses and unrecoverable auth all land in a `RequestOutcome`.
//!
//! Auth recovery, when `use_auth` is set:
//! 1. No access token: no refresh token either means an immediate login
//!    redirect with zero network calls; otherwise renew first.
//! 2. A 401 response: renew once, retry once. Whatever the retry returns is
//!    final, so a second 401 surfaces as a plain error instead of looping.
//! 3. Renewal impossible: clear everything and redirect to `/login`.

use std::sync::Arc;

use finance_auth::CredentialStore;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::session::SessionManager;
use crate::transport::{RawResponse, Transport, WireRequest};

/// Route the caller must navigate to when auth cannot be recovered.
pub const LOGIN_REDIRECT: &str = "/login";

/// Status code that triggers renewal and retry.
const UNAUTHORIZED: u16 = 401;

/// Uniform result of an API call.
///
/// `redirect` set means: stop processing and navigate there. `error` alone
/// is a plain failure the caller reports inline.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome<T> {
    pub error: bool,
    pub response: Option<T>,
    pub redirect: Option<String>,
    /// HTTP status of the final attempt, if one completed.
    pub status: Option<u16>,
}

impl<T> RequestOutcome<T> {
    fn success(status: u16, response: T) -> Self {
        Self {
            error: false,
            response: Some(response),
            redirect: None,
            status: Some(status),
        }
    }

    fn failure(status: Option<u16>, response: Option<T>) -> Self {
        Self {
            error: true,
            response,
            redirect: None,
            status,
        }
    }

    fn login_redirect() -> Self {
        Self {
            error: true,
            response: None,
            redirect: Some(LOGIN_REDIRECT.to_owned()),
            status: None,
        }
    }

    pub fn is_success(&self) -> bool {
        !self.error
    }
}

/// Description of one API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub path: String,
    pub method: Method,
    pub use_auth: bool,
    body: Option<Result<String, String>>,
}

impl ApiRequest {
    /// Authenticated request without a body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            use_auth: true,
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Send without the access token and without 401 recovery.
    pub fn without_auth(mut self) -> Self {
        self.use_auth = false;
        self
    }

    /// Attach a JSON payload. An encoding failure is reported when sent.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.body = Some(serde_json::to_string(body).map_err(|e| e.to_string()));
        self
    }
}

/// API client sharing the credential store and session manager.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: SessionManager,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, session: SessionManager) -> Self {
        Self { transport, session }
    }

    /// Build the session manager and client over one transport and store.
    pub fn with_credentials(transport: Arc<dyn Transport>, credentials: CredentialStore) -> Self {
        let session = SessionManager::new(credentials, transport.clone());
        Self::new(transport, session)
    }

    pub fn credentials(&self) -> &CredentialStore {
        self.session.credentials()
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Send `call` and decode the response body as `T`.
    #[instrument(skip_all, fields(method = %call.method, path = %call.path, auth = call.use_auth))]
    pub async fn request<T: DeserializeOwned>(&self, call: ApiRequest) -> RequestOutcome<T> {
        let body = match call.body.clone().transpose() {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to encode request body");
                return RequestOutcome::failure(None, None);
            }
        };
        let mut wire = WireRequest::new(call.method.clone(), call.path.clone()).with_body(body);

        if call.use_auth && !self.attach_token(&mut wire).await {
            return RequestOutcome::login_redirect();
        }

        let response = match self.send(&wire).await {
            Some(response) => response,
            None => return RequestOutcome::failure(None, None),
        };

        if response.is_success() {
            return decode_success(response);
        }

        if call.use_auth && response.status == UNAUTHORIZED {
            debug!("access token rejected, renewing session");
            if !self.session.renew().await || !self.attach_token(&mut wire).await {
                self.forget_session();
                return RequestOutcome::login_redirect();
            }

            // The retry's result is final, a second 401 included
            return match self.send(&wire).await {
                Some(retry) if retry.is_success() => decode_success(retry),
                Some(retry) => RequestOutcome::failure(Some(retry.status), decode_lenient(&retry)),
                None => RequestOutcome::failure(None, None),
            };
        }

        RequestOutcome::failure(Some(response.status), decode_lenient(&response))
    }

    /// Convenience for an authenticated GET.
    pub async fn get<T: DeserializeOwned>(&self, path: impl Into<String>) -> RequestOutcome<T> {
        self.request(ApiRequest::get(path)).await
    }

    /// Put the stored access token on `wire`, renewing first if none is
    /// stored. `false` means the caller must redirect to login.
    async fn attach_token(&self, wire: &mut WireRequest) -> bool {
        let credentials = self.session.credentials();
        let token = match credentials.access_token() {
            Some(token) => token,
            None => {
                if credentials.refresh_token().is_none() {
                    debug!("no credentials stored");
                    return false;
                }
                if !self.session.renew().await {
                    return false;
                }
                match credentials.access_token() {
                    Some(token) => token,
                    None => return false,
                }
            }
        };

        match wire.set_token(token.expose_str()) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "stored access token is not a valid header value");
                false
            }
        }
    }

    async fn send(&self, wire: &WireRequest) -> Option<RawResponse> {
        let method = wire.method.to_string();
        match self.transport.send(wire).await {
            Ok(response) => {
                metrics::counter!(
                    "api_requests_total",
                    "method" => method,
                    "status" => response.status.to_string()
                )
                .increment(1);
                Some(response)
            }
            Err(e) => {
                metrics::counter!(
                    "api_requests_total",
                    "method" => method,
                    "status" => "transport_error"
                )
                .increment(1);
                warn!(error = %e, "request failed");
                None
            }
        }
    }

    fn forget_session(&self) {
        if let Err(e) = self.session.credentials().clear_all() {
            warn!(error = %e, "failed to clear credentials");
        }
    }
}

/// Decode a 2xx body. A body that does not decode makes the whole call a
/// transport-class failure. Empty bodies decode as JSON `null`.
fn decode_success<T: DeserializeOwned>(response: RawResponse) -> RequestOutcome<T> {
    match decode(&response.body) {
        Ok(value) => RequestOutcome::success(response.status, value),
        Err(e) => {
            warn!(status = response.status, error = %e, "failed to decode response body");
            RequestOutcome::failure(Some(response.status), None)
        }
    }
}

/// Decode an error body if it happens to match `T`.
fn decode_lenient<T: DeserializeOwned>(response: &RawResponse) -> Option<T> {
    decode(&response.body).ok()
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> serde_json::Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_slice(b"null")
    } else {
        serde_json::from_slice(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedTransport, tokens};
    use finance_auth::{CredentialKey, KeyValueStore, MemoryStore};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Balance {
        balance: f64,
    }

    fn client(transport: Arc<ScriptedTransport>) -> (ApiClient, Arc<MemoryStore>) {
        let backing = Arc::new(MemoryStore::new());
        let creds = CredentialStore::new(backing.clone());
        (ApiClient::with_credentials(transport, creds), backing)
    }

    #[tokio::test]
    async fn no_tokens_redirects_without_network() {
        let transport = ScriptedTransport::new();
        let (client, _) = client(transport.clone());

        let outcome: RequestOutcome<Balance> = client.get("/balance").await;

        assert!(outcome.error);
        assert_eq!(outcome.redirect.as_deref(), Some("/login"));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn attaches_stored_access_token() {
        let transport = ScriptedTransport::new();
        transport.reply("/balance", Reply::Json(200, json!({"balance": 120.5})));
        let (client, _) = client(transport.clone());
        client.credentials().set("at_1", "rt_1", None).unwrap();

        let outcome: RequestOutcome<Balance> = client.get("/balance").await;

        assert!(outcome.is_success());
        assert_eq!(outcome.response, Some(Balance { balance: 120.5 }));
        assert!(outcome.redirect.is_none());
        assert_eq!(transport.calls()[0].token.as_deref(), Some("at_1"));
    }

    #[tokio::test]
    async fn missing_access_token_renews_then_sends() {
        let transport = ScriptedTransport::new();
        transport.reply("/refresh", tokens("at_new", "rt_new"));
        transport.reply("/balance", Reply::Json(200, json!({"balance": 3.0})));
        let (client, backing) = client(transport.clone());
        backing.set("refreshToken", "rt_old").unwrap();

        let outcome: RequestOutcome<Balance> = client.get("/balance").await;

        assert!(outcome.is_success());
        assert_eq!(transport.calls_to("/refresh"), 1);
        assert_eq!(transport.calls_to("/balance"), 1);
        let calls = transport.calls();
        assert_eq!(calls[0].path, "/refresh");
        assert_eq!(calls[1].token.as_deref(), Some("at_new"));
    }

    #[tokio::test]
    async fn failed_upfront_renewal_redirects() {
        let transport = ScriptedTransport::new();
        transport.reply("/refresh", Reply::Raw(400, r#"{"error":true}"#));
        let (client, backing) = client(transport.clone());
        backing.set("refreshToken", "rt_bad").unwrap();

        let outcome: RequestOutcome<Balance> = client.get("/balance").await;

        assert_eq!(outcome.redirect.as_deref(), Some("/login"));
        assert_eq!(transport.calls_to("/balance"), 0);
    }

    #[tokio::test]
    async fn unauthorized_renews_and_retries_once() {
        let transport = ScriptedTransport::new();
        transport.reply("/balance", Reply::Raw(401, r#"{"error":true,"message":"jwt expired"}"#));
        transport.reply("/balance", Reply::Json(200, json!({"balance": 9.0})));
        transport.reply("/refresh", tokens("at_new", "rt_new"));
        let (client, _) = client(transport.clone());
        client.credentials().set("at_old", "rt_old", None).unwrap();

        let outcome: RequestOutcome<Balance> = client.get("/balance").await;

        assert!(outcome.is_success());
        assert_eq!(outcome.response, Some(Balance { balance: 9.0 }));
        let balance_tokens: Vec<_> = transport
            .calls()
            .into_iter()
            .filter(|c| c.path == "/balance")
            .map(|c| c.token)
            .collect();
        assert_eq!(
            balance_tokens,
            vec![Some("at_old".to_owned()), Some("at_new".to_owned())]
        );
    }

    #[tokio::test]
    async fn second_unauthorized_is_not_retried() {
        let transport = ScriptedTransport::new();
        transport.reply("/balance", Reply::Raw(401, r#"{"error":true}"#));
        transport.reply("/refresh", tokens("at_new", "rt_new"));
        let (client, _) = client(transport.clone());
        client.credentials().set("at_old", "rt_old", None).unwrap();

        let outcome: RequestOutcome<serde_json::Value> = client.get("/balance").await;

        assert!(outcome.error);
        assert!(outcome.redirect.is_none());
        assert_eq!(outcome.status, Some(401));
        assert_eq!(transport.calls_to("/refresh"), 1);
        assert_eq!(transport.calls_to("/balance"), 2);
    }

    #[tokio::test]
    async fn unrecoverable_unauthorized_clears_and_redirects() {
        let transport = ScriptedTransport::new();
        transport.reply("/balance", Reply::Raw(401, r#"{"error":true}"#));
        transport.reply("/refresh", Reply::Raw(401, r#"{"error":true}"#));
        let (client, backing) = client(transport.clone());
        client.credentials().set("at_old", "rt_old", None).unwrap();
        backing.set("userData", r#"{"id":1,"name":"Ann"}"#).unwrap();

        let outcome: RequestOutcome<Balance> = client.get("/balance").await;

        assert_eq!(outcome.redirect.as_deref(), Some("/login"));
        assert!(!client.credentials().is_authenticated());
        assert!(backing.get("userData").is_none());
        assert_eq!(transport.calls_to("/balance"), 1);
    }

    #[tokio::test]
    async fn unauthorized_without_auth_is_plain_error() {
        let transport = ScriptedTransport::new();
        transport.reply("/login", Reply::Json(401, json!({"error": true, "message": "bad creds"})));
        let (client, _) = client(transport.clone());

        let outcome: RequestOutcome<serde_json::Value> = client
            .request(ApiRequest::post("/login").without_auth().json(&json!({"email": "a"})))
            .await;

        assert!(outcome.error);
        assert!(outcome.redirect.is_none());
        assert_eq!(outcome.response.unwrap()["message"], "bad creds");
        assert_eq!(transport.calls_to("/refresh"), 0);
        assert!(transport.calls()[0].token.is_none());
    }

    #[tokio::test]
    async fn error_status_surfaces_body_without_redirect() {
        let transport = ScriptedTransport::new();
        transport.reply(
            "/categories/income",
            Reply::Json(400, json!({"error": true, "message": "exists"})),
        );
        let (client, _) = client(transport.clone());
        client.credentials().set("at", "rt", None).unwrap();

        let outcome: RequestOutcome<serde_json::Value> = client
            .request(ApiRequest::post("/categories/income").json(&json!({"title": "Salary"})))
            .await;

        assert!(outcome.error);
        assert!(outcome.redirect.is_none());
        assert_eq!(outcome.status, Some(400));
        assert_eq!(outcome.response.unwrap()["message"], "exists");
        assert_eq!(
            transport.calls()[0].body.as_deref(),
            Some(r#"{"title":"Salary"}"#)
        );
    }

    #[tokio::test]
    async fn transport_failure_is_error_without_redirect() {
        let transport = ScriptedTransport::new();
        transport.reply("/balance", Reply::Fail);
        let (client, _) = client(transport.clone());
        client.credentials().set("at", "rt", None).unwrap();

        let outcome: RequestOutcome<Balance> = client.get("/balance").await;

        assert!(outcome.error);
        assert!(outcome.redirect.is_none());
        assert!(outcome.status.is_none());
        assert!(client.credentials().is_authenticated());
    }

    #[tokio::test]
    async fn undecodable_success_body_is_transport_failure() {
        let transport = ScriptedTransport::new();
        transport.reply("/balance", Reply::Raw(200, "<html>oops</html>"));
        let (client, _) = client(transport.clone());
        client.credentials().set("at", "rt", None).unwrap();

        let outcome: RequestOutcome<Balance> = client.get("/balance").await;

        assert!(outcome.error);
        assert!(outcome.redirect.is_none());
        assert!(outcome.response.is_none());
    }

    #[tokio::test]
    async fn empty_success_body_decodes_as_unit() {
        let transport = ScriptedTransport::new();
        transport.reply("/operations/4", Reply::Raw(200, ""));
        let (client, _) = client(transport.clone());
        client.credentials().set("at", "rt", None).unwrap();

        let outcome: RequestOutcome<()> =
            client.request(ApiRequest::delete("/operations/4")).await;

        assert!(outcome.is_success());
        assert_eq!(transport.calls()[0].method, "DELETE");
    }

    #[tokio::test]
    async fn concurrent_unauthorized_requests_share_one_renewal() {
        let transport = ScriptedTransport::with_delay(std::time::Duration::from_millis(10));
        transport.reply("/refresh", tokens("at_new", "rt_new"));
        transport.reply("/balance", Reply::Json(200, json!({"balance": 1.0})));
        let (client, backing) = client(transport.clone());
        backing.set("refreshToken", "rt_old").unwrap();

        let outcomes = futures_util::future::join_all(
            (0..4).map(|_| client.get::<Balance>("/balance")),
        )
        .await;

        assert!(outcomes.iter().all(RequestOutcome::is_success));
        assert_eq!(transport.calls_to("/refresh"), 1);
        assert_eq!(transport.calls_to("/balance"), 4);
        assert_eq!(
            client.credentials().get(CredentialKey::AccessToken).as_deref(),
            Some("at_new")
        );
    }
}
