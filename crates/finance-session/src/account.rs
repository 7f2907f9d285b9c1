//! Login, sign-up and logout
//!
//! These run without the access token: the auth endpoints predate a session.
//! Success stores the token pair, the `{id, name}` user info and the
//! user-panel display cache in one go.

use finance_auth::{
    LOGIN_ENDPOINT, LOGOUT_ENDPOINT, LoginRequest, LoginResponse, LogoutRequest, SIGNUP_ENDPOINT,
    SignUpRequest, UserProfile,
};
use tracing::{info, warn};

use crate::client::{ApiClient, ApiRequest, RequestOutcome};
use crate::error::AccountError;

/// Exchange email and password for a session.
pub async fn login(
    client: &ApiClient,
    email: &str,
    password: &str,
    remember_me: bool,
) -> Result<UserProfile, AccountError> {
    let outcome: RequestOutcome<LoginResponse> = client
        .request(
            ApiRequest::post(LOGIN_ENDPOINT)
                .without_auth()
                .json(&LoginRequest {
                    email: email.to_owned(),
                    password: password.to_owned(),
                    remember_me,
                }),
        )
        .await;

    if outcome.error {
        return Err(match outcome.status {
            Some(status) => AccountError::Rejected {
                status: Some(status),
            },
            None => AccountError::Transport,
        });
    }

    let (pair, info, profile) = outcome
        .response
        .as_ref()
        .and_then(LoginResponse::validate)
        .ok_or(AccountError::Malformed)?;

    let credentials = client.credentials();
    credentials.set(&pair.access_token, &pair.refresh_token, Some(&info))?;
    credentials.set_profile(&profile)?;
    info!(user_id = %profile.id, "logged in");
    Ok(profile)
}

/// Create an account, then log straight into it.
pub async fn sign_up(client: &ApiClient, request: &SignUpRequest) -> Result<UserProfile, AccountError> {
    let outcome: RequestOutcome<serde_json::Value> = client
        .request(ApiRequest::post(SIGNUP_ENDPOINT).without_auth().json(request))
        .await;

    if outcome.error {
        return Err(match outcome.status {
            Some(status) => AccountError::Rejected {
                status: Some(status),
            },
            None => AccountError::Transport,
        });
    }

    let created = outcome
        .response
        .as_ref()
        .and_then(|body| body.get("user"))
        .is_some_and(|user| !user.is_null());
    if !created {
        return Err(AccountError::Malformed);
    }

    info!(email = %request.email, "account created");
    login(client, &request.email, &request.password, false).await
}

/// End the session on the server (best effort) and locally (always).
pub async fn logout(client: &ApiClient) {
    let credentials = client.credentials();
    match credentials.refresh_token() {
        Some(refresh) => {
            let outcome: RequestOutcome<serde_json::Value> = client
                .request(
                    ApiRequest::post(LOGOUT_ENDPOINT)
                        .without_auth()
                        .json(&LogoutRequest {
                            refresh_token: refresh.expose_str().to_owned(),
                        }),
                )
                .await;
            if outcome.error {
                warn!(status = ?outcome.status, "server-side logout failed, logging out locally");
            }
        }
        None => warn!("no refresh token at logout, logging out locally"),
    }

    if let Err(e) = credentials.clear_all() {
        warn!(error = %e, "failed to clear credentials at logout");
    }
    info!("logged out");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedTransport};
    use finance_auth::{CredentialStore, MemoryStore};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;

    fn client(transport: Arc<ScriptedTransport>) -> ApiClient {
        let creds = CredentialStore::new(Arc::new(MemoryStore::new()));
        ApiClient::with_credentials(transport, creds)
    }

    fn login_reply() -> Reply {
        Reply::Json(
            200,
            json!({
                "tokens": {"accessToken": "at_1", "refreshToken": "rt_1"},
                "user": {"id": 5, "name": "Ann", "email": "ann@example.com", "lastName": "Lee"}
            }),
        )
    }

    #[tokio::test]
    async fn login_then_balance_uses_new_token() {
        #[derive(Deserialize)]
        struct Balance {
            balance: f64,
        }

        let transport = ScriptedTransport::new();
        transport.reply("/login", login_reply());
        transport.reply("/balance", Reply::Json(200, json!({"balance": 42.0})));
        let client = client(transport.clone());

        let profile = login(&client, "ann@example.com", "secret", true).await.unwrap();
        assert_eq!(profile.display_name(), "Ann Lee");
        assert_eq!(
            client.credentials().user_display_name().as_deref(),
            Some("Ann Lee")
        );

        let body: serde_json::Value =
            serde_json::from_str(transport.calls()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"email": "ann@example.com", "password": "secret", "rememberMe": true})
        );

        let outcome: RequestOutcome<Balance> = client.get("/balance").await;
        assert!(outcome.is_success());
        assert_eq!(outcome.response.unwrap().balance, 42.0);
        assert_eq!(transport.calls()[1].token.as_deref(), Some("at_1"));
    }

    #[tokio::test]
    async fn rejected_login_stores_nothing() {
        let transport = ScriptedTransport::new();
        transport.reply("/login", Reply::Json(401, json!({"error": true})));
        let client = client(transport.clone());

        let err = login(&client, "a@b.co", "bad", false).await.unwrap_err();
        assert!(matches!(err, AccountError::Rejected { status: Some(401) }));
        assert!(!client.credentials().is_authenticated());
        assert_eq!(transport.calls_to("/refresh"), 0);
    }

    #[tokio::test]
    async fn login_response_without_tokens_is_malformed() {
        let transport = ScriptedTransport::new();
        transport.reply("/login", Reply::Json(200, json!({"user": {"id": 1, "name": "A"}})));
        let client = client(transport);

        let err = login(&client, "a@b.co", "pw", false).await.unwrap_err();
        assert!(matches!(err, AccountError::Malformed));
        assert!(!client.credentials().is_authenticated());
    }

    #[tokio::test]
    async fn sign_up_logs_in_afterwards() {
        let transport = ScriptedTransport::new();
        transport.reply(
            "/signup",
            Reply::Json(200, json!({"user": {"id": 5, "name": "Ann", "lastName": "Lee"}})),
        );
        transport.reply("/login", login_reply());
        let client = client(transport.clone());

        let request = SignUpRequest {
            name: "Ann".into(),
            last_name: "Lee".into(),
            email: "ann@example.com".into(),
            password: "Secret123".into(),
            password_repeat: "Secret123".into(),
        };
        sign_up(&client, &request).await.unwrap();

        let paths: Vec<_> = transport.calls().into_iter().map(|c| c.path).collect();
        assert_eq!(paths, vec!["/signup", "/login"]);
        assert!(client.credentials().is_authenticated());
    }

    #[tokio::test]
    async fn logout_clears_even_when_server_fails() {
        let transport = ScriptedTransport::new();
        transport.reply("/logout", Reply::Fail);
        let client = client(transport.clone());
        client.credentials().set("at", "rt_9", None).unwrap();

        logout(&client).await;

        assert!(!client.credentials().is_authenticated());
        let call = &transport.calls()[0];
        assert_eq!(call.path, "/logout");
        assert!(call.token.is_none());
        assert_eq!(call.body.as_deref(), Some(r#"{"refreshToken":"rt_9"}"#));
    }

    #[tokio::test]
    async fn logout_without_refresh_token_skips_network() {
        let transport = ScriptedTransport::new();
        let client = client(transport.clone());

        logout(&client).await;
        assert!(transport.calls().is_empty());
    }
}
