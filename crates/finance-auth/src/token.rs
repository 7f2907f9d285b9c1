//! Wire types for the auth endpoints
//!
//! The API is loose about response shapes, so response types keep every field
//! optional and validation happens in one place (`TokenFields::pair`,
//! `LoginResponse::validate`). Request types serialize with the camelCase
//! names the server expects.

use serde::{Deserialize, Serialize};

use crate::credentials::{UserId, UserInfo, UserProfile};

/// `tokens` object as returned by `/login` and `/refresh`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenFields {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// A validated access/refresh pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenFields {
    /// Both tokens, if both are present and non-empty.
    pub fn pair(&self) -> Option<TokenPair> {
        let access = self.access_token.as_deref().filter(|s| !s.is_empty())?;
        let refresh = self.refresh_token.as_deref().filter(|s| !s.is_empty())?;
        Some(TokenPair {
            access_token: access.to_owned(),
            refresh_token: refresh.to_owned(),
        })
    }
}

/// Body of `POST /refresh`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
    pub remember_me: bool,
}

/// Response of `POST /refresh`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub tokens: Option<TokenFields>,
}

impl RefreshResponse {
    pub fn pair(&self) -> Option<TokenPair> {
        self.tokens.as_ref().and_then(TokenFields::pair)
    }
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

/// `user` object of the login response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Response of `POST /login`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub tokens: Option<TokenFields>,
    #[serde(default)]
    pub user: Option<LoginUser>,
}

impl LoginResponse {
    /// Tokens, identity and display cache, or `None` if anything required is
    /// missing (both tokens, `user.id`, non-empty `user.name`).
    pub fn validate(&self) -> Option<(TokenPair, UserInfo, UserProfile)> {
        let pair = self.tokens.as_ref()?.pair()?;
        let user = self.user.as_ref()?;
        let id = user.id.clone()?;
        let name = user.name.clone().filter(|n| !n.is_empty())?;
        let last_name = user.last_name.clone().filter(|l| !l.is_empty());
        let full_name = last_name.as_ref().map(|l| format!("{name} {l}"));

        let info = UserInfo {
            id: id.clone(),
            name: name.clone(),
        };
        let profile = UserProfile {
            id,
            name,
            email: user.email.clone(),
            last_name,
            full_name,
        };
        Some((pair, info, profile))
    }
}

/// Body of `POST /signup`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub password_repeat: String,
}

/// Body of `POST /logout`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: String,
}
