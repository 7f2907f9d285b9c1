//! Credential storage for the signed-in user
//!
//! Three entries make up a session: the access token, the refresh token and
//! the `{id, name}` user info. Token contents are opaque; nothing here
//! validates them. A fourth entry, `userData`, caches what the user panel
//! shows and is only dropped on full sign-out.
//!
//! The store is shared by reference between the session manager, the request
//! client, the router and page controllers. Every read goes to the backing
//! store, so a write from one component is visible to the others immediately.

use std::fmt;
use std::sync::Arc;

use common::Secret;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{
    ACCESS_TOKEN_KEY, FALLBACK_USER_NAME, REFRESH_TOKEN_KEY, USER_DATA_KEY, USER_INFO_KEY,
};
use crate::error::{Error, Result};
use crate::store::KeyValueStore;

/// Server-side user identifier. The API returns either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{n}"),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

/// Identity stored next to the tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    pub name: String,
}

/// User-panel display cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl UserProfile {
    /// `fullName`, then `name`, then the generic fallback.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(Some(self.name.as_str()).filter(|s| !s.is_empty()))
            .unwrap_or(FALLBACK_USER_NAME)
    }
}

/// Keys addressable through [`CredentialStore::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKey {
    AccessToken,
    RefreshToken,
    UserInfo,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 3] = [
        CredentialKey::AccessToken,
        CredentialKey::RefreshToken,
        CredentialKey::UserInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::AccessToken => ACCESS_TOKEN_KEY,
            CredentialKey::RefreshToken => REFRESH_TOKEN_KEY,
            CredentialKey::UserInfo => USER_INFO_KEY,
        }
    }
}

/// Snapshot of every credential entry at one point in time.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub access_token: Option<Secret<String>>,
    pub refresh_token: Option<Secret<String>>,
    pub user_info: Option<UserInfo>,
}

/// Credential accessor over a shared key/value store.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist a token pair, and the user info when provided.
    ///
    /// Omitting `user_info` leaves any previously stored info in place, which
    /// is what a refresh wants.
    pub fn set(&self, access: &str, refresh: &str, user_info: Option<&UserInfo>) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, access)?;
        self.store.set(REFRESH_TOKEN_KEY, refresh)?;
        if let Some(info) = user_info {
            let json = serde_json::to_string(info)
                .map_err(|e| Error::Serialize(format!("serializing user info: {e}")))?;
            self.store.set(USER_INFO_KEY, &json)?;
        }
        debug!(with_user_info = user_info.is_some(), "stored credentials");
        Ok(())
    }

    /// Raw stored value for one key. Empty strings count as absent.
    pub fn get(&self, key: CredentialKey) -> Option<String> {
        self.store.get(key.as_str()).filter(|v| !v.is_empty())
    }

    /// All three entries at once.
    pub fn snapshot(&self) -> Credentials {
        Credentials {
            access_token: self.access_token(),
            refresh_token: self.refresh_token(),
            user_info: self.user_info(),
        }
    }

    pub fn access_token(&self) -> Option<Secret<String>> {
        self.get(CredentialKey::AccessToken).map(Secret::new)
    }

    pub fn refresh_token(&self) -> Option<Secret<String>> {
        self.get(CredentialKey::RefreshToken).map(Secret::new)
    }

    pub fn user_info(&self) -> Option<UserInfo> {
        let raw = self.get(CredentialKey::UserInfo)?;
        match serde_json::from_str(&raw) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(error = %e, "stored user info is not valid JSON");
                None
            }
        }
    }

    /// Remove the three credential entries.
    pub fn clear(&self) -> Result<()> {
        for key in CredentialKey::ALL {
            self.store.remove(key.as_str())?;
        }
        debug!("cleared credentials");
        Ok(())
    }

    /// Remove the credentials and the display cache.
    pub fn clear_all(&self) -> Result<()> {
        self.clear()?;
        self.store.remove(USER_DATA_KEY)
    }

    /// A session is believed live while either token is present; a
    /// refresh-only session is recovered by the request client.
    pub fn is_authenticated(&self) -> bool {
        self.get(CredentialKey::AccessToken).is_some()
            || self.get(CredentialKey::RefreshToken).is_some()
    }

    pub fn set_profile(&self, profile: &UserProfile) -> Result<()> {
        let json = serde_json::to_string(profile)
            .map_err(|e| Error::Serialize(format!("serializing user profile: {e}")))?;
        self.store.set(USER_DATA_KEY, &json)
    }

    pub fn profile(&self) -> Option<UserProfile> {
        let raw = self.store.get(USER_DATA_KEY)?;
        serde_json::from_str(&raw).ok()
    }

    /// Name for the user panel, or `None` when no display cache exists.
    ///
    /// A cache that fails to parse still yields the fallback name, since the
    /// user is signed in and the panel should not stay blank.
    pub fn user_display_name(&self) -> Option<String> {
        let raw = self.store.get(USER_DATA_KEY)?;
        match serde_json::from_str::<UserProfile>(&raw) {
            Ok(profile) => Some(profile.display_name().to_owned()),
            Err(e) => {
                warn!(error = %e, "failed to parse cached user data");
                Some(FALLBACK_USER_NAME.to_owned())
            }
        }
    }
}
