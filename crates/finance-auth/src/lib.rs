//! Client-side credential storage for the finance tracker
//!
//! Wraps a persistent key/value store (the browser's local storage in the web
//! build, a JSON file in the console shell) holding the access token, the
//! refresh token and the cached user info. A second, tab-scoped store holds
//! UI preferences that must not outlive the session.
//!
//! Nothing here talks to the network. Token exchange lives in
//! `finance-session`, which reads and writes through `CredentialStore`.

pub mod constants;
pub mod credentials;
pub mod error;
pub mod preferences;
pub mod store;
pub mod token;

pub use constants::*;
pub use credentials::{CredentialKey, CredentialStore, Credentials, UserId, UserInfo, UserProfile};
pub use error::{Error, Result};
pub use preferences::{DateInterval, FilterPreferences, FilterSelection, PeriodFilter};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use token::{
    LoginRequest, LoginResponse, LoginUser, LogoutRequest, RefreshRequest, RefreshResponse,
    SignUpRequest, TokenFields, TokenPair,
};
