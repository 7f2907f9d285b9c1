//! Storage keys and API endpoint paths
//!
//! Key names match what the web build writes into local storage, so a shell
//! session and a browser session can share a credentials export.

/// Local storage key holding the access token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Local storage key holding the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Local storage key holding `{id, name}` of the signed-in user
pub const USER_INFO_KEY: &str = "userInfo";

/// Local storage key holding the user-panel display cache
pub const USER_DATA_KEY: &str = "userData";

/// Session storage key remembering the last highlighted menu entry
pub const ACTIVE_MENU_KEY: &str = "activeMenuItem";

/// Session-scoped filter preference keys, cleared on tab close
pub const PERIOD_FILTER_KEY: &str = "app_period_filter";
pub const PERIOD_FROM_KEY: &str = "app_period_from";
pub const PERIOD_TO_KEY: &str = "app_period_to";

/// Header carrying the access token on authenticated requests
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// API endpoints, relative to the configured base URL
pub const LOGIN_ENDPOINT: &str = "/login";
pub const SIGNUP_ENDPOINT: &str = "/signup";
pub const LOGOUT_ENDPOINT: &str = "/logout";
pub const REFRESH_ENDPOINT: &str = "/refresh";
pub const BALANCE_ENDPOINT: &str = "/balance";
pub const OPERATIONS_ENDPOINT: &str = "/operations";
pub const CATEGORIES_ENDPOINT: &str = "/categories";

/// Display name used when the cached user record has none
pub const FALLBACK_USER_NAME: &str = "User";
