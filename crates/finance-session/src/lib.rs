//! Session layer for the finance tracker client
//!
//! Three pieces, leaf to root:
//! - `Transport`: sends one JSON request to the API and hands back status + body.
//! - `SessionManager`: exchanges the refresh token for a new pair, with at most
//!   one exchange in flight no matter how many callers ask.
//! - `ApiClient`: attaches the access token, and on a 401 renews once and
//!   retries once. Every call returns a `RequestOutcome`; expected failures
//!   never surface as `Err`.
//!
//! `account` and `endpoints` are thin typed helpers over `ApiClient` for the
//! auth forms and the finance resources.

pub mod account;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use account::{login, logout, sign_up};
pub use client::{ApiClient, ApiRequest, RequestOutcome};
pub use endpoints::{
    Amount, BalanceResponse, Category, CategoryKind, CategoryRef, CategoryTotals, Operation,
    OperationKind, category_path, fetch_balance, normalize_category_title, operations_path,
    totals_by_category,
};
pub use error::{AccountError, TransportError};
pub use session::SessionManager;
pub use transport::{HttpTransport, RawResponse, Transport, WireRequest};
