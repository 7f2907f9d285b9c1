//! Error types for the session layer

/// Failures below the HTTP status line: the request never produced a
/// response, or the response body could not be read.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("reading response body failed: {0}")]
    Body(String),
}

/// Why a login, sign-up or logout did not complete.
///
/// Page controllers map every variant to the same inline error indicator;
/// the distinction is for logs.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("server rejected the request (status {status:?})")]
    Rejected { status: Option<u16> },

    #[error("server response is missing required fields")]
    Malformed,

    #[error("request failed before reaching the server")]
    Transport,

    #[error("credential store error: {0}")]
    Store(#[from] finance_auth::Error),
}
