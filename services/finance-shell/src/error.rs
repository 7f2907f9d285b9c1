//! Shell-specific error types

use finance_session::AccountError;
use thiserror::Error;

/// Outcome of submitting an auth form.
///
/// Both variants are shown inline on the form; neither leaves the page.
#[derive(Error, Debug)]
pub enum FormError {
    #[error("invalid fields: {}", .0.join(", "))]
    Invalid(Vec<&'static str>),

    #[error("this form is only available on {0}")]
    WrongPage(&'static str),

    #[error(transparent)]
    Account(#[from] AccountError),
}

/// A console line that does not parse as a command.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}
