//! Common types shared by the finance client crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
