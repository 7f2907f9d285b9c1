//! The page layer: everything the router does to the document
//!
//! In the browser this is the DOM plus `fetch` for templates. The router only
//! sees this trait, so it runs the same against the console renderer and the
//! recording layer used in tests.

use std::fmt;

use futures_util::future::BoxFuture;

use crate::error::PageError;

/// Where a fetched fragment is spliced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mount {
    /// The page-level content region.
    Content,
    /// The inner slot a shared layout exposes once spliced into `Content`.
    LayoutSlot,
}

impl Mount {
    pub fn id(&self) -> &'static str {
        match self {
            Mount::Content => "content",
            Mount::LayoutSlot => "content-layout",
        }
    }
}

impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// What the balance widget shows.
#[derive(Debug, Clone, PartialEq)]
pub enum BalanceDisplay {
    Amount(f64),
    Unavailable,
}

impl fmt::Display for BalanceDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalanceDisplay::Amount(value) => write!(f, "{value}$"),
            BalanceDisplay::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Document operations the router and page controllers perform.
pub trait PageLayer: Send + Sync {
    /// Inject stylesheet assets into the document head.
    fn attach_styles(&self, styles: &[String]);

    fn detach_styles(&self, styles: &[String]);

    fn set_title(&self, title: &str);

    /// Add or remove `class` on the element addressed by `target`
    /// (`"body"` or an element id).
    fn set_class(&self, target: &str, class: &str, enabled: bool);

    /// Fetch a template or layout fragment by reference.
    fn fetch_fragment<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, Result<String, PageError>>;

    /// Replace the contents of `mount`. Fails when the mount is not in the
    /// document.
    fn splice(&self, mount: Mount, html: &str) -> Result<(), PageError>;

    fn set_user_name(&self, name: &str);

    fn set_balance(&self, balance: BalanceDisplay);

    /// Mark the menu entry linking to `path` active. Returns `false` when no
    /// entry links there.
    fn highlight_menu(&self, path: &str) -> bool;
}
