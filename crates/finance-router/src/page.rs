//! Page controllers
//!
//! A controller owns one view's behavior between `activate` and `deactivate`.
//! Routes hold factories rather than instances so every activation starts
//! from a fresh controller.

use std::sync::Arc;

use finance_auth::KeyValueStore;
use finance_session::ApiClient;
use futures_util::future::BoxFuture;

use crate::layer::PageLayer;
use crate::router::Navigator;

/// What a controller can reach when it is built.
#[derive(Clone)]
pub struct PageContext {
    pub client: ApiClient,
    pub layer: Arc<dyn PageLayer>,
    /// Tab-scoped store for view state (filters, menu selection).
    pub tab_store: Arc<dyn KeyValueStore>,
    /// The history entry being activated, query string included.
    pub entry: String,
}

impl PageContext {
    /// Value of a query parameter of the activated entry.
    pub fn query(&self, name: &str) -> Option<String> {
        crate::history::query_param(&self.entry, name)
    }
}

/// Behavior attached to a route.
pub trait PageController: Send {
    /// Set up the view. Navigations requested through `navigator` while the
    /// router is activating run after this activation settles.
    fn activate<'a>(&'a mut self, navigator: Navigator) -> BoxFuture<'a, ()>;

    /// Undo whatever `activate` attached to the document.
    fn deactivate<'a>(&'a mut self) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }
}

/// Builds a controller for one activation.
pub type PageFactory = Arc<dyn Fn(&PageContext) -> Box<dyn PageController> + Send + Sync>;
