//! Client-side router for the finance tracker
//!
//! Maps history entries to routes, gates protected routes on the session,
//! materializes views through a `PageLayer` and drives page controllers
//! through `activate`/`deactivate`. Browser surfaces (history, document,
//! template fetch) are traits, so the router runs headless.

pub mod error;
pub mod history;
pub mod layer;
pub mod links;
pub mod page;
pub mod route;
pub mod router;

#[cfg(test)]
mod testing;

pub use error::{PageError, Result, RouterError};
pub use history::{History, MemoryHistory, query_param, route_path};
pub use layer::{BalanceDisplay, Mount, PageLayer};
pub use links::{LinkAction, MENU_PARENTS, intercept_link, menu_path};
pub use page::{PageContext, PageController, PageFactory};
pub use route::{Route, RouteTable, RouteTableBuilder};
pub use router::{
    DEFAULT_TITLE_SUFFIX, HOME_PATH, LOGIN_PATH, LOGOUT_PATH, MAX_REDIRECTS, NOT_FOUND_PATH,
    Navigation, NavigationState, Navigator, Router, RouterSettings, SIGN_UP_PATH,
};
