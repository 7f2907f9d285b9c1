//! Route activation
//!
//! One activation tears down the tracked active route, resolves the target,
//! applies the auth gate, materializes the view and activates the page
//! controller. Gate and 404 outcomes are redirects: the history entry is
//! replaced and activation re-enters for the new path, at most
//! `MAX_REDIRECTS` times.
//!
//! Navigations never overlap. Each request is queued; whoever finds the
//! router idle drives the queue until it is empty. A controller that
//! navigates from `activate` only enqueues, so its request runs after the
//! current activation settles.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use finance_auth::{ACTIVE_MENU_KEY, KeyValueStore};
use finance_session::{ApiClient, fetch_balance};
use parking_lot::Mutex;
use tracing::{Instrument, debug, error, info, info_span, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{Result, RouterError};
use crate::history::{History, route_path};
use crate::layer::{BalanceDisplay, Mount, PageLayer};
use crate::links::{LinkAction, intercept_link, menu_path};
use crate::page::{PageContext, PageController};
use crate::route::{Route, RouteTable};

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const SIGN_UP_PATH: &str = "/sign-up";
pub const LOGOUT_PATH: &str = "/logout";
pub const NOT_FOUND_PATH: &str = "/404";

pub const DEFAULT_TITLE_SUFFIX: &str = "Lumincoin Finance";

/// Upper bound on gate and 404 redirects within one navigation.
pub const MAX_REDIRECTS: usize = 8;

/// Body classes that switch on the sidebar chrome of layout pages.
const SIDEBAR_CLASSES: [&str; 2] = ["sidebar-mini", "layout-fixed"];

#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub title_suffix: String,
    /// Origin links are resolved against; other origins are not intercepted.
    pub origin: Url,
}

impl RouterSettings {
    pub fn new(origin: Url) -> Self {
        Self {
            title_suffix: DEFAULT_TITLE_SUFFIX.to_owned(),
            origin,
        }
    }
}

/// A navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Initial document load: activate the current entry.
    Start,
    /// Push `url` and activate it.
    Open(String),
    /// Back/forward already moved history: activate the current entry.
    PopState,
}

impl Navigation {
    fn kind(&self) -> &'static str {
        match self {
            Navigation::Start => "start",
            Navigation::Open(_) => "open",
            Navigation::PopState => "popstate",
        }
    }
}

/// Observable routing state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    /// Path of the route whose controller is active.
    pub active: Option<String>,
    /// Path of the route torn down most recently.
    pub previous: Option<String>,
    pub activating: bool,
    pub queued: usize,
}

/// Next step after one activation attempt.
enum Step {
    Settled,
    Redirect {
        to: &'static str,
        reason: &'static str,
    },
}

struct ActivePage {
    path: String,
    page: Option<Box<dyn PageController>>,
}

#[derive(Default)]
struct RouterState {
    queue: VecDeque<Navigation>,
    activating: bool,
    active: Option<ActivePage>,
    previous: Option<String>,
}

/// Client-side router. Cheap to clone; clones drive the same state.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    routes: RouteTable,
    history: Arc<dyn History>,
    layer: Arc<dyn PageLayer>,
    client: ApiClient,
    tab_store: Arc<dyn KeyValueStore>,
    settings: RouterSettings,
    state: Mutex<RouterState>,
}

/// Handle page controllers use to request navigation.
#[derive(Clone)]
pub struct Navigator {
    inner: Weak<RouterInner>,
}

impl Navigator {
    /// Open `url`. Runs immediately when the router is idle, otherwise after
    /// the navigations already queued.
    pub async fn navigate(&self, url: impl Into<String>) {
        let Some(inner) = self.inner.upgrade() else {
            debug!("router dropped, navigation ignored");
            return;
        };
        Router { inner }.navigate(Navigation::Open(url.into())).await;
    }
}

impl Router {
    pub fn new(
        routes: RouteTable,
        history: Arc<dyn History>,
        layer: Arc<dyn PageLayer>,
        client: ApiClient,
        tab_store: Arc<dyn KeyValueStore>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                routes,
                history,
                layer,
                client,
                tab_store,
                settings,
                state: Mutex::new(RouterState::default()),
            }),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.inner.routes
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    pub fn navigator(&self) -> Navigator {
        self.inner.navigator()
    }

    pub fn state(&self) -> NavigationState {
        let state = self.inner.state.lock();
        NavigationState {
            active: state.active.as_ref().map(|a| a.path.clone()),
            previous: state.previous.clone(),
            activating: state.activating,
            queued: state.queue.len(),
        }
    }

    /// Document ready: restore the saved menu highlight and activate the
    /// current entry.
    pub async fn start(&self) {
        if let Some(saved) = self.inner.tab_store.get(ACTIVE_MENU_KEY) {
            debug!(saved = %saved, "restoring menu highlight");
            self.inner.layer.highlight_menu(menu_path(route_path(&saved)));
        }
        self.navigate(Navigation::Start).await;
    }

    pub async fn open_new_route(&self, url: impl Into<String>) {
        self.navigate(Navigation::Open(url.into())).await;
    }

    /// Back/forward moved the history cursor.
    pub async fn pop_state(&self) {
        self.navigate(Navigation::PopState).await;
    }

    /// Global anchor-click handler. Same-origin links open in-app.
    pub async fn handle_click(&self, href: Option<&str>) -> LinkAction {
        let current = self.inner.history.current_path();
        let base = self
            .inner
            .settings
            .origin
            .join(&current)
            .unwrap_or_else(|_| self.inner.settings.origin.clone());

        let action = intercept_link(&base, href);
        match &action {
            LinkAction::Navigate(path) => self.open_new_route(path.clone()).await,
            LinkAction::Suppressed => debug!(?href, "no-op link suppressed"),
            LinkAction::NotIntercepted => {}
        }
        action
    }

    /// Queue `navigation` and, when idle, drive the queue to empty.
    pub async fn navigate(&self, navigation: Navigation) {
        {
            let mut state = self.inner.state.lock();
            state.queue.push_back(navigation);
            if state.activating {
                debug!(queued = state.queue.len(), "activation in progress, navigation queued");
                return;
            }
            state.activating = true;
        }

        let mut guard = DriveGuard {
            inner: &self.inner,
            armed: true,
        };
        loop {
            let next = {
                let mut state = self.inner.state.lock();
                let next = state.queue.pop_front();
                if next.is_none() {
                    state.activating = false;
                }
                next
            };
            match next {
                Some(navigation) => self.inner.process(navigation).await,
                None => break,
            }
        }
        guard.armed = false;
    }
}

/// Releases the router if the driving future is dropped mid-activation.
struct DriveGuard<'a> {
    inner: &'a Arc<RouterInner>,
    armed: bool,
}

impl Drop for DriveGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.state.lock().activating = false;
        }
    }
}

impl RouterInner {
    fn navigator(self: &Arc<Self>) -> Navigator {
        Navigator {
            inner: Arc::downgrade(self),
        }
    }

    async fn process(self: &Arc<Self>, navigation: Navigation) {
        let id = Uuid::new_v4();
        let span = info_span!("navigation", %id, kind = navigation.kind());
        async {
            let mut entry = match navigation {
                Navigation::Start | Navigation::PopState => self.history.current_path(),
                Navigation::Open(url) => {
                    self.history.push(&url);
                    url
                }
            };

            let mut redirects = 0;
            loop {
                match self.activate(&entry).await {
                    Ok(Step::Settled) => break,
                    Ok(Step::Redirect { to, reason }) => {
                        redirects += 1;
                        if redirects > MAX_REDIRECTS {
                            let err = RouterError::RedirectLimit(entry);
                            error!(error = %err, "navigation abandoned");
                            break;
                        }
                        info!(from = %entry, to, reason, "redirecting");
                        metrics::counter!("router_redirects_total", "reason" => reason).increment(1);
                        self.history.replace(to);
                        entry = to.to_owned();
                    }
                    Err(e) => {
                        error!(entry = %entry, error = %e, "activation aborted");
                        break;
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// One pass of the activation procedure for `entry`.
    async fn activate(self: &Arc<Self>, entry: &str) -> Result<Step> {
        let outgoing = self.state.lock().active.take();
        if let Some(outgoing) = outgoing {
            self.teardown(outgoing).await;
        }

        let path = route_path(entry);
        let route = self.routes.resolve(path);
        let authenticated = self.client.credentials().is_authenticated();

        if route.is_some_and(|r| r.requires_auth) && !authenticated {
            return Ok(Step::Redirect {
                to: LOGIN_PATH,
                reason: "auth_required",
            });
        }
        if authenticated && (path == LOGIN_PATH || path == SIGN_UP_PATH) {
            return Ok(Step::Redirect {
                to: HOME_PATH,
                reason: "already_authenticated",
            });
        }

        let Some(route) = route else {
            if path == NOT_FOUND_PATH {
                return Err(RouterError::Unroutable(entry.to_owned()));
            }
            info!(path, "no route matched");
            return Ok(Step::Redirect {
                to: NOT_FOUND_PATH,
                reason: "not_found",
            });
        };

        if let Err(e) = self.setup(route, entry, authenticated).await {
            self.undo_setup(route);
            return Err(e);
        }
        Ok(Step::Settled)
    }

    /// Roll back what a failed `setup` attached. No page is active
    /// afterwards, so no later teardown would do it.
    fn undo_setup(&self, route: &Route) {
        if !route.styles.is_empty() {
            self.layer.detach_styles(&route.styles);
        }
        if route.layout.is_some() {
            self.set_sidebar(false);
        }
    }

    async fn teardown(&self, outgoing: ActivePage) {
        self.state.lock().previous = Some(outgoing.path.clone());

        let Some(route) = self.routes.resolve(&outgoing.path) else {
            warn!(path = %outgoing.path, "no route to tear down");
            return;
        };
        if !route.styles.is_empty() {
            self.layer.detach_styles(&route.styles);
        }
        if let Some(mut page) = outgoing.page {
            page.deactivate().await;
        }
        debug!(path = %outgoing.path, "route torn down");
    }

    async fn setup(self: &Arc<Self>, route: &Route, entry: &str, authenticated: bool) -> Result<()> {
        if !route.styles.is_empty() {
            self.layer.attach_styles(&route.styles);
        }
        if let Some(title) = &route.title {
            self.layer
                .set_title(&format!("{title} | {}", self.settings.title_suffix));
        }

        if let Some(template) = &route.template {
            let mount = match &route.layout {
                Some(layout) => {
                    let html = self.layer.fetch_fragment(layout).await?;
                    self.layer.splice(Mount::Content, &html)?;
                    self.set_sidebar(true);
                    Mount::LayoutSlot
                }
                None => {
                    self.set_sidebar(false);
                    Mount::Content
                }
            };
            let html = self.layer.fetch_fragment(template).await?;
            self.layer.splice(mount, &html)?;

            if authenticated && route.path != LOGIN_PATH && route.path != LOGOUT_PATH {
                self.refresh_user_panel().await;
            }
            self.update_menu(&route.path);
        }

        let context = PageContext {
            client: self.client.clone(),
            layer: self.layer.clone(),
            tab_store: self.tab_store.clone(),
            entry: entry.to_owned(),
        };
        let mut page = route.build_page(&context);
        if let Some(page) = page.as_mut() {
            page.activate(self.navigator()).await;
        }

        self.state.lock().active = Some(ActivePage {
            path: route.path.clone(),
            page,
        });
        metrics::counter!("router_activations_total", "route" => route.path.clone()).increment(1);
        info!(route = %route.path, "route activated");
        Ok(())
    }

    fn set_sidebar(&self, enabled: bool) {
        for class in SIDEBAR_CLASSES {
            self.layer.set_class("body", class, enabled);
        }
    }

    /// User name and balance. A balance redirect is queued behind the
    /// current activation as an `Open`, so it pushes a history entry and
    /// Back from the login page returns to the protected page, whose
    /// auth gate sends it to login again.
    async fn refresh_user_panel(&self) {
        if let Some(name) = self.client.credentials().user_display_name() {
            self.layer.set_user_name(&name);
        }

        let outcome = fetch_balance(&self.client).await;
        if let Some(redirect) = outcome.redirect {
            warn!(redirect = %redirect, "balance request needs a redirect");
            self.state.lock().queue.push_back(Navigation::Open(redirect));
            return;
        }

        let display = match outcome.response.and_then(|b| b.balance) {
            Some(balance) if !outcome.error => BalanceDisplay::Amount(balance),
            _ => {
                warn!(status = ?outcome.status, "balance unavailable");
                BalanceDisplay::Unavailable
            }
        };
        self.layer.set_balance(display);
    }

    /// Highlight the menu entry for `path`; remember it when one matched.
    fn update_menu(&self, path: &str) {
        if !self.layer.highlight_menu(menu_path(path)) {
            return;
        }
        if let Err(e) = self.tab_store.set(ACTIVE_MENU_KEY, path) {
            warn!(error = %e, "failed to save active menu item");
        }
    }
}
