//! Recording page layer and canned API transport for router tests

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use finance_session::{RawResponse, Transport, TransportError, WireRequest};
use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use crate::error::PageError;
use crate::layer::{BalanceDisplay, Mount, PageLayer};

/// Page layer that records every call as a line of text.
#[derive(Default)]
pub struct RecordingLayer {
    events: Mutex<Vec<String>>,
    fragments: HashMap<String, String>,
    menu: HashSet<String>,
    slot_present: Mutex<bool>,
    pub title: Mutex<Option<String>>,
    pub balance: Mutex<Option<BalanceDisplay>>,
    pub body_classes: Mutex<HashSet<String>>,
}

impl RecordingLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fragment(mut self, reference: &str, html: &str) -> Self {
        self.fragments.insert(reference.to_owned(), html.to_owned());
        self
    }

    pub fn menu_entry(mut self, path: &str) -> Self {
        self.menu.insert(path.to_owned());
        self
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn take_events(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl PageLayer for RecordingLayer {
    fn attach_styles(&self, styles: &[String]) {
        self.record(format!("attach {}", styles.join(",")));
    }

    fn detach_styles(&self, styles: &[String]) {
        self.record(format!("detach {}", styles.join(",")));
    }

    fn set_title(&self, title: &str) {
        *self.title.lock() = Some(title.to_owned());
    }

    fn set_class(&self, target: &str, class: &str, enabled: bool) {
        if target == "body" {
            let mut classes = self.body_classes.lock();
            if enabled {
                classes.insert(class.to_owned());
            } else {
                classes.remove(class);
            }
        }
    }

    fn fetch_fragment<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, Result<String, PageError>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.fragments
                .get(reference)
                .cloned()
                .ok_or_else(|| PageError::Fetch {
                    reference: reference.to_owned(),
                    reason: "404".into(),
                })
        })
    }

    fn splice(&self, mount: Mount, html: &str) -> Result<(), PageError> {
        let mut slot = self.slot_present.lock();
        match mount {
            Mount::Content => *slot = html.contains(Mount::LayoutSlot.id()),
            Mount::LayoutSlot if !*slot => return Err(PageError::MissingMount(mount)),
            Mount::LayoutSlot => {}
        }
        drop(slot);
        self.record(format!("splice {mount}"));
        Ok(())
    }

    fn set_user_name(&self, name: &str) {
        self.record(format!("user {name}"));
    }

    fn set_balance(&self, balance: BalanceDisplay) {
        *self.balance.lock() = Some(balance);
    }

    fn highlight_menu(&self, path: &str) -> bool {
        let found = self.menu.contains(path);
        if found {
            self.record(format!("menu {path}"));
        }
        found
    }
}

/// Transport answering every path with one fixed reply, `/refresh` aside.
pub struct CannedTransport {
    status: u16,
    body: &'static str,
    refresh_status: u16,
    calls: Mutex<Vec<String>>,
}

impl CannedTransport {
    pub fn new(status: u16, body: &'static str) -> Self {
        Self {
            status,
            body,
            refresh_status: 401,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl Transport for CannedTransport {
    fn send<'a>(
        &'a self,
        request: &'a WireRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().push(request.path.clone());
            tokio::task::yield_now().await;
            let (status, body) = if request.path == finance_auth::REFRESH_ENDPOINT {
                (self.refresh_status, r#"{"error":true}"#)
            } else {
                (self.status, self.body)
            };
            Ok(RawResponse {
                status,
                body: body.as_bytes().to_vec(),
            })
        })
    }
}
