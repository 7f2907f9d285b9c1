//! Console page layer
//!
//! Keeps a small model of the document (title, body classes, content
//! regions, user panel, menu) and prints what a user would see change.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use finance_router::{BalanceDisplay, Mount, PageError, PageLayer};
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tracing::debug;

/// Links in the sidebar menu of the shared layout.
pub const MENU_LINKS: [&str; 4] = ["/", "/income-and-expense", "/income-category", "/expense-category"];

/// Built-in layout, used when no templates directory is configured.
const BUILTIN_LAYOUT: &str = r#"<nav class="nav-sidebar"><span id="user-name"></span><span id="balance"></span><ul id="income-expense-category"></ul></nav><div id="content-layout"></div>"#;

/// The document as the console renders it.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub title: String,
    pub styles: Vec<String>,
    /// Classes by target (`"body"` or an element id).
    pub classes: BTreeMap<String, BTreeSet<String>>,
    pub content: String,
    /// Layout slot contents; `None` while no layout is mounted.
    pub slot: Option<String>,
    pub user_name: Option<String>,
    pub balance: Option<String>,
    pub active_menu: Option<String>,
}

impl Document {
    pub fn has_class(&self, target: &str, class: &str) -> bool {
        self.classes.get(target).is_some_and(|c| c.contains(class))
    }
}

pub struct ConsoleLayer {
    templates_dir: Option<PathBuf>,
    echo: bool,
    document: Mutex<Document>,
    transcript: Mutex<Vec<String>>,
}

impl ConsoleLayer {
    pub fn new(templates_dir: Option<PathBuf>) -> Self {
        Self {
            templates_dir,
            echo: true,
            document: Mutex::new(Document::default()),
            transcript: Mutex::new(Vec::new()),
        }
    }

    /// Keep output in the transcript only.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Show a line to the user.
    pub fn print(&self, line: impl Into<String>) {
        let line = line.into();
        if self.echo {
            println!("{line}");
        }
        self.transcript.lock().push(line);
    }

    pub fn document(&self) -> Document {
        self.document.lock().clone()
    }

    pub fn transcript(&self) -> Vec<String> {
        self.transcript.lock().clone()
    }

    async fn read_template(&self, reference: &str) -> Result<String, PageError> {
        let Some(dir) = &self.templates_dir else {
            return Ok(builtin_fragment(reference));
        };
        let path = dir.join(reference.trim_start_matches('/'));
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| PageError::Fetch {
                reference: reference.to_owned(),
                reason: e.to_string(),
            })
    }
}

fn builtin_fragment(reference: &str) -> String {
    if reference.ends_with("layout.html") {
        BUILTIN_LAYOUT.to_owned()
    } else {
        format!(r#"<section data-template="{reference}"></section>"#)
    }
}

impl PageLayer for ConsoleLayer {
    fn attach_styles(&self, styles: &[String]) {
        self.document.lock().styles.extend(styles.iter().cloned());
    }

    fn detach_styles(&self, styles: &[String]) {
        self.document.lock().styles.retain(|s| !styles.contains(s));
    }

    fn set_title(&self, title: &str) {
        self.document.lock().title = title.to_owned();
        self.print(format!("== {title} =="));
    }

    fn set_class(&self, target: &str, class: &str, enabled: bool) {
        let mut document = self.document.lock();
        let classes = document.classes.entry(target.to_owned()).or_default();
        if enabled {
            classes.insert(class.to_owned());
        } else {
            classes.remove(class);
        }
    }

    fn fetch_fragment<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, Result<String, PageError>> {
        Box::pin(async move {
            debug!(reference, "fetching fragment");
            self.read_template(reference).await
        })
    }

    fn splice(&self, mount: Mount, html: &str) -> Result<(), PageError> {
        let mut document = self.document.lock();
        match mount {
            Mount::Content => {
                document.content = html.to_owned();
                let has_slot = html.contains(&format!(r#"id="{}""#, Mount::LayoutSlot.id()));
                document.slot = has_slot.then(String::new);
                if !has_slot {
                    document.active_menu = None;
                    document.user_name = None;
                    document.balance = None;
                }
            }
            Mount::LayoutSlot => match document.slot.as_mut() {
                Some(slot) => *slot = html.to_owned(),
                None => return Err(PageError::MissingMount(mount)),
            },
        }
        Ok(())
    }

    fn set_user_name(&self, name: &str) {
        self.document.lock().user_name = Some(name.to_owned());
        self.print(format!("user: {name}"));
    }

    fn set_balance(&self, balance: BalanceDisplay) {
        let text = balance.to_string();
        self.document.lock().balance = Some(text.clone());
        self.print(format!("balance: {text}"));
    }

    fn highlight_menu(&self, path: &str) -> bool {
        let mut document = self.document.lock();
        if document.slot.is_none() || !MENU_LINKS.contains(&path) {
            return false;
        }
        document.active_menu = Some(path.to_owned());
        true
    }
}
