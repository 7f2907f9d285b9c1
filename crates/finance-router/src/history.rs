//! Session history
//!
//! Entries are paths with their query string (`/income-category-edit?id=3`).

use parking_lot::Mutex;

/// The browser history surface the router needs.
pub trait History: Send + Sync {
    /// Path and query of the current entry.
    fn current_path(&self) -> String;

    /// Add an entry after the current one, dropping any forward entries.
    fn push(&self, path: &str);

    /// Overwrite the current entry.
    fn replace(&self, path: &str);
}

/// In-memory history stack with a cursor, as a browser tab keeps it.
pub struct MemoryHistory {
    inner: Mutex<Stack>,
}

struct Stack {
    entries: Vec<String>,
    cursor: usize,
}

impl MemoryHistory {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Stack {
                entries: vec![initial.into()],
                cursor: 0,
            }),
        }
    }

    /// Step back one entry. Returns `false` at the start of history.
    pub fn back(&self) -> bool {
        let mut stack = self.inner.lock();
        if stack.cursor == 0 {
            return false;
        }
        stack.cursor -= 1;
        true
    }

    /// Step forward one entry. Returns `false` at the end of history.
    pub fn forward(&self) -> bool {
        let mut stack = self.inner.lock();
        if stack.cursor + 1 >= stack.entries.len() {
            return false;
        }
        stack.cursor += 1;
        true
    }

    pub fn entries(&self) -> Vec<String> {
        self.inner.lock().entries.clone()
    }
}

impl History for MemoryHistory {
    fn current_path(&self) -> String {
        let stack = self.inner.lock();
        stack.entries[stack.cursor].clone()
    }

    fn push(&self, path: &str) {
        let mut stack = self.inner.lock();
        let keep = stack.cursor + 1;
        stack.entries.truncate(keep);
        stack.entries.push(path.to_owned());
        stack.cursor = keep;
    }

    fn replace(&self, path: &str) {
        let mut stack = self.inner.lock();
        let cursor = stack.cursor;
        stack.entries[cursor] = path.to_owned();
    }
}

/// The path component of a history entry: query and fragment removed.
pub fn route_path(entry: &str) -> &str {
    let end = entry.find(['?', '#']).unwrap_or(entry.len());
    &entry[..end]
}

/// Value of one query parameter in a history entry.
pub fn query_param(entry: &str, name: &str) -> Option<String> {
    let query = entry.split_once('?')?.1;
    let query = query.split('#').next().unwrap_or(query);
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
