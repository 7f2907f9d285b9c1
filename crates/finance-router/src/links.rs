//! Anchor-click interception and menu canonicalization

use url::Url;

/// What to do with a clicked anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Not ours: let the default navigation happen.
    NotIntercepted,
    /// A same-page no-op link (`#`, `javascript:void(0)`): swallow the click.
    Suppressed,
    /// Same-origin link: prevent the default and open this path in-app.
    Navigate(String),
}

/// Decide how to handle a click on an anchor with `href`, resolved against
/// the page at `base` (origin plus the current entry).
pub fn intercept_link(base: &Url, href: Option<&str>) -> LinkAction {
    let Some(href) = href.map(str::trim).filter(|h| !h.is_empty()) else {
        return LinkAction::NotIntercepted;
    };

    if href == "#" || href.starts_with("javascript:void(0)") {
        return LinkAction::Suppressed;
    }

    let Ok(target) = base.join(href) else {
        return LinkAction::NotIntercepted;
    };
    if target.origin() != base.origin() {
        return LinkAction::NotIntercepted;
    }

    // "/#" after stripping the origin is the root-anchor no-op link.
    if target.path() == "/" && target.query().is_none() && target.fragment() == Some("") {
        return LinkAction::Suppressed;
    }

    let mut path = target.path().to_owned();
    if let Some(query) = target.query() {
        path.push('?');
        path.push_str(query);
    }
    LinkAction::Navigate(path)
}

/// Menu entries whose sub-pages (`{parent}-creation`, `{parent}-edit`)
/// highlight the parent.
pub const MENU_PARENTS: [&str; 3] = ["/income-category", "/expense-category", "/income-and-expense"];

/// The menu entry that should be highlighted for `path`.
pub fn menu_path(path: &str) -> &str {
    for parent in MENU_PARENTS {
        if let Some(rest) = path.strip_prefix(parent)
            && let Some(suffix) = rest.strip_prefix('-')
            && matches!(suffix, "creation" | "edit")
        {
            return parent;
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://localhost:8080/income-category").unwrap()
    }

    #[test]
    fn same_origin_links_navigate() {
        assert_eq!(
            intercept_link(&base(), Some("/income-and-expense")),
            LinkAction::Navigate("/income-and-expense".into())
        );
        assert_eq!(
            intercept_link(&base(), Some("http://localhost:8080/income-category-edit?id=4")),
            LinkAction::Navigate("/income-category-edit?id=4".into())
        );
        assert_eq!(
            intercept_link(&base(), Some("logout")),
            LinkAction::Navigate("/logout".into())
        );
    }

    #[test]
    fn no_op_links_are_suppressed() {
        assert_eq!(intercept_link(&base(), Some("#")), LinkAction::Suppressed);
        assert_eq!(intercept_link(&base(), Some("/#")), LinkAction::Suppressed);
        assert_eq!(
            intercept_link(&base(), Some("javascript:void(0);")),
            LinkAction::Suppressed
        );
    }

    #[test]
    fn foreign_or_missing_links_pass_through() {
        assert_eq!(
            intercept_link(&base(), Some("https://example.com/")),
            LinkAction::NotIntercepted
        );
        assert_eq!(
            intercept_link(&base(), Some("http://localhost:9090/")),
            LinkAction::NotIntercepted
        );
        assert_eq!(intercept_link(&base(), None), LinkAction::NotIntercepted);
        assert_eq!(intercept_link(&base(), Some("  ")), LinkAction::NotIntercepted);
    }

    #[test]
    fn sub_pages_highlight_their_parent() {
        assert_eq!(menu_path("/income-category-creation"), "/income-category");
        assert_eq!(menu_path("/expense-category-edit"), "/expense-category");
        assert_eq!(menu_path("/income-and-expense-edit"), "/income-and-expense");
        assert_eq!(menu_path("/income-and-expense"), "/income-and-expense");
        assert_eq!(menu_path("/income-category-archive"), "/income-category-archive");
        assert_eq!(menu_path("/"), "/");
    }
}
