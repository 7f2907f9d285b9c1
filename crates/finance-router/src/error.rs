use thiserror::Error;

use crate::layer::Mount;

/// Route table and navigation errors.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("route {0} is declared more than once")]
    DuplicateRoute(String),

    #[error("route path must start with '/': {0}")]
    InvalidPath(String),

    #[error("no route for {0} and no 404 page to fall back to")]
    Unroutable(String),

    #[error("redirect limit reached while activating {0}")]
    RedirectLimit(String),

    #[error(transparent)]
    Page(#[from] PageError),
}

/// Failures from the page layer while materializing a view.
#[derive(Debug, Clone, Error)]
pub enum PageError {
    #[error("mount point {0} is missing")]
    MissingMount(Mount),

    #[error("failed to fetch {reference}: {reason}")]
    Fetch { reference: String, reason: String },
}

pub type Result<T> = std::result::Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_errors_convert_into_router_errors() {
        let err: RouterError = PageError::MissingMount(Mount::LayoutSlot).into();
        assert!(matches!(err, RouterError::Page(PageError::MissingMount(Mount::LayoutSlot))));
        assert_eq!(err.to_string(), "mount point content-layout is missing");
    }

    #[test]
    fn fetch_error_names_the_reference() {
        let err = PageError::Fetch {
            reference: "templates/layout.html".into(),
            reason: "not found".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to fetch templates/layout.html: not found"
        );
    }
}
