//! Route table
//!
//! Built once through `RouteTable::builder()` and never mutated afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, RouterError};
use crate::page::{PageContext, PageController, PageFactory};

/// One entry of the route table.
#[derive(Clone)]
pub struct Route {
    pub path: String,
    pub title: Option<String>,
    /// Template fragment spliced into the content region.
    pub template: Option<String>,
    /// Shared layout fetched first; the template then goes into its slot.
    pub layout: Option<String>,
    pub requires_auth: bool,
    pub styles: Vec<String>,
    page: Option<PageFactory>,
}

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: None,
            template: None,
            layout: None,
            requires_auth: false,
            styles: Vec::new(),
            page: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn template(mut self, reference: impl Into<String>) -> Self {
        self.template = Some(reference.into());
        self
    }

    pub fn layout(mut self, reference: impl Into<String>) -> Self {
        self.layout = Some(reference.into());
        self
    }

    pub fn requires_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    pub fn style(mut self, asset: impl Into<String>) -> Self {
        self.styles.push(asset.into());
        self
    }

    pub fn page<F>(mut self, factory: F) -> Self
    where
        F: Fn(&PageContext) -> Box<dyn PageController> + Send + Sync + 'static,
    {
        self.page = Some(Arc::new(factory));
        self
    }

    pub fn has_page(&self) -> bool {
        self.page.is_some()
    }

    pub(crate) fn build_page(&self, context: &PageContext) -> Option<Box<dyn PageController>> {
        self.page.as_ref().map(|factory| factory(context))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("title", &self.title)
            .field("template", &self.template)
            .field("layout", &self.layout)
            .field("requires_auth", &self.requires_auth)
            .field("styles", &self.styles)
            .field("page", &self.page.is_some())
            .finish()
    }
}

/// Immutable path → route lookup.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, Route>,
    order: Vec<String>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Exact match on the path component.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.get(path)
    }

    /// Paths in declaration order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Default)]
pub struct RouteTableBuilder {
    routes: Vec<Route>,
}

impl RouteTableBuilder {
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Validate and freeze the table. Paths must be absolute and unique.
    pub fn build(self) -> Result<RouteTable> {
        let mut table = RouteTable::default();
        for route in self.routes {
            if !route.path.starts_with('/') {
                return Err(RouterError::InvalidPath(route.path));
            }
            if table.routes.contains_key(&route.path) {
                return Err(RouterError::DuplicateRoute(route.path));
            }
            table.order.push(route.path.clone());
            table.routes.insert(route.path.clone(), route);
        }
        Ok(table)
    }
}
