//! Application routes and page controllers

use std::sync::{Arc, LazyLock};

use finance_auth::{FilterPreferences, SignUpRequest};
use finance_router::{
    LOGIN_PATH, Navigator, PageContext, PageController, Route, RouteTable, Router, RouterError,
    SIGN_UP_PATH, route_path,
};
use finance_session::{
    Category, CategoryKind, Operation, OperationKind, RequestOutcome, category_path,
    normalize_category_title, operations_path, totals_by_category,
};
use futures_util::future::BoxFuture;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::console::ConsoleLayer;
use crate::error::FormError;

const LAYOUT: &str = "templates/layout.html";

/// Element id of the categories group in the sidebar menu.
const CATEGORY_MENU: &str = "income-expense-category";

/// The route table of the finance app.
pub fn route_table(console: &Arc<ConsoleLayer>) -> Result<RouteTable, RouterError> {
    let overview = {
        let console = console.clone();
        move |ctx: &PageContext| -> Box<dyn PageController> {
            Box::new(OverviewPage::new(ctx, &console))
        }
    };
    let operations = {
        let console = console.clone();
        move |ctx: &PageContext| -> Box<dyn PageController> {
            Box::new(OperationsPage::new(ctx, &console))
        }
    };
    let operation_form = |editing: bool| {
        let console = console.clone();
        move |ctx: &PageContext| -> Box<dyn PageController> {
            Box::new(OperationFormPage::new(ctx, &console, editing))
        }
    };
    let category_list = |kind: CategoryKind| {
        let console = console.clone();
        move |ctx: &PageContext| -> Box<dyn PageController> {
            Box::new(CategoryListPage::new(ctx, &console, kind))
        }
    };
    let category_form = |kind: CategoryKind, editing: bool| {
        let console = console.clone();
        move |ctx: &PageContext| -> Box<dyn PageController> {
            Box::new(CategoryFormPage::new(ctx, &console, kind, editing))
        }
    };

    RouteTable::builder()
        .route(
            Route::new("/")
                .title("Overview")
                .template("templates/pages/main.html")
                .layout(LAYOUT)
                .style("charts.css")
                .requires_auth()
                .page(overview),
        )
        .route(
            Route::new("/404")
                .title("Page not found")
                .template("templates/pages/404.html"),
        )
        .route(
            Route::new(LOGIN_PATH)
                .title("Log in")
                .template("templates/auth/login.html")
                .page(|ctx| Box::new(AuthFormPage::new(ctx, "login-page"))),
        )
        .route(
            Route::new(SIGN_UP_PATH)
                .title("Sign up")
                .template("templates/auth/sign-up.html")
                .page(|ctx| Box::new(AuthFormPage::new(ctx, "register-page"))),
        )
        .route(
            Route::new("/logout")
                .requires_auth()
                .page(|ctx| Box::new(LogoutPage { ctx: ctx.clone() })),
        )
        .route(
            Route::new("/income-and-expense")
                .title("Income & expenses")
                .template("templates/pages/operations/income-and-expense.html")
                .layout(LAYOUT)
                .requires_auth()
                .page(operations),
        )
        .route(
            Route::new("/income-and-expense-creation")
                .title("New operation")
                .template("templates/pages/operations/income-and-expense-creation.html")
                .layout(LAYOUT)
                .requires_auth()
                .page(operation_form(false)),
        )
        .route(
            Route::new("/income-and-expense-edit")
                .title("Edit operation")
                .template("templates/pages/operations/income-and-expense-edit.html")
                .layout(LAYOUT)
                .requires_auth()
                .page(operation_form(true)),
        )
        .route(
            Route::new("/income-category")
                .title("Income categories")
                .template("templates/pages/category-income/income-category.html")
                .layout(LAYOUT)
                .requires_auth()
                .page(category_list(CategoryKind::Income)),
        )
        .route(
            Route::new("/income-category-creation")
                .title("New income category")
                .template("templates/pages/category-income/income-category-creation.html")
                .layout(LAYOUT)
                .requires_auth()
                .page(category_form(CategoryKind::Income, false)),
        )
        .route(
            Route::new("/income-category-edit")
                .title("Edit income category")
                .template("templates/pages/category-income/income-category-edit.html")
                .layout(LAYOUT)
                .requires_auth()
                .page(category_form(CategoryKind::Income, true)),
        )
        .route(
            Route::new("/expense-category")
                .title("Expense categories")
                .template("templates/pages/category-expense/expense-category.html")
                .layout(LAYOUT)
                .requires_auth()
                .page(category_list(CategoryKind::Expense)),
        )
        .route(
            Route::new("/expense-category-creation")
                .title("New expense category")
                .template("templates/pages/category-expense/expense-category-creation.html")
                .layout(LAYOUT)
                .requires_auth()
                .page(category_form(CategoryKind::Expense, false)),
        )
        .route(
            Route::new("/expense-category-edit")
                .title("Edit expense category")
                .template("templates/pages/category-expense/expense-category-edit.html")
                .layout(LAYOUT)
                .requires_auth()
                .page(category_form(CategoryKind::Expense, true)),
        )
        .build()
}

/// GET `path` for a page. `None` when the request failed (reported) or
/// redirected (navigation requested).
async fn load<T: DeserializeOwned + Send>(
    ctx: &PageContext,
    console: &ConsoleLayer,
    navigator: &Navigator,
    path: String,
) -> Option<T> {
    let outcome: RequestOutcome<T> = ctx.client.get(path).await;
    if let Some(redirect) = outcome.redirect {
        navigator.navigate(redirect).await;
        return None;
    }
    if outcome.error {
        console.print("  could not load data, try again later");
        return None;
    }
    outcome.response
}

/// Login and sign-up forms: toggle the full-height body style.
struct AuthFormPage {
    ctx: PageContext,
    body_class: &'static str,
}

impl AuthFormPage {
    fn new(ctx: &PageContext, body_class: &'static str) -> Self {
        Self {
            ctx: ctx.clone(),
            body_class,
        }
    }
}

impl PageController for AuthFormPage {
    fn activate<'a>(&'a mut self, _navigator: Navigator) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.ctx.layer.set_class("body", self.body_class, true);
        })
    }

    fn deactivate<'a>(&'a mut self) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.ctx.layer.set_class("body", self.body_class, false);
        })
    }
}

struct LogoutPage {
    ctx: PageContext,
}

impl PageController for LogoutPage {
    fn activate<'a>(&'a mut self, navigator: Navigator) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            finance_session::logout(&self.ctx.client).await;
            navigator.navigate(LOGIN_PATH).await;
        })
    }
}

/// Income and expense totals by category for the saved period.
struct OverviewPage {
    ctx: PageContext,
    console: Arc<ConsoleLayer>,
}

impl OverviewPage {
    fn new(ctx: &PageContext, console: &Arc<ConsoleLayer>) -> Self {
        Self {
            ctx: ctx.clone(),
            console: console.clone(),
        }
    }
}

impl PageController for OverviewPage {
    fn activate<'a>(&'a mut self, navigator: Navigator) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let selection = FilterPreferences::new(self.ctx.tab_store.clone()).load();
            let path = operations_path(Some(selection.filter), &selection.interval);
            let Some(operations) =
                load::<Vec<Operation>>(&self.ctx, &self.console, &navigator, path).await
            else {
                return;
            };

            let totals = totals_by_category(&operations);
            self.console.print(format!("  period: {}", selection.filter));
            for (label, sums) in [("income", &totals.income), ("expense", &totals.expense)] {
                if sums.is_empty() {
                    self.console.print(format!("  {label}: no data"));
                }
                for (title, sum) in sums {
                    self.console.print(format!("  {label:<8} {title}: {sum}"));
                }
            }
        })
    }
}

/// Operation list for the saved period.
struct OperationsPage {
    ctx: PageContext,
    console: Arc<ConsoleLayer>,
}

impl OperationsPage {
    fn new(ctx: &PageContext, console: &Arc<ConsoleLayer>) -> Self {
        Self {
            ctx: ctx.clone(),
            console: console.clone(),
        }
    }
}

impl PageController for OperationsPage {
    fn activate<'a>(&'a mut self, navigator: Navigator) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let selection = FilterPreferences::new(self.ctx.tab_store.clone()).load();
            let path = operations_path(Some(selection.filter), &selection.interval);
            let Some(operations) =
                load::<Vec<Operation>>(&self.ctx, &self.console, &navigator, path).await
            else {
                return;
            };

            if operations.is_empty() {
                self.console.print("  no operations for this period");
            }
            for (n, op) in operations.iter().enumerate() {
                let kind = match op.kind {
                    OperationKind::Income => "income",
                    OperationKind::Expense => "expense",
                    OperationKind::Unknown => "?",
                };
                self.console.print(format!(
                    "  {:>3}. {:<7} {:>10.2}  {:<20} {} {}",
                    n + 1,
                    kind,
                    op.amount.value(),
                    normalize_category_title(op).unwrap_or("-"),
                    op.date.as_deref().unwrap_or(""),
                    op.comment.as_deref().unwrap_or(""),
                ));
            }
        })
    }
}

/// Create or edit an operation.
struct OperationFormPage {
    ctx: PageContext,
    console: Arc<ConsoleLayer>,
    editing: bool,
}

impl OperationFormPage {
    fn new(ctx: &PageContext, console: &Arc<ConsoleLayer>, editing: bool) -> Self {
        Self {
            ctx: ctx.clone(),
            console: console.clone(),
            editing,
        }
    }
}

impl PageController for OperationFormPage {
    fn activate<'a>(&'a mut self, navigator: Navigator) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if !self.editing {
                let kind = self.ctx.query("type").unwrap_or_else(|| "income".to_owned());
                self.console.print(format!("  new {kind} operation"));
                return;
            }

            let Some(id) = self.ctx.query("id") else {
                warn!("operation edit page opened without an id");
                navigator.navigate("/income-and-expense").await;
                return;
            };
            let path = format!("{}/{id}", finance_auth::OPERATIONS_ENDPOINT);
            if let Some(op) = load::<Operation>(&self.ctx, &self.console, &navigator, path).await {
                self.console.print(format!(
                    "  editing operation {id}: {} in {}",
                    op.amount.value(),
                    normalize_category_title(&op).unwrap_or("-"),
                ));
            }
        })
    }
}

/// Income or expense category list. Opens the categories menu group.
struct CategoryListPage {
    ctx: PageContext,
    console: Arc<ConsoleLayer>,
    kind: CategoryKind,
}

impl CategoryListPage {
    fn new(ctx: &PageContext, console: &Arc<ConsoleLayer>, kind: CategoryKind) -> Self {
        Self {
            ctx: ctx.clone(),
            console: console.clone(),
            kind,
        }
    }
}

impl PageController for CategoryListPage {
    fn activate<'a>(&'a mut self, navigator: Navigator) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.ctx.layer.set_class(CATEGORY_MENU, "menu-open", true);
            let path = category_path(self.kind, None);
            let Some(categories) =
                load::<Vec<Category>>(&self.ctx, &self.console, &navigator, path).await
            else {
                return;
            };
            if categories.is_empty() {
                self.console.print(format!("  no {} categories yet", self.kind));
            }
            for category in &categories {
                self.console.print(format!(
                    "  [{}] {}",
                    category.id,
                    category.display_title().unwrap_or("-")
                ));
            }
        })
    }

    fn deactivate<'a>(&'a mut self) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.ctx.layer.set_class(CATEGORY_MENU, "menu-open", false);
        })
    }
}

/// Create or edit a category. Keeps the categories menu group open.
struct CategoryFormPage {
    ctx: PageContext,
    console: Arc<ConsoleLayer>,
    kind: CategoryKind,
    editing: bool,
}

impl CategoryFormPage {
    fn new(ctx: &PageContext, console: &Arc<ConsoleLayer>, kind: CategoryKind, editing: bool) -> Self {
        Self {
            ctx: ctx.clone(),
            console: console.clone(),
            kind,
            editing,
        }
    }

    fn list_path(&self) -> &'static str {
        match self.kind {
            CategoryKind::Income => "/income-category",
            CategoryKind::Expense => "/expense-category",
        }
    }
}

impl PageController for CategoryFormPage {
    fn activate<'a>(&'a mut self, navigator: Navigator) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.ctx.layer.set_class(CATEGORY_MENU, "menu-open", true);
            if !self.editing {
                self.console.print(format!("  new {} category", self.kind));
                return;
            }

            let Some(id) = self.ctx.query("id") else {
                warn!(kind = %self.kind, "category edit page opened without an id");
                navigator.navigate(self.list_path()).await;
                return;
            };
            let path = category_path(self.kind, Some(&id));
            if let Some(category) = load::<Category>(&self.ctx, &self.console, &navigator, path).await {
                self.console.print(format!(
                    "  editing {} category: {}",
                    self.kind,
                    category.display_title().unwrap_or("-")
                ));
            }
        })
    }

    fn deactivate<'a>(&'a mut self) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.ctx.layer.set_class(CATEGORY_MENU, "menu-open", false);
        })
    }
}

/// Submit the login form on `/login`.
pub async fn submit_login(
    router: &Router,
    current: &str,
    email: &str,
    password: &str,
    remember_me: bool,
) -> Result<(), FormError> {
    if route_path(current) != LOGIN_PATH {
        return Err(FormError::WrongPage(LOGIN_PATH));
    }

    let mut invalid = Vec::new();
    if !is_valid_email(email) {
        invalid.push("email");
    }
    if password.is_empty() {
        invalid.push("password");
    }
    if !invalid.is_empty() {
        return Err(FormError::Invalid(invalid));
    }

    let profile = finance_session::login(router.client(), email, password, remember_me).await?;
    info!(user_id = %profile.id, "login form submitted");
    router.open_new_route("/").await;
    Ok(())
}

/// Submit the sign-up form on `/sign-up`.
pub async fn submit_sign_up(
    router: &Router,
    current: &str,
    request: SignUpRequest,
) -> Result<(), FormError> {
    if route_path(current) != SIGN_UP_PATH {
        return Err(FormError::WrongPage(SIGN_UP_PATH));
    }

    let invalid = validate_sign_up(&request);
    if !invalid.is_empty() {
        return Err(FormError::Invalid(invalid));
    }

    finance_session::sign_up(router.client(), &request).await?;
    router.open_new_route("/").await;
    Ok(())
}

fn validate_sign_up(request: &SignUpRequest) -> Vec<&'static str> {
    let mut invalid = Vec::new();
    if request.name.trim().is_empty() {
        invalid.push("name");
    }
    if request.last_name.trim().is_empty() {
        invalid.push("lastName");
    }
    if !is_valid_email(&request.email) {
        invalid.push("email");
    }
    if !is_strong_password(&request.password) {
        invalid.push("password");
    }
    if request.password_repeat.is_empty() || request.password_repeat != request.password {
        invalid.push("passwordRepeat");
    }
    invalid
}

/// Same pattern the web forms validate against.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// At least eight ASCII letters or digits, with a digit, a lowercase and an
/// uppercase letter.
fn is_strong_password(password: &str) -> bool {
    password.len() >= 8
        && password.chars().all(|c| c.is_ascii_alphanumeric())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
}
