//! Line-oriented command surface over the router
//!
//! Each console line stands in for something a user does in the browser tab:
//! typing a URL, clicking a link, pressing back, submitting a form.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use finance_auth::{DateInterval, FilterPreferences, KeyValueStore, PeriodFilter, SignUpRequest};
use finance_router::{History, LinkAction, MemoryHistory, Navigation, Router, route_path};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::{debug, warn};

use crate::console::ConsoleLayer;
use crate::error::CommandError;
use crate::metrics::record_command;
use crate::pages::{submit_login, submit_sign_up};

/// Routes whose content depends on the period filter.
const FILTERED_ROUTES: [&str; 2] = ["/", "/income-and-expense"];

const HELP: &str = "\
commands:
  open <path>                 go to an in-app path
  click [href]                click a link (no href: an anchor without one)
  back | forward              move through history
  reload                      reload the current page
  login <email> <password> [--remember]
  signup <name> <last-name> <email> <password> <password-repeat>
  filter <today|week|month|year|all|interval> [from to]
  whoami                      show the signed-in user
  where                       show the current route
  metrics                     print Prometheus metrics
  help | quit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open(String),
    Click(Option<String>),
    Back,
    Forward,
    Reload,
    Login {
        email: String,
        password: String,
        remember_me: bool,
    },
    SignUp {
        name: String,
        last_name: String,
        email: String,
        password: String,
        password_repeat: String,
    },
    Filter {
        period: PeriodFilter,
        interval: DateInterval,
    },
    WhoAmI,
    Where,
    Metrics,
    Help,
    Quit,
}

impl Command {
    /// Label for the command metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Open(_) => "open",
            Command::Click(_) => "click",
            Command::Back => "back",
            Command::Forward => "forward",
            Command::Reload => "reload",
            Command::Login { .. } => "login",
            Command::SignUp { .. } => "signup",
            Command::Filter { .. } => "filter",
            Command::WhoAmI => "whoami",
            Command::Where => "where",
            Command::Metrics => "metrics",
            Command::Help => "help",
            Command::Quit => "quit",
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, args)) = words.split_first() else {
            return Err(CommandError::Unknown(String::new()));
        };

        let command = match (verb, args) {
            ("open", [path]) => Command::Open((*path).to_owned()),
            ("open", _) => return Err(CommandError::Usage("open <path>")),
            ("click", []) => Command::Click(None),
            ("click", [href]) => Command::Click(Some((*href).to_owned())),
            ("click", _) => return Err(CommandError::Usage("click [href]")),
            ("back", []) => Command::Back,
            ("forward", []) => Command::Forward,
            ("reload", []) => Command::Reload,
            ("login", [email, password, rest @ ..]) if rest.is_empty() || rest == ["--remember"] => {
                Command::Login {
                    email: (*email).to_owned(),
                    password: (*password).to_owned(),
                    remember_me: !rest.is_empty(),
                }
            }
            ("login", _) => return Err(CommandError::Usage("login <email> <password> [--remember]")),
            ("signup", [name, last_name, email, password, password_repeat]) => Command::SignUp {
                name: (*name).to_owned(),
                last_name: (*last_name).to_owned(),
                email: (*email).to_owned(),
                password: (*password).to_owned(),
                password_repeat: (*password_repeat).to_owned(),
            },
            ("signup", _) => {
                return Err(CommandError::Usage(
                    "signup <name> <last-name> <email> <password> <password-repeat>",
                ));
            }
            ("filter", [period, dates @ ..]) => {
                let period: PeriodFilter = period
                    .parse()
                    .map_err(|_| CommandError::Usage("filter <today|week|month|year|all|interval> [from to]"))?;
                let interval = match (period, dates) {
                    (PeriodFilter::Interval, [from, to]) => DateInterval::new(*from, *to),
                    (PeriodFilter::Interval, _) => {
                        return Err(CommandError::Usage("filter interval <from> <to>"));
                    }
                    (_, []) => DateInterval::default(),
                    _ => return Err(CommandError::Usage("dates are only accepted for `interval`")),
                };
                Command::Filter { period, interval }
            }
            ("filter", []) => {
                return Err(CommandError::Usage("filter <today|week|month|year|all|interval> [from to]"));
            }
            ("whoami", []) => Command::WhoAmI,
            ("where", []) => Command::Where,
            ("metrics", []) => Command::Metrics,
            ("help", _) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            (other, _) => return Err(CommandError::Unknown(other.to_owned())),
        };
        Ok(command)
    }
}

/// Whether the read loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The browser tab, as seen from the console.
pub struct Shell {
    router: Router,
    history: Arc<MemoryHistory>,
    console: Arc<ConsoleLayer>,
    preferences: FilterPreferences,
    prometheus: Option<PrometheusHandle>,
}

impl Shell {
    pub fn new(
        router: Router,
        history: Arc<MemoryHistory>,
        console: Arc<ConsoleLayer>,
        tab_store: Arc<dyn KeyValueStore>,
        prometheus: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            router,
            history,
            console,
            preferences: FilterPreferences::new(tab_store),
            prometheus,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Forget tab-scoped state, as closing the tab would.
    pub fn close(&self) {
        if let Err(e) = self.preferences.clear() {
            warn!(error = %e, "failed to clear filter preferences");
        }
    }

    pub async fn execute(&self, command: Command) -> Flow {
        let name = command.name();
        let started = Instant::now();
        let flow = self.dispatch(command).await;
        record_command(name, started.elapsed().as_secs_f64());
        flow
    }

    async fn dispatch(&self, command: Command) -> Flow {
        match command {
            Command::Open(path) => self.router.open_new_route(path).await,
            Command::Click(href) => match self.router.handle_click(href.as_deref()).await {
                LinkAction::NotIntercepted => {
                    self.console.print(format!(
                        "{} opens outside the app",
                        href.as_deref().unwrap_or("link")
                    ));
                }
                LinkAction::Suppressed => debug!("link does nothing"),
                LinkAction::Navigate(_) => {}
            },
            Command::Back => {
                if self.history.back() {
                    self.router.pop_state().await;
                } else {
                    self.console.print("already at the oldest entry");
                }
            }
            Command::Forward => {
                if self.history.forward() {
                    self.router.pop_state().await;
                } else {
                    self.console.print("already at the newest entry");
                }
            }
            Command::Reload => self.router.start().await,
            Command::Login {
                email,
                password,
                remember_me,
            } => {
                let current = self.history.current_path();
                if let Err(e) =
                    submit_login(&self.router, &current, &email, &password, remember_me).await
                {
                    self.console.print(format!("login failed: {e}"));
                }
            }
            Command::SignUp {
                name,
                last_name,
                email,
                password,
                password_repeat,
            } => {
                let current = self.history.current_path();
                let request = SignUpRequest {
                    name,
                    last_name,
                    email,
                    password,
                    password_repeat,
                };
                if let Err(e) = submit_sign_up(&self.router, &current, request).await {
                    self.console.print(format!("sign-up failed: {e}"));
                }
            }
            Command::Filter { period, interval } => {
                if let Err(e) = self.preferences.save(period, &interval) {
                    self.console.print(format!("could not save filter: {e}"));
                    return Flow::Continue;
                }
                self.console.print(format!("filter: {period}"));
                let current = self.history.current_path();
                if FILTERED_ROUTES.contains(&route_path(&current)) {
                    self.router.navigate(Navigation::Start).await;
                }
            }
            Command::WhoAmI => {
                let name = self.router.client().credentials().user_display_name();
                self.console
                    .print(name.unwrap_or_else(|| "not logged in".to_owned()));
            }
            Command::Where => {
                let document = self.console.document();
                self.console.print(format!(
                    "{} ({})",
                    self.history.current_path(),
                    document.title
                ));
            }
            Command::Metrics => match &self.prometheus {
                Some(handle) => self.console.print(handle.render()),
                None => self.console.print("metrics recorder not installed"),
            },
            Command::Help => self.console.print(HELP),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }
}
