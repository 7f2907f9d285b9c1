//! Finance tracker console shell
//!
//! Single-binary client for the finance tracker API:
//! 1. Loads config and the persistent credential store
//! 2. Builds the session client and the router over a console page layer
//! 3. Activates the current entry, as a page load would
//! 4. Reads commands from stdin until `quit`, EOF or Ctrl+C

mod config;
mod console;
mod error;
mod metrics;
mod pages;
mod shell;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use finance_auth::{CredentialStore, FileStore, KeyValueStore, MemoryStore};
use finance_router::{HOME_PATH, MemoryHistory, Router, RouterSettings};
use finance_session::{ApiClient, HttpTransport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::console::ConsoleLayer;
use crate::shell::{Command, Flow, Shell};

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr keep stdout for the page output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    info!("starting finance-shell");

    let prometheus = match metrics::install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "metrics disabled");
            None
        }
    };

    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let origin = config.origin()?;

    info!(
        base_url = %config.api.base_url,
        storage = %config.storage.path.display(),
        origin = %origin,
        "configuration loaded"
    );

    let persistent = FileStore::load(config.storage.path.clone()).with_context(|| {
        format!(
            "failed to open credential store {}",
            config.storage.path.display()
        )
    })?;
    let credentials = CredentialStore::new(Arc::new(persistent));
    let tab_store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

    let transport = Arc::new(HttpTransport::new(
        reqwest::Client::new(),
        config.api.base_url.clone(),
        Duration::from_secs(config.api.timeout_secs),
    ));
    let client = ApiClient::with_credentials(transport, credentials);

    let console = Arc::new(ConsoleLayer::new(config.ui.templates_dir.clone()));
    let history = Arc::new(MemoryHistory::new(HOME_PATH));
    let mut settings = RouterSettings::new(origin);
    settings.title_suffix = config.ui.title_suffix.clone();

    let router = Router::new(
        pages::route_table(&console)?,
        history.clone(),
        console.clone(),
        client,
        tab_store.clone(),
        settings,
    );
    let shell = Shell::new(router.clone(), history, console.clone(), tab_store, prometheus);

    router.start().await;
    console.print("type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("received SIGINT, shutting down");
                break;
            }
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(command) => {
                if shell.execute(command).await == Flow::Quit {
                    break;
                }
            }
            Err(e) => console.print(e.to_string()),
        }
        debug!(active = ?shell.router().state().active, "command handled");
    }

    shell.close();
    info!("shutdown complete");
    Ok(())
}
