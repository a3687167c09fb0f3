//! Curator MCP Server
//!
//! Model Context Protocol server for autonomous content curator accounts.
//! Each account spends credits to publish content whose engagement is
//! derived from a daily trend score aggregated across several external
//! signal sources.
//!
//! # Features
//!
//! - **Accounts**: credit ledger, content history, per-platform and per-topic
//!   aggregates, reports and performance analysis
//! - **Trends**: one weighted snapshot per day from forum, link-aggregator,
//!   short-form social and video sources, with a deterministic fallback
//! - **Insights**: opportunity evaluation, timing advice, topic comparison

mod accounts;
mod cache;
mod config;
mod error;
mod sources;
mod store;
mod tools;
mod trends;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use curator_core::{default_vocabulary, Clock, SystemClock};
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::accounts::AccountService;
use crate::config::AppConfig;
use crate::store::Store;
use crate::tools::{handle_request, CuratorTools, JsonRpcRequest};
use crate::trends::TrendAggregator;

fn main() -> anyhow::Result<()> {
    // Initialize logging to stderr (stdout is for MCP protocol)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("curator_mcp=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Curator MCP Server v{}", env!("CARGO_PKG_VERSION"));

    // Create Tokio runtime
    let rt = Runtime::new()?;

    // Load configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Using default configuration");
        AppConfig::default()
    });

    tracing::info!(
        database = %config.database.path,
        source_timeout_secs = config.trends.source_timeout_seconds,
        cache_capacity = config.trends.snapshot_cache_capacity,
        "Configuration loaded"
    );

    let store = Arc::new(Store::open(&config.database.path)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let sources = sources::default_sources(&config.sources, &config.trends)?;
    let trends = Arc::new(TrendAggregator::new(
        sources,
        store.clone(),
        clock.clone(),
        default_vocabulary(),
        &config.trends,
    ));
    let accounts = Arc::new(AccountService::new(store, trends.clone(), clock));

    let tools = Arc::new(CuratorTools::new(accounts, trends));

    tracing::info!("MCP server ready, listening on stdio");

    // Main loop: read JSON-RPC requests from stdin, write responses to stdout
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(error = %e, "Error reading stdin");
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, line = %line, "Error parsing request");
                continue;
            }
        };

        tracing::debug!(method = %request.method, "Received request");

        let tools_clone = Arc::clone(&tools);
        let response = rt.block_on(async move { handle_request(&tools_clone, request).await });

        // Notifications don't get responses
        if let Some(response) = response {
            let response_str = serde_json::to_string(&response).unwrap_or_default();
            if let Err(e) = writeln!(stdout, "{}", response_str) {
                tracing::error!(error = %e, "Error writing response");
            }
            if let Err(e) = stdout.flush() {
                tracing::error!(error = %e, "Error flushing stdout");
            }
        }
    }

    tracing::info!("MCP server shutting down");
    Ok(())
}
