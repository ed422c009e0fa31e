mod admin;
mod background;
mod config;
mod dispatch;
mod error;
mod helpers;
mod matching;
mod registry;
mod router;
mod selector;
mod signal;
mod state;
mod store;
mod traits;
mod weather;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures_util::StreamExt;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use config::{default_db_path, Args, Config};
use error::AppError;
use helpers::truncate;
use registry::RecipientRegistry;
use selector::ResponseSelector;
use state::State;
use store::SqliteStore;
use traits::SignalChannel;
use weather::{WeatherApi, FETCH_TIMEOUT};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("jokebot=info")),
        )
        .init();

    let mut args = Args::parse();

    if let Some(cmd) = args.command.take() {
        let db_path = args.db_path.clone().unwrap_or_else(default_db_path);
        let result = SqliteStore::open(&db_path)
            .and_then(|store| admin::run_admin(&store, &store, cmd));
        match result {
            Ok(out) => println!("{out}"),
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let config = match Config::from_args(&args) {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let store = match SqliteStore::open(&config.db_path) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!(path = %config.db_path.display(), "Failed to open database: {e}");
            std::process::exit(1);
        }
    };

    if config.weather_api_key.is_none() {
        info!("No weather API key set, weather replies will use the failure text");
    }

    let http = Client::new();
    let selector = match config.seed {
        Some(seed) => ResponseSelector::with_seed(seed),
        None => ResponseSelector::from_entropy(),
    };
    let state = Arc::new(State {
        channel: Box::new(SignalChannel {
            http: http.clone(),
            api_url: config.api_url.clone(),
            account: config.account.clone(),
        }),
        weather: Box::new(WeatherApi {
            http,
            base_url: config.weather_url.clone(),
            api_key: config.weather_api_key.clone(),
            lang: config.weather_lang.clone(),
            timeout: FETCH_TIMEOUT,
        }),
        recipients: RecipientRegistry::new(),
        selector,
        triggers: store.clone(),
        content: store,
        config,
    });

    info!("jokebot starting for account {}", state.config.account);
    info!(db = %state.config.db_path.display(), city = %state.config.city, "Configuration loaded");

    let cancel = CancellationToken::new();
    background::spawn_shutdown_handler(&cancel);
    let daily = background::spawn_daily_loop(&state, &cancel);
    let interval = background::spawn_interval_loop(&state, &cancel);

    let mut backoff = 1u64;
    while !cancel.is_cancelled() {
        match connect_and_listen(&state, &cancel).await {
            Ok(()) if cancel.is_cancelled() => break,
            Ok(()) => {
                info!("WebSocket closed cleanly, reconnecting...");
                backoff = 1;
            }
            Err(e) => {
                error!("WebSocket error: {e}, reconnecting in {backoff}s...");
            }
        }
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(Duration::from_secs(backoff)) => {}
        }
        backoff = (backoff * 2).min(60);
    }

    background::wait_for_loops(vec![("daily", daily), ("interval", interval)]).await;
    info!(recipients = state.recipients.len(), "jokebot stopped");
}

/// Handle inbound messages one at a time, in arrival order, until the
/// socket closes or shutdown is requested.
async fn connect_and_listen(state: &Arc<State>, cancel: &CancellationToken) -> Result<(), AppError> {
    let mut inbound = signal::connect_inbound(&state.config.api_url, &state.config.account).await?;

    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            next = inbound.next() => next,
        };
        let Some(msg) = next else {
            return Ok(());
        };
        let msg = msg?;
        info!(sender = %msg.sender, "Message: {}", truncate(&msg.text, 80));

        if let Err(e) = router::handle_message(state, &msg).await {
            error!(sender = %msg.sender, "Error handling message: {e}");
        }
    }
}
