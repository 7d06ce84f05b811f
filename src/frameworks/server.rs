// Framework bootstrap for the party server runtime.

use crate::domain::tuning::{ProjectileTuning, TankTuning};
use crate::frameworks::config;
use crate::interface_adapters::clients::directory::DirectoryClient;
use crate::interface_adapters::net::{create_party_handler, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{PartyRegistry, PartySettings, SessionSettings};

use axum::{
    Router,
    routing::{get, post},
};
use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state()?;

    // Start the Web Server
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/parties", post(create_party_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Result<Arc<AppState>> {
    let directory = match config::directory_service_url() {
        Some(base_url) => {
            let timeout = config::directory_timeout();
            let client = DirectoryClient::new(base_url.clone(), timeout).map_err(|e| {
                std::io::Error::other(format!("failed to initialize directory client: {e}"))
            })?;
            tracing::debug!(
                directory_base_url = %base_url,
                directory_timeout_ms = timeout.as_millis(),
                "directory client configured"
            );
            Some(Arc::new(client))
        }
        None => None,
    };

    // Setup Party Registry
    // This owns the set of active party session actors.
    let party_registry = Arc::new(PartyRegistry::new(PartySettings {
        event_channel_capacity: config::EVENT_CHANNEL_CAPACITY,
        max_connections: config::MAX_CONNECTIONS_PER_PARTY,
        session: SessionSettings {
            tick_interval: config::TICK_INTERVAL,
            tank_tuning: TankTuning::default(),
            projectile_tuning: ProjectileTuning::default(),
        },
    }));

    Ok(Arc::new(AppState {
        party_registry,
        directory,
        public_base_url: Arc::from(config::public_base_url().as_str()),
    }))
}
