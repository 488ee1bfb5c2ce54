mod auth;
mod email;
mod error;
mod model;
mod request_tracing;
mod routes;
mod server_config;

#[cfg(test)]
mod tests;

use std::{env, net::SocketAddr, path::Path, sync::Arc, time::Duration};

use axum::extract::FromRef;
use email::category::Classifier;
use mimalloc::MiMalloc;
use routes::app_router::AppRouter;
use server_config::ServerConfig;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub type HttpClient = reqwest::Client;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub http_client: HttpClient,
    pub config: Arc<ServerConfig>,
    pub classifier: Arc<Classifier>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::ClientBuilder::new()
            .use_rustls_tls()
            .timeout(config.provider_timeout() + Duration::from_secs(5))
            .build()?;
        let classifier = Classifier::from_heuristics(config.heuristics.clone());

        Ok(ServerState {
            http_client,
            config: Arc::new(config),
            classifier: Arc::new(classifier),
        })
    }
}

fn init_tracing() {
    let json = env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_ansi(false)))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::load(Path::new(env!("CARGO_MANIFEST_DIR")))
        .expect("Failed to load server configuration");
    tracing::info!("{config}");

    let port = config.port;
    let state = ServerState::new(config)?;
    let router = AppRouter::create(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Inbox server running on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("Failed to listen for Ctrl+C");
    tracing::info!("Received Ctrl+C, shutting down");
}
