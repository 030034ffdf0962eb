use anyhow::{Context, Result as AnyhowResult};
use axum::Router;
use clap::Parser;
use directories::ProjectDirs;
use state::{AppState, SharedState};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use tracing_subscriber::filter::EnvFilter;

mod api;
mod config;
mod error;
mod state;

pub(crate) use error::Error;
pub(crate) type Result<T, E = error::Error> = std::result::Result<T, E>;

const API_PREFIX: &str = "/api";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// The configuration file. Defaults to `config.yaml` in the user's config directory
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// The name of the environment to use from the configuration file
    #[arg(short, long, default_value = "prod")]
    env: String,
}

fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("org", "weatherweb", "weatherweb")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
}

pub(crate) fn app(state: AppState) -> Router {
    Router::new()
        .nest(API_PREFIX, api::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        return;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> AnyhowResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("WEATHERWEB_LOG"))
        .init();
    let args = Cli::parse();

    let config_file = args
        .config
        .or_else(default_config_file)
        .context("Unable to determine the configuration file location")?;
    let env = config::load(&config_file, &args.env).with_context(|| {
        format!(
            "Unable to load environment '{}' from {}",
            args.env,
            config_file.display()
        )
    })?;
    debug!(?env, "Loaded configuration");

    let state = Arc::new(SharedState::new(env).await?);
    let addr: SocketAddr = format!(
        "{}:{}",
        state.config.listen.host, state.config.listen.port
    )
    .parse()
    .context("Invalid listen address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Unable to listen on {addr}"))?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_app(pool: sqlx::Pool<sqlx::Sqlite>, provider_uri: &str) -> Router {
    app(Arc::new(SharedState::test(pool, provider_uri)))
}
