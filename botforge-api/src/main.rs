//! Botforge API server: submit bot specs and inspect jobs over HTTP.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use botforge::io::config::{DEFAULT_CONFIG_FILE, load_effective_config};
use botforge::io::job_store::SqliteJobStore;
use botforge::logging;
use botforge::stages::FactoryStages;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "botforge-api")]
#[command(about = "REST front end for the bot factory pipeline")]
struct Args {
    /// Path to the factory config file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Address to bind to (overrides `server.host`)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides `server.port`)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut cfg = load_effective_config(&args.config)
        .with_context(|| format!("load config {}", args.config.display()))?;
    if let Some(host) = args.host {
        cfg.server.host = host;
    }
    if let Some(port) = args.port {
        cfg.server.port = port;
    }
    logging::init(&cfg.log_level);
    cfg.ensure_dirs()?;

    let store = SqliteJobStore::open(&cfg.paths.db_path)?;
    let state = AppState::new(store, FactoryStages::from_config(&cfg));
    info!(
        db = %cfg.paths.db_path.display(),
        output_dir = %cfg.paths.output_dir.display(),
        "starting botforge-api"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", routes::api_router())
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .context("parse listen address")?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
