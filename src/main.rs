mod attachment;
mod client;
mod config;
mod directory;
#[cfg(test)]
mod fake_backend;
mod i18n;
mod interval;
mod pages;
mod presenter;
mod session;
mod task;

use anyhow::Result;
use axum::routing::get_service;
use clap::Parser;
use dotenvy::EnvLoader;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tamm-web")]
#[command(about = "Web front end for the TaMM task manager")]
struct Args {
    /// Config file (overrides TAMM_CONFIG from .env)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tamm_web=info")),
        )
        .init();

    let args = Args::parse();

    // .env first, then the process environment
    let dotenv = EnvLoader::new().load().unwrap_or_default();
    let lookup = |key: &str| dotenv.get(key).cloned().or_else(|| std::env::var(key).ok());

    let config_path = args
        .config
        .or_else(|| lookup("TAMM_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_PATH));
    let mut app_config = config::load_config(&config_path)?;
    app_config.apply_overrides(lookup);
    config::init_timezone(&app_config.timezone);

    let client = client::BackendClient::new(&app_config.backend_url, app_config.session_cookie.clone())?;
    let directory = match client.fetch_directory().await {
        Ok(directory) if !directory.is_empty() => directory,
        Ok(_) => app_config.owner_directory(),
        Err(e) => {
            warn!(error = %e, "owner directory unavailable, using configured owners");
            app_config.owner_directory()
        }
    };
    info!(
        backend = %app_config.backend_url,
        owners = directory.entries().len(),
        locale = app_config.locale.tag(),
        "backend configured"
    );

    fs::create_dir_all("static")?;
    let static_dir = ServeDir::new("static");

    let state = pages::AppState {
        client,
        directory: Arc::new(directory),
        locale: app_config.locale,
        today: config::today,
    };
    let app = pages::router()
        .with_state(state)
        .nest_service("/static", get_service(static_dir));

    let listener = tokio::net::TcpListener::bind(&app_config.listen).await?;
    info!(listen = %app_config.listen, "serving");
    axum::serve(listener, app).await?;

    Ok(())
}
