use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cauldron_api::config::{AppConfig, Config, EnvName, Environment};
use cauldron_api::database::DatabaseManager;
use cauldron_api::{AppContext, AppState};

#[derive(Debug, Parser)]
#[command(name = "cauldron-api", version, about = "Cauldron administrative data API")]
struct Args {
    /// Environment name; defaults to CAULDRON_ENV, then SERVERLESS_STAGE, then devlocal
    #[arg(long)]
    env: Option<EnvName>,

    /// Configuration root; defaults to CAULDRON_CONFIG_DIR or ./config
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Port to listen on, overriding configuration and PORT
    #[arg(long)]
    port: Option<u16>,
}

impl Args {
    fn config(&self, env: Environment) -> Config {
        match &self.config_dir {
            Some(dir) => Config::new(env, dir.clone()),
            None => Config::from_env(env),
        }
    }
}

/// Resolve configuration and open the store for one environment.
async fn build_context(manager: &DatabaseManager, config: Config) -> Result<(AppContext, AppConfig)> {
    let env = config.environment();
    let settings = AppConfig::from_config(&config).with_context(|| format!("invalid configuration for {env}"))?;
    let store = manager
        .store(&env, &settings.database)
        .await
        .with_context(|| format!("failed to open store for {env}"))?;

    Ok((AppContext::new(Arc::new(config), store), settings))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present so DATABASE_URL and friends can live there
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let env = match args.env {
        Some(name) => Environment::new(name, false),
        None => Environment::from_env(false)?,
    };
    info!("Starting Cauldron API in {} mode", env);

    let manager = DatabaseManager::new();
    let (live, settings) = build_context(&manager, args.config(env)).await?;
    let (test, _) = build_context(&manager, args.config(env.with_test(true))).await?;

    let port = args.port.unwrap_or(settings.server.port);
    let bind_addr = format!("{}:{}", settings.server.host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!("Cauldron API listening on http://{}", bind_addr);

    axum::serve(listener, cauldron_api::app(AppState::new(live, test)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.close_all().await;
    Ok(())
}
