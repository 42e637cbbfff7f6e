mod assets;
mod auth;
mod banner;
mod cli;
mod config;
mod error;
mod format;
mod models;
mod paths;
mod routes;

use std::{fs, io, path::PathBuf};

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use clap::Parser;
use cli::Cli;
use config::AppConfig;
use error::AppError;
use models::stats::ServerStats;
use routes::register;
use tracing::{error, info};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub struct AppState {
    pub config: AppConfig,
    pub stats: ServerStats,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            stats: ServerStats::new(),
        }
    }

    /// Maps a client path onto the shared directory, refusing anything that
    /// lands outside it lexically or through symlinks.
    pub async fn resolve(&self, requested: &str) -> Result<PathBuf, AppError> {
        let root = &self.config.shared_dir;
        let lexical = paths::resolve(root, requested)?;
        paths::confine(root, lexical).await
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli).map_err(io::Error::other)?;
    let _guard = init_tracing(&config)?;

    banner::announce(&config);

    info!(
        host = %config.host,
        port = config.port,
        "starting beamdrop"
    );

    let bind_addr = (config.host.clone(), config.port);
    let shared_state = web::Data::new(AppState::new(config));

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(shared_state.clone())
            .configure(register)
    })
    .bind(bind_addr)
    .inspect_err(|err| error!(error = %err, "failed to bind listener"))?
    .run()
    .await
}

fn init_tracing(config: &AppConfig) -> io::Result<Option<WorkerGuard>> {
    let default_level = if config.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(io::Error::other)?;

    let (file_layer, guard) = match &config.log_dir {
        Some(log_dir) => {
            fs::create_dir_all(log_dir)?;
            let file_appender = rolling::never(log_dir, "beamdrop.log");
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer().with_ansi(false).with_writer(file_writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}
