use std::{fs, path::PathBuf};

use crate::{cli::Cli, error::AppError};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Canonical path of the shared directory.
    pub shared_dir: PathBuf,
    pub password: Option<String>,
    pub verbose: bool,
    pub no_qr: bool,
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, AppError> {
        let shared_dir = fs::canonicalize(&cli.dir).map_err(|err| {
            AppError::Config(format!(
                "directory '{}' does not exist: {err}",
                cli.dir.display()
            ))
        })?;
        if !shared_dir.is_dir() {
            return Err(AppError::Config(format!(
                "'{}' is not a directory",
                cli.dir.display()
            )));
        }

        let password = cli.password.filter(|value| !value.is_empty());

        Ok(Self {
            host: cli.host,
            port: cli.port,
            shared_dir,
            password,
            verbose: cli.verbose,
            no_qr: cli.no_qr,
            log_dir: cli.log_dir,
        })
    }

    pub fn password_enabled(&self) -> bool {
        self.password.is_some()
    }
}
