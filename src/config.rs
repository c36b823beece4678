//! Server configuration, merged from environment variables and an optional
//! CLI override layer. Missing `LOG_FILE_PATH`/`LOG_PASSWORD` is a
//! configuration error, not a panic (see the error handling design).

use crate::error::LogViewError;
use clap::Parser;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8787;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_file_path: PathBuf,
    pub password: String,
    pub port: u16,
}

impl Config {
    /// Reads `LOG_FILE_PATH`, `LOG_PASSWORD`, and `PORT` from the
    /// environment. Returns a [`LogViewError::Config`] describing exactly
    /// what's missing rather than panicking.
    pub fn from_env() -> Result<Config, LogViewError> {
        let log_file_path = std::env::var("LOG_FILE_PATH")
            .map_err(|_| LogViewError::Config("LOG_FILE_PATH is not set".to_string()))?;
        let password = std::env::var("LOG_PASSWORD")
            .map_err(|_| LogViewError::Config("LOG_PASSWORD is not set".to_string()))?;
        if password.is_empty() {
            return Err(LogViewError::Config("LOG_PASSWORD must not be empty".to_string()));
        }
        let port = std::env::var("PORT")
            .ok()
            .map(|s| s.parse::<u16>())
            .transpose()
            .map_err(|e| LogViewError::Config(format!("PORT is not a valid port number: {e}")))?
            .unwrap_or(DEFAULT_PORT);

        Ok(Config {
            log_file_path: PathBuf::from(log_file_path),
            password,
            port,
        })
    }

    /// Applies CLI overrides on top of an environment-derived config. CLI
    /// flags win when given.
    pub fn apply_cli(mut self, cli: &Cli) -> Config {
        if let Some(path) = &cli.log_file {
            self.log_file_path = path.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        self
    }
}

/// Development convenience overrides layered over the environment.
#[derive(Debug, Parser)]
#[command(name = "logviewd", about = "Time-indexed NDJSON log server")]
pub struct Cli {
    /// Overrides LOG_FILE_PATH.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Overrides PORT.
    #[arg(long)]
    pub port: Option<u16>,
}
