//! Command-line interface parsing for sviago
//!
//! This module handles parsing of CLI arguments using clap and lifts them into the
//! explicit configuration structs the client, store and server are built from.
//! The subscription key may come from `--subscription-key` or the
//! `SWEDAVIA_SUBSCRIPTION_KEY` environment variable.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::cache::DEFAULT_DATA_DIR;
use crate::data::client::SWEDAVIA_BASE_URL;
use crate::data::ClientConfig;
use crate::server::{ServerConfig, DEFAULT_ADDR};

/// Extra time a request may take on top of the upstream fetch timeout
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// Error types for CLI argument handling
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    /// The chosen command may contact the API but no key was given
    #[error("No subscription key: pass --subscription-key or set SWEDAVIA_SUBSCRIPTION_KEY")]
    MissingSubscriptionKey,

    /// A zero fetch timeout would fail every miss
    #[error("Invalid fetch timeout: must be at least one second")]
    InvalidFetchTimeout,
}

/// sviago - Swedavia arrivals and departures, cached on disk
#[derive(Parser, Debug)]
#[command(name = "sviago")]
#[command(about = "Swedavia flight info snapshots, cached on disk and served over HTTP")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the JSON snapshots
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Base URL of the flight info API
    #[arg(long, global = true, default_value = SWEDAVIA_BASE_URL)]
    pub base_url: String,

    /// API subscription key
    #[arg(long, global = true, env = "SWEDAVIA_SUBSCRIPTION_KEY", hide_env_values = true)]
    pub subscription_key: Option<String>,

    /// Upper bound on one upstream fetch, in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = DEFAULT_ADDR)]
        addr: SocketAddr,
    },

    /// Fetch arrivals and departures straight from the API, bypassing the cache
    ///
    /// Examples:
    ///   sviago fetch ARN 2024-05-01
    ///   sviago fetch ARN 2024-05-01 --output arrivals.json
    Fetch {
        /// Airport IATA code
        airport: String,
        /// Date as accepted by the API, e.g. 2024-05-01
        date: String,
        /// Write the arrivals JSON here instead of printing listings
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Print the arrivals of one day, fetching only on a cache miss
    Show {
        /// Airport IATA code
        airport: String,
        /// Date as accepted by the API, e.g. 2024-05-01
        date: String,
    },
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub client: ClientConfig,
    pub server: ServerConfig,
    pub fetch_timeout: Duration,
}

impl Settings {
    /// Creates Settings from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(Settings)` with appropriate settings
    /// * `Err(CliError)` if the subscription key is missing or the timeout is zero
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.fetch_timeout_secs == 0 {
            return Err(CliError::InvalidFetchTimeout);
        }
        let fetch_timeout = Duration::from_secs(cli.fetch_timeout_secs);

        let subscription_key = cli
            .subscription_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(CliError::MissingSubscriptionKey)?;

        let addr = match &cli.command {
            Command::Serve { addr } => *addr,
            _ => ServerConfig::default().addr,
        };

        Ok(Settings {
            data_dir: cli.data_dir.clone(),
            client: ClientConfig {
                base_url: cli.base_url.clone(),
                subscription_key,
                timeout: fetch_timeout,
            },
            server: ServerConfig {
                addr,
                request_timeout: fetch_timeout + REQUEST_TIMEOUT_MARGIN,
            },
            fetch_timeout,
        })
    }
}
