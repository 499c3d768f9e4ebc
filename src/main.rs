//! sviago - Swedavia flight info snapshots
//!
//! Command-line entry point: runs the HTTP server, or fetches and prints a single
//! day of flights.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sviago::cache::{CacheResolver, DiskStore, Origin, SnapshotKey};
use sviago::cli::{Cli, Command, Settings};
use sviago::data::{FlightSource, SwedaviaClient};
use sviago::report::{format_arrivals, format_departures};
use sviago::server;

/// Resolves when the process receives Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("starting graceful shutdown...");
}

/// Builds the resolver over the on-disk store and the live API
fn build_resolver(settings: &Settings) -> Result<Arc<CacheResolver>, Box<dyn std::error::Error>> {
    let client = SwedaviaClient::new(settings.client.clone())?;
    let store = DiskStore::new(settings.data_dir.clone());
    let resolver = CacheResolver::new(Arc::new(store), Arc::new(client))
        .with_fetch_timeout(settings.fetch_timeout);
    Ok(Arc::new(resolver))
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_cli(&cli)?;

    match cli.command {
        Command::Serve { .. } => {
            let resolver = build_resolver(&settings)?;
            info!(data_dir = %settings.data_dir.display(), "serving snapshots");
            server::serve(&settings.server, resolver, shutdown_signal()).await?;
        }
        Command::Fetch {
            airport,
            date,
            output,
        } => {
            let key = SnapshotKey::arrivals(airport, date)?;
            let client = SwedaviaClient::new(settings.client.clone())?;
            let arrivals = client.fetch_arrivals(key.airport(), key.date()).await?;
            let departures = client.fetch_departures(key.airport(), key.date()).await?;

            match output {
                Some(path) => {
                    tokio::fs::write(&path, serde_json::to_vec(&arrivals)?).await?;
                    println!("Arrivals info written to {}", path.display());
                }
                None => {
                    print!("{}", format_arrivals(&arrivals));
                    println!();
                    print!("{}", format_departures(&departures));
                }
            }
        }
        Command::Show { airport, date } => {
            let resolver = build_resolver(&settings)?;
            let key = SnapshotKey::arrivals(airport, date)?;
            let resolved = resolver.resolve_arrivals(&key).await?;
            if resolved.origin == Origin::Fetched {
                info!(%key, "fetched from upstream");
            }
            print!("{}", format_arrivals(&resolved.set));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
