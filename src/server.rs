//! HTTP surface over the snapshot cache
//!
//! Serves single-day flight lists sorted by airline and the hourly arrival
//! histogram over every stored arrivals snapshot of an airport. All failures are
//! turned into a status code and a JSON error body; no request can take the
//! process down.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info, warn};

use crate::aggregate::{hourly_distribution, sort_flights_by_airline, AggregateError, HourHistogram};
use crate::cache::{
    check_airport, CacheResolver, KeyError, ResolveError, SnapshotKey, SnapshotKind, StoreError,
};
use crate::data::{ArrivalsInfo, DeparturesInfo};

/// Default listen address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Settings for the HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Upper bound on handling one request, including an upstream fetch
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            request_timeout: Duration::from_secs(40),
        }
    }
}

/// Errors that can stop the server itself
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {message}: {cause}")]
    IO {
        message: String,
        cause: std::io::Error,
    },
}

/// Errors a single request can end in
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed airport or date in the path
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] KeyError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// Stored snapshots could not be listed
    #[error("snapshot store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Stable machine-readable name of the error class
    fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::Resolve(ResolveError::FetchFailed { .. }) => "fetch_failed",
            ApiError::Resolve(ResolveError::StoreUnavailable { .. }) | ApiError::Store(_) => {
                "store_unavailable"
            }
            ApiError::Resolve(ResolveError::CorruptSnapshot { .. }) => "corrupt_snapshot",
            ApiError::Aggregate(AggregateError::TimestampParse { .. }) => "timestamp_parse_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Resolve(ResolveError::FetchFailed { .. }) => StatusCode::BAD_GATEWAY,
            ApiError::Resolve(ResolveError::StoreUnavailable { .. }) | ApiError::Store(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Resolve(ResolveError::CorruptSnapshot { .. }) | ApiError::Aggregate(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON body of every error response
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, kind = self.kind(), "request failed");
        } else {
            warn!(error = %self, kind = self.kind(), "request rejected");
        }

        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Hourly arrival histogram over all stored days of one airport
#[derive(Debug, Serialize)]
pub struct ArrivalDistribution {
    pub airport: String,
    /// Dates of the snapshots that went into the histogram, ascending
    pub dates: Vec<String>,
    pub histogram: HourHistogram,
}

/// Builds the application router
pub fn router(resolver: Arc<CacheResolver>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/arrivals/{iata}", get(arrival_distribution))
        .route("/arrivals/{iata}/", get(arrival_distribution))
        .route("/arrivals/{iata}/{date}", get(arrivals_for_day))
        .route("/departures/{iata}/{date}", get(departures_for_day))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(resolver)
}

/// Binds `config.addr` and serves until `shutdown` resolves
pub async fn serve<F>(
    config: &ServerConfig,
    resolver: Arc<CacheResolver>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(config.addr)
        .await
        .map_err(|cause| ServerError::IO {
            message: format!("Failed to listen on {}", config.addr),
            cause,
        })?;
    serve_on(listener, resolver, config.request_timeout, shutdown).await
}

/// Serves on an already bound listener until `shutdown` resolves
pub async fn serve_on<F>(
    listener: TcpListener,
    resolver: Arc<CacheResolver>,
    request_timeout: Duration,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "starting HTTP server");
    }

    axum::serve(listener, router(resolver, request_timeout))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|cause| ServerError::IO {
            message: "HTTP server failed".to_string(),
            cause,
        })?;

    info!("HTTP server has been shut down");
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn arrivals_for_day(
    State(resolver): State<Arc<CacheResolver>>,
    Path((iata, date)): Path<(String, String)>,
) -> Result<Json<ArrivalsInfo>, ApiError> {
    let key = SnapshotKey::arrivals(iata, date)?;
    let mut arrivals = resolver.resolve_arrivals(&key).await?.set;
    sort_flights_by_airline(&mut arrivals.flights);
    Ok(Json(arrivals))
}

async fn departures_for_day(
    State(resolver): State<Arc<CacheResolver>>,
    Path((iata, date)): Path<(String, String)>,
) -> Result<Json<DeparturesInfo>, ApiError> {
    let key = SnapshotKey::departures(iata, date)?;
    let mut departures = resolver.resolve_departures(&key).await?.set;
    sort_flights_by_airline(&mut departures.flights);
    Ok(Json(departures))
}

async fn arrival_distribution(
    State(resolver): State<Arc<CacheResolver>>,
    Path(iata): Path<String>,
) -> Result<Json<ArrivalDistribution>, ApiError> {
    check_airport(&iata)?;

    let mut keys: Vec<_> = resolver
        .store()
        .keys()
        .await?
        .into_iter()
        .filter(|k| k.kind() == SnapshotKind::Arrivals && k.airport() == iata)
        .collect();
    keys.sort();

    let resolved =
        futures::future::try_join_all(keys.iter().map(|k| resolver.resolve_arrivals(k))).await?;
    let histogram = hourly_distribution(resolved.iter().map(|r| &r.set))?;

    info!(airport = %iata, snapshots = keys.len(), flights = histogram.total(), "hourly distribution computed");

    Ok(Json(ArrivalDistribution {
        airport: iata,
        dates: keys.iter().map(|k| k.date().to_string()).collect(),
        histogram,
    }))
}
