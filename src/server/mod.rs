//! HTTP surface: `GET /api/song/analyze` and `GET /health`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

use crate::analysis::{AnalyzeError, Analyzer};
use crate::context::{ContextError, RequestContext};

#[derive(Clone)]
pub struct ServerState {
    pub analyzer: Arc<Analyzer>,
    /// Deadline given to each request's context.
    pub request_timeout: Duration,
}

#[derive(Deserialize)]
struct AnalyzeQuery {
    #[serde(default)]
    track: String,
    #[serde(default)]
    artist: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<ErrorDetails>,
}

#[derive(Serialize)]
struct ErrorDetails {
    track: String,
    artist: String,
    debug: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: &'static str,
}

fn error_response(
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    details: Option<ErrorDetails>,
) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code,
            message,
            details,
        },
    };
    (status, Json(body)).into_response()
}

/// Map an analysis failure to a status code, error code and message.
fn classify(err: &AnalyzeError) -> (StatusCode, &'static str, &'static str) {
    if err.is_not_found() {
        return (StatusCode::NOT_FOUND, "not_found", "Song not found");
    }
    if err.upstream_status() == Some(429) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "Too many requests to lyrics provider",
        );
    }
    if err.context_error() == Some(ContextError::DeadlineExceeded) {
        return (StatusCode::GATEWAY_TIMEOUT, "timeout", "The request timed out");
    }
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "Failed to analyze song",
    )
}

async fn analyze_song(State(state): State<ServerState>, Query(q): Query<AnalyzeQuery>) -> Response {
    let track = q.track.trim();
    let artist = q.artist.trim();
    if track.is_empty() || artist.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing_parameter",
            "Track and artist are required",
            None,
        );
    }

    let ctx = RequestContext::with_timeout(state.request_timeout);
    match state.analyzer.analyze(&ctx, track, artist).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => {
            let (status, code, message) = classify(&err);
            warn!(track, artist, error = %err, status = status.as_u16(), "analysis failed");
            error_response(
                status,
                code,
                message,
                Some(ErrorDetails {
                    track: track.to_string(),
                    artist: artist.to_string(),
                    debug: err.to_string(),
                }),
            )
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        timestamp: time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    info!(
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

pub fn make_router(state: ServerState) -> Router {
    Router::new()
        .route("/api/song/analyze", get(analyze_song))
        .route("/health", get(health))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

pub async fn serve(addr: &str, state: ServerState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(addr = %listener.local_addr().context("local addr")?, "starting server");

    axum::serve(listener, make_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve http")?;

    info!("server exited properly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down server...");
}
