use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use zipplan_core::LookupError;
use zipplan_core::lookup::LookupService;

type SharedService = Arc<LookupService>;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
    kind: &'static str,
    key: String,
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: err.to_string(),
            kind: err.kind(),
            key: err.key().to_owned(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({
            "error": self.message,
            "kind": self.kind,
            "key": self.key,
        });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ZipQuery {
    /// `0` returns summaries only; anything else (or nothing) full records.
    details: Option<String>,
}

pub fn build_router(service: SharedService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/states", get(list_states))
        .route("/{state}/counties", get(list_counties))
        .route("/{state}/plan/{plan_id}", get(get_plan))
        .route("/{state}/{zip}", get(get_zip))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(service: SharedService, bind: &str, port: u16) -> Result<()> {
    let app = build_router(service);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("zipplan serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("zipplan serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health(State(service): State<SharedService>) -> axum::response::Response {
    Json(service.health()).into_response()
}

async fn list_states(State(service): State<SharedService>) -> axum::response::Response {
    Json(service.list_states()).into_response()
}

async fn list_counties(
    State(service): State<SharedService>,
    Path(state): Path<String>,
) -> Result<axum::response::Response, AppError> {
    let directory = service.list_counties(&state)?;
    Ok(Json(directory).into_response())
}

async fn get_plan(
    State(service): State<SharedService>,
    Path((state, plan_id)): Path<(String, String)>,
) -> Result<axum::response::Response, AppError> {
    let detail = service.get_plan_detail(&state, &plan_id)?;
    Ok(Json(detail).into_response())
}

async fn get_zip(
    State(service): State<SharedService>,
    Path((state, zip)): Path<(String, String)>,
    Query(query): Query<ZipQuery>,
) -> Result<axum::response::Response, AppError> {
    let include_details = query.details.as_deref() != Some("0");
    let plans = service.get_plans_by_zip(&state, &zip, include_details)?;
    tracing::debug!(%state, %zip, counties = plans.counties.len(), "zip lookup");
    Ok(Json(plans).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
