//! HTTP surface for the alert queries.

use anyhow::{anyhow, Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::db::Database;
use crate::error::ApiError;
use crate::models::Alert;
use crate::query::{self, AlertParams};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Database>>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    // Held for the whole request, which also makes dismiss atomic per alert.
    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| anyhow!("database lock poisoned"))
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/{alert_id}/dismiss", post(dismiss_alert))
        .with_state(state)
}

/// Serve the API on `addr` until Ctrl-C.
pub async fn serve(db: Database, addr: SocketAddr) -> Result<()> {
    let app = build_router(AppState::new(db))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await?;

    info!("server stopped");
    Ok(())
}

/// Store connectivity and row counts.
async fn health_check(State(state): State<AppState>) -> Response {
    let counts = state
        .db()
        .and_then(|db| Ok((db.count_employees()?, db.count_alerts()?)));

    match counts {
        Ok((employees, alerts)) => Json(json!({
            "status": "healthy",
            "database": "connected",
            "employees": employees,
            "alerts": alerts,
        }))
        .into_response(),
        Err(e) => {
            error!(error = ?e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Query pairs are folded by hand so a repeated key keeps its last value
/// instead of failing deserialization.
async fn list_alerts(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    let params = AlertParams::from_pairs(pairs);
    let db = state.db()?;
    let alerts = query::list_alerts(&db, &params)?;
    Ok(Json(alerts))
}

async fn dismiss_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    let db = state.db()?;
    let alert = query::dismiss_alert(&db, &alert_id)?;
    Ok(Json(alert))
}
