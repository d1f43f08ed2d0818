//! HTTP and WebSocket surface.

mod admin;
mod ws;

use std::sync::Arc;

use axum::{http::StatusCode, response::{IntoResponse, Response}, routing::{get, post}, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::catalog::CatalogError;
use crate::jobs::{InventoryJob, PricingJob};
use crate::notifications::NotificationHub;

pub use ws::{parse_user_id, ConnectQuery};

#[derive(Clone)]
pub struct AppState {
    pub hub: NotificationHub,
    pub pricing: Arc<PricingJob>,
    pub inventory: Arc<InventoryJob>,
    /// Outbound queue size for each WebSocket session.
    pub connection_queue_capacity: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Catalog(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::upgrade))
        .route("/api/v1/admin/notifications", post(admin::send_notice))
        .route("/api/v1/admin/jobs/pricing/run", post(admin::run_pricing))
        .route("/api/v1/admin/jobs/inventory/run", post(admin::run_inventory))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(axum::extract::State(s): axum::extract::State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "webshop-notifier", "hub": s.hub.stats() }))
}
