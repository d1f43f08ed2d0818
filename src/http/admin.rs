//! Admin actions that publish notifications or kick jobs.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use super::{ApiError, AppState};
use crate::domain::UserId;
use crate::notifications::Notification;

#[derive(Debug, Deserialize, Validate)]
pub struct AdminNoticeRequest {
    #[validate(range(min = 1))]
    pub user_id: u32,
    #[validate(length(min = 1, max = 500))]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

pub async fn send_notice(State(s): State<AppState>, Json(r): Json<AdminNoticeRequest>) -> Result<(StatusCode, Json<Value>), ApiError> {
    r.validate()?;
    let user_id = UserId::new(r.user_id);
    s.hub.publish(user_id, Notification::AdminNotice(r.data), r.message).await;
    info!(user_id = %user_id, "Admin notice queued");
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "queued" }))))
}

pub async fn run_pricing(State(s): State<AppState>) -> Result<Json<Value>, ApiError> {
    let adjusted = s.pricing.run_once().await?;
    Ok(Json(json!({ "adjusted": adjusted })))
}

pub async fn run_inventory(State(s): State<AppState>) -> Result<Json<Value>, ApiError> {
    let restocked = s.inventory.run_once().await?;
    Ok(Json(json!({ "restocked": restocked })))
}
