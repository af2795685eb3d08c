use crate::api::AppState;
use crate::domain::{Address, PositionEvent};
use crate::engine::Notification;
use crate::error::AppError;
use crate::ingestion::PendingRegistration;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedResponse {
    pub status: &'static str,
    pub epoch: u64,
}

fn accepted(epoch: u64) -> (StatusCode, Json<AcceptedResponse>) {
    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "accepted",
            epoch,
        }),
    )
}

/// Ingest one live event; responds once the session has applied it.
pub async fn post_event(
    State(state): State<AppState>,
    Json(event): Json<PositionEvent>,
) -> Result<(StatusCode, Json<AcceptedResponse>), AppError> {
    debug!(event = event.name(), "Received position event");
    state.session.ingest_event(event).await?;
    let epoch = state.session.sync().await?;
    Ok(accepted(epoch))
}

pub async fn post_pending(
    State(state): State<AppState>,
    Json(registration): Json<PendingRegistration>,
) -> Result<(StatusCode, Json<AcceptedResponse>), AppError> {
    if registration.size.is_none() && registration.collateral_snapshot.is_none() {
        return Err(AppError::BadRequest(
            "Pending registration needs size or collateralSnapshot".into(),
        ));
    }
    state.session.register_pending(registration).await?;
    let epoch = state.session.sync().await?;
    Ok(accepted(epoch))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub account: Option<Address>,
}

/// Switch the active account; clears overlays and starts a new epoch.
pub async fn post_reset(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), AppError> {
    state.session.reset(request.account).await?;
    let epoch = state.session.sync().await?;
    Ok(accepted(epoch))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsQuery {
    /// Only notifications created at or after this time.
    pub since_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

pub async fn get_notifications(
    Query(params): Query<NotificationsQuery>,
    State(state): State<AppState>,
) -> Result<Json<NotificationsResponse>, AppError> {
    let view = state.session.view();
    let notifications = view
        .notifications
        .iter()
        .filter(|n| params.since_ms.map_or(true, |since| n.created_at.as_ms() >= since))
        .cloned()
        .collect();
    Ok(Json(NotificationsResponse { notifications }))
}
