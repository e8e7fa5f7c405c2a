//! Notification endpoints.

use axum::{Json, Router, extract::State, routing::post};
use peersup_common::AppResult;
use peersup_db::entities::notification::{self, NotificationType};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Notification response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub actor_id: Option<String>,
    pub notification_type: String,
    pub session_id: Option<String>,
    pub reschedule_request_id: Option<String>,
    pub body: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: String,
}

impl From<notification::Model> for NotificationResponse {
    fn from(n: notification::Model) -> Self {
        Self {
            id: n.id,
            actor_id: n.actor_id,
            notification_type: match n.notification_type {
                NotificationType::RescheduleRequested => "rescheduleRequested".to_string(),
                NotificationType::RescheduleAccepted => "rescheduleAccepted".to_string(),
                NotificationType::RescheduleDeclined => "rescheduleDeclined".to_string(),
                NotificationType::SessionAutoCancelled => "sessionAutoCancelled".to_string(),
                NotificationType::RefundIssued => "refundIssued".to_string(),
            },
            session_id: n.session_id,
            reschedule_request_id: n.reschedule_request_id,
            body: n.body,
            is_read: n.is_read,
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

/// List notifications request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
}

const fn default_limit() -> u64 {
    20
}

/// Mark-read / delete request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationIdRequest {
    pub notification_id: String,
}

/// Unread count response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// List notifications for the authenticated user.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListNotificationsRequest>,
) -> AppResult<ApiResponse<Vec<NotificationResponse>>> {
    let limit = req.limit.min(100);
    let notifications = state
        .notification_service
        .get_notifications(&user.id, limit, req.until_id.as_deref(), req.unread_only)
        .await?;

    Ok(ApiResponse::ok(
        notifications.into_iter().map(Into::into).collect(),
    ))
}

/// Mark one notification as read.
async fn mark_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<NotificationIdRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .notification_service
        .mark_as_read(&user.id, &req.notification_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Mark all notifications as read.
async fn mark_all_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<()>> {
    state.notification_service.mark_all_as_read(&user.id).await?;
    Ok(ApiResponse::ok(()))
}

/// Count unread notifications.
async fn count_unread(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UnreadCountResponse>> {
    let count = state.notification_service.count_unread(&user.id).await?;
    Ok(ApiResponse::ok(UnreadCountResponse { count }))
}

/// Delete a notification.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<NotificationIdRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .notification_service
        .delete(&user.id, &req.notification_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", post(list))
        .route("/mark-read", post(mark_read))
        .route("/mark-all-read", post(mark_all_read))
        .route("/count-unread", post(count_unread))
        .route("/delete", post(delete))
}
