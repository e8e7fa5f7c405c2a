//! Session endpoints.

use axum::{Json, Router, extract::State, routing::post};
use chrono::{DateTime, Utc};
use peersup_common::AppResult;
use peersup_core::CreateSessionInput;
use peersup_db::entities::refund::{self, RefundStatus};
use peersup_db::entities::session::{self, SessionKind, SessionStatus};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Session response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    pub client_id: String,
    pub supporter_id: String,
    pub kind: String,
    pub status: String,
    pub scheduled_at: String,
    pub duration_minutes: i32,
    pub price_cents: i64,
    pub cancel_reason: Option<String>,
    pub cancelled_at: Option<String>,
    pub created_at: String,
}

impl From<session::Model> for SessionResponse {
    fn from(s: session::Model) -> Self {
        Self {
            id: s.id,
            client_id: s.client_id,
            supporter_id: s.supporter_id,
            kind: match s.kind {
                SessionKind::Chat => "chat".to_string(),
                SessionKind::Phone => "phone".to_string(),
                SessionKind::Video => "video".to_string(),
            },
            status: match s.status {
                SessionStatus::Scheduled => "scheduled".to_string(),
                SessionStatus::Completed => "completed".to_string(),
                SessionStatus::Cancelled => "cancelled".to_string(),
            },
            scheduled_at: s.scheduled_at.to_rfc3339(),
            duration_minutes: s.duration_minutes,
            price_cents: s.price_cents,
            cancel_reason: s.cancel_reason,
            cancelled_at: s.cancelled_at.map(|dt| dt.to_rfc3339()),
            created_at: s.created_at.to_rfc3339(),
        }
    }
}

/// Create session request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub supporter_id: String,
    pub kind: SessionKind,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub price_cents: i64,
}

/// Show / complete session request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdRequest {
    pub session_id: String,
}

/// Cancel session request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelSessionRequest {
    pub session_id: String,
    pub reason: Option<String>,
}

/// List sessions request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSessionsRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub upcoming_only: bool,
}

const fn default_limit() -> u64 {
    20
}

/// Book a session.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let input = CreateSessionInput {
        supporter_id: req.supporter_id,
        kind: req.kind,
        scheduled_at: req.scheduled_at,
        duration_minutes: req.duration_minutes,
        price_cents: req.price_cents,
    };

    let session = state.session_service.create(&user.id, input).await?;
    Ok(ApiResponse::ok(session.into()))
}

/// Show a session.
async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SessionIdRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let session = state
        .session_service
        .get_by_id_for_user(&req.session_id, &user.id)
        .await?;
    Ok(ApiResponse::ok(session.into()))
}

/// List the authenticated user's sessions.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListSessionsRequest>,
) -> AppResult<ApiResponse<Vec<SessionResponse>>> {
    let limit = req.limit.min(100);
    let sessions = if req.upcoming_only {
        state
            .session_service
            .list_upcoming_for_user(&user.id, limit)
            .await?
    } else {
        state
            .session_service
            .list_for_user(&user.id, limit, req.offset)
            .await?
    };

    Ok(ApiResponse::ok(sessions.into_iter().map(Into::into).collect()))
}

/// Cancel a session.
async fn cancel(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CancelSessionRequest>,
) -> AppResult<ApiResponse<()>> {
    let reason = req.reason.as_deref().unwrap_or("Cancelled by user");
    state
        .session_service
        .cancel(&req.session_id, &user.id, reason)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Refund response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub id: String,
    pub session_id: String,
    pub amount_cents: i64,
    pub status: String,
    pub created_at: String,
    pub issued_at: Option<String>,
}

impl From<refund::Model> for RefundResponse {
    fn from(r: refund::Model) -> Self {
        Self {
            id: r.id,
            session_id: r.session_id,
            amount_cents: r.amount_cents,
            status: match r.status {
                RefundStatus::Pending => "pending".to_string(),
                RefundStatus::Issued => "issued".to_string(),
                RefundStatus::Failed => "failed".to_string(),
            },
            created_at: r.created_at.to_rfc3339(),
            issued_at: r.issued_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

/// Show the refund for a cancelled session, if one exists.
async fn refund(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SessionIdRequest>,
) -> AppResult<ApiResponse<Option<RefundResponse>>> {
    // Party check happens through the session lookup.
    let session = state
        .session_service
        .get_by_id_for_user(&req.session_id, &user.id)
        .await?;

    let refund = state.refund_service.find_by_session(&session.id).await?;
    Ok(ApiResponse::ok(refund.map(Into::into)))
}

/// Mark a session completed.
async fn complete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SessionIdRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .session_service
        .complete(&req.session_id, &user.id)
        .await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/show", post(show))
        .route("/list", post(list))
        .route("/cancel", post(cancel))
        .route("/complete", post(complete))
        .route("/refund", post(refund))
}
