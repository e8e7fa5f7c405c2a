//! Reschedule request endpoints.
//!
//! The list surface only ever shows requests the client can still act on:
//! settled requests and requests past their response deadline are excluded
//! outright rather than rendered disabled. Each actionable request carries a
//! countdown derived from the shared deadline calculator, so urgency and
//! expiry can never drift from the deadline itself.

use axum::{Json, Router, extract::State, routing::post};
use chrono::{DateTime, Utc};
use peersup_common::AppResult;
use peersup_core::{ProposeRescheduleInput, TimeUntilDeadline, time_until_deadline};
use peersup_db::entities::reschedule_request::{self, RescheduleStatus};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

// ==================== Request/Response Types ====================

/// Countdown to the response deadline, for display.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownResponse {
    pub hours: i64,
    pub minutes: i64,
    pub formatted: String,
    pub is_expired: bool,
    pub is_urgent: bool,
}

impl From<TimeUntilDeadline> for CountdownResponse {
    fn from(t: TimeUntilDeadline) -> Self {
        let is_urgent = t.is_urgent();
        Self {
            hours: t.hours,
            minutes: t.minutes,
            formatted: t.formatted,
            is_expired: t.is_expired,
            is_urgent,
        }
    }
}

/// Reschedule request response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequestResponse {
    pub id: String,
    pub session_id: String,
    pub supporter_id: String,
    pub client_id: String,
    pub original_scheduled_at: String,
    pub proposed_scheduled_at: String,
    pub status: String,
    pub reason: Option<String>,
    pub response_deadline: String,
    pub created_at: String,
    pub responded_at: Option<String>,
    /// Whether the client can still accept or decline.
    pub actionable: bool,
    /// Present only while the request is actionable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<CountdownResponse>,
}

impl RescheduleRequestResponse {
    /// Build a response as of `now`.
    ///
    /// Accept/decline affordances are derived here and nowhere else: a
    /// request is actionable only while pending with time left on the clock.
    fn from_model(r: reschedule_request::Model, now: DateTime<Utc>) -> Self {
        let countdown = if r.status == RescheduleStatus::Pending {
            Some(time_until_deadline(r.response_deadline.into(), now))
        } else {
            None
        };
        let actionable = countdown.as_ref().is_some_and(|c| !c.is_expired);

        Self {
            id: r.id,
            session_id: r.session_id,
            supporter_id: r.supporter_id,
            client_id: r.client_id,
            original_scheduled_at: r.original_scheduled_at.to_rfc3339(),
            proposed_scheduled_at: r.proposed_scheduled_at.to_rfc3339(),
            status: match r.status {
                RescheduleStatus::Pending => "pending".to_string(),
                RescheduleStatus::Accepted => "accepted".to_string(),
                RescheduleStatus::Declined => "declined".to_string(),
                RescheduleStatus::Expired => "expired".to_string(),
                RescheduleStatus::AutoCancelled => "auto_cancelled".to_string(),
            },
            reason: r.reason,
            response_deadline: r.response_deadline.to_rfc3339(),
            created_at: r.created_at.to_rfc3339(),
            responded_at: r.responded_at.map(|dt| dt.to_rfc3339()),
            actionable,
            countdown: countdown.filter(|c| !c.is_expired).map(Into::into),
        }
    }
}

impl From<reschedule_request::Model> for RescheduleRequestResponse {
    fn from(r: reschedule_request::Model) -> Self {
        Self::from_model(r, Utc::now())
    }
}

/// Create reschedule request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRescheduleRequest {
    pub session_id: String,
    pub proposed_scheduled_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Show / accept / decline request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestIdRequest {
    pub request_id: String,
}

/// List requests.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRescheduleRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    20
}

/// Count response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub actionable: u64,
}

// ==================== Handlers ====================

/// Propose a reschedule as the supporter.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateRescheduleRequest>,
) -> AppResult<ApiResponse<RescheduleRequestResponse>> {
    let input = ProposeRescheduleInput {
        session_id: req.session_id,
        proposed_scheduled_at: req.proposed_scheduled_at,
        reason: req.reason,
    };

    let request = state.reschedule_service.propose(&user.id, input).await?;
    Ok(ApiResponse::ok(request.into()))
}

/// List requests the authenticated client can act on.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListRescheduleRequest>,
) -> AppResult<ApiResponse<Vec<RescheduleRequestResponse>>> {
    let limit = req.limit.min(100);
    let now = Utc::now();
    let requests = state
        .reschedule_service
        .list_actionable_for_client(&user.id, limit)
        .await?;

    // The query already excludes settled and expired requests; the filter
    // covers a deadline passing between the query and serialization.
    Ok(ApiResponse::ok(
        requests
            .into_iter()
            .map(|r| RescheduleRequestResponse::from_model(r, now))
            .filter(|r| r.actionable)
            .collect(),
    ))
}

/// List requests proposed by the authenticated supporter.
async fn sent(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListRescheduleRequest>,
) -> AppResult<ApiResponse<Vec<RescheduleRequestResponse>>> {
    let limit = req.limit.min(100);
    let requests = state
        .reschedule_service
        .list_for_supporter(&user.id, limit, req.offset)
        .await?;

    Ok(ApiResponse::ok(requests.into_iter().map(Into::into).collect()))
}

/// Show a single request (either party).
async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RequestIdRequest>,
) -> AppResult<ApiResponse<RescheduleRequestResponse>> {
    let request = state
        .reschedule_service
        .get_by_id_for_user(&req.request_id, &user.id)
        .await?;
    Ok(ApiResponse::ok(request.into()))
}

/// Accept a pending request as the client.
async fn accept(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RequestIdRequest>,
) -> AppResult<ApiResponse<RescheduleRequestResponse>> {
    let request = state
        .reschedule_service
        .accept(&req.request_id, &user.id)
        .await?;
    Ok(ApiResponse::ok(request.into()))
}

/// Decline a pending request as the client.
///
/// Irreversible; the client app asks for confirmation before calling this.
async fn decline(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RequestIdRequest>,
) -> AppResult<ApiResponse<RescheduleRequestResponse>> {
    let request = state
        .reschedule_service
        .decline(&req.request_id, &user.id)
        .await?;
    Ok(ApiResponse::ok(request.into()))
}

/// Count actionable requests for the authenticated client.
async fn count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<CountResponse>> {
    let actionable = state
        .reschedule_service
        .count_actionable_for_client(&user.id)
        .await?;
    Ok(ApiResponse::ok(CountResponse { actionable }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/list", post(list))
        .route("/sent", post(sent))
        .route("/show", post(show))
        .route("/accept", post(accept))
        .route("/decline", post(decline))
        .route("/count", post(count))
}
