//! User endpoints.

use axum::{Json, Router, extract::State, routing::post};
use peersup_common::AppResult;
use peersup_db::entities::user::{self, UserRole};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Public user profile response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub role: String,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            display_name: u.display_name,
            avatar_url: u.avatar_url,
            bio: u.bio,
            role: match u.role {
                UserRole::Client => "client".to_string(),
                UserRole::Supporter => "supporter".to_string(),
            },
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

/// Show user request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowUserRequest {
    pub user_id: String,
}

/// Show a user's public profile.
async fn show(
    State(state): State<AppState>,
    Json(req): Json<ShowUserRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.user_service.get_by_id(&req.user_id).await?;
    Ok(ApiResponse::ok(user.into()))
}

/// Show the authenticated user.
async fn me(AuthUser(user): AuthUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok(user.into())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/show", post(show))
        .route("/me", post(me))
}
