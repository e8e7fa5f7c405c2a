//! Session service.

use chrono::{DateTime, Utc};
use peersup_common::{AppError, AppResult, IdGenerator};
use peersup_db::entities::session::{self, SessionKind, SessionStatus};
use peersup_db::entities::user::UserRole;
use peersup_db::repositories::{SessionRepository, UserRepository};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// Shortest bookable session.
const MIN_DURATION_MINUTES: i32 = 15;

/// Longest bookable session.
const MAX_DURATION_MINUTES: i32 = 240;

/// Input for booking a session.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionInput {
    pub supporter_id: String,
    pub kind: SessionKind,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    #[validate(range(min = 0))]
    pub price_cents: i64,
}

/// Service for managing sessions.
#[derive(Clone)]
pub struct SessionService {
    session_repo: SessionRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl SessionService {
    /// Create a new session service.
    #[must_use]
    pub fn new(session_repo: SessionRepository, user_repo: UserRepository) -> Self {
        Self {
            session_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a session by ID, restricted to its two parties.
    pub async fn get_by_id_for_user(
        &self,
        id: &str,
        user_id: &str,
    ) -> AppResult<session::Model> {
        let session = self.session_repo.get_by_id(id).await?;

        if session.client_id != user_id && session.supporter_id != user_id {
            return Err(AppError::Forbidden(
                "Not a party to this session".to_string(),
            ));
        }

        Ok(session)
    }

    /// List sessions where the user is either party.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<session::Model>> {
        self.session_repo.find_for_user(user_id, limit, offset).await
    }

    /// List upcoming scheduled sessions for a user.
    pub async fn list_upcoming_for_user(
        &self,
        user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<session::Model>> {
        self.session_repo
            .find_upcoming_for_user(user_id, Utc::now(), limit)
            .await
    }

    /// Book a session with a supporter.
    pub async fn create(
        &self,
        client_id: &str,
        input: CreateSessionInput,
    ) -> AppResult<session::Model> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if input.duration_minutes < MIN_DURATION_MINUTES
            || input.duration_minutes > MAX_DURATION_MINUTES
        {
            return Err(AppError::Validation(format!(
                "Session length must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes"
            )));
        }

        let client = self.user_repo.get_by_id(client_id).await?;
        if client.role != UserRole::Client {
            return Err(AppError::Forbidden(
                "Only clients can book sessions".to_string(),
            ));
        }

        let supporter = self.user_repo.get_by_id(&input.supporter_id).await?;
        if supporter.role != UserRole::Supporter {
            return Err(AppError::Validation(
                "Sessions can only be booked with supporters".to_string(),
            ));
        }
        if supporter.is_suspended {
            return Err(AppError::Validation(
                "This supporter is not currently available".to_string(),
            ));
        }

        let now = Utc::now();
        if input.scheduled_at <= now {
            return Err(AppError::Validation(
                "Session time must be in the future".to_string(),
            ));
        }

        let id = self.id_gen.generate();
        let model = session::ActiveModel {
            id: Set(id),
            client_id: Set(client.id),
            supporter_id: Set(supporter.id),
            kind: Set(input.kind),
            status: Set(SessionStatus::Scheduled),
            scheduled_at: Set(input.scheduled_at.into()),
            duration_minutes: Set(input.duration_minutes),
            price_cents: Set(input.price_cents),
            cancel_reason: Set(None),
            cancelled_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        self.session_repo.create(model).await
    }

    /// Cancel a scheduled session as one of its parties.
    pub async fn cancel(
        &self,
        session_id: &str,
        user_id: &str,
        reason: &str,
    ) -> AppResult<()> {
        let session = self.get_by_id_for_user(session_id, user_id).await?;

        if session.status != SessionStatus::Scheduled {
            return Err(AppError::Conflict(
                "Session is no longer scheduled".to_string(),
            ));
        }

        self.session_repo
            .mark_cancelled(&session.id, reason, Utc::now())
            .await
    }

    /// Mark a session as completed, as its supporter.
    pub async fn complete(&self, session_id: &str, supporter_id: &str) -> AppResult<()> {
        let session = self.session_repo.get_by_id(session_id).await?;

        if session.supporter_id != supporter_id {
            return Err(AppError::Forbidden(
                "Not the supporter of this session".to_string(),
            ));
        }

        self.session_repo
            .mark_completed(&session.id, Utc::now())
            .await
    }
}
