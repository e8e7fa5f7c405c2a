//! User service.

use chrono::Utc;
use peersup_common::{AppError, AppResult, IdGenerator};
use peersup_db::entities::user::{self, UserRole};
use peersup_db::repositories::UserRepository;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// Input for provisioning a user.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    pub role: UserRole,
    #[validate(length(max = 128))]
    pub display_name: Option<String>,
}

/// Service for user lookup and provisioning.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Authenticate a user by access token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if user.is_suspended {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Find a user by username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        self.user_repo.find_by_username(username).await
    }

    /// Provision a new user with a fresh access token.
    pub async fn create(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username is taken".to_string()));
        }

        let id = self.id_gen.generate();
        let token = self.id_gen.generate_token();
        let model = user::ActiveModel {
            id: Set(id),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            token: Set(Some(token)),
            display_name: Set(input.display_name),
            avatar_url: Set(None),
            bio: Set(None),
            role: Set(input.role),
            is_suspended: Set(false),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        self.user_repo.create(model).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_user(id: &str, suspended: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: "alice".to_string(),
            username_lower: "alice".to_string(),
            token: Some("token1".to_string()),
            display_name: Some("Alice".to_string()),
            avatar_url: None,
            bio: None,
            role: UserRole::Client,
            is_suspended: suspended,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_authenticate_by_token_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("user1", false)]])
                .into_connection(),
        );
        let service = UserService::new(UserRepository::new(db));

        let result = service.authenticate_by_token("token1").await.unwrap();
        assert_eq!(result.id, "user1");
    }

    #[tokio::test]
    async fn test_authenticate_by_token_rejects_suspended() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("user1", true)]])
                .into_connection(),
        );
        let service = UserService::new(UserRepository::new(db));

        let result = service.authenticate_by_token("token1").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_create_rejects_taken_username() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("user1", false)]])
                .into_connection(),
        );
        let service = UserService::new(UserRepository::new(db));

        let input = CreateUserInput {
            username: "alice".to_string(),
            role: UserRole::Client,
            display_name: None,
        };
        let result = service.create(input).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_presented_name_falls_back_to_username() {
        let mut user = test_user("user1", false);
        assert_eq!(user.presented_name(), "Alice");
        user.display_name = None;
        assert_eq!(user.presented_name(), "alice");
    }
}
