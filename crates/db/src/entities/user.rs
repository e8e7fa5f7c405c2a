//! User entity (clients and supporters).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Marketplace role of a user.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum UserRole {
    /// Books sessions and responds to reschedule proposals.
    #[sea_orm(string_value = "client")]
    Client,
    /// Provides sessions and proposes reschedules.
    #[sea_orm(string_value = "supporter")]
    Supporter,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    pub username_lower: String,

    /// Access token for bearer authentication
    #[sea_orm(unique, nullable)]
    pub token: Option<String>,

    /// Display name shown to the counterparty
    #[sea_orm(nullable)]
    pub display_name: Option<String>,

    /// Avatar URL
    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,

    /// Short profile text
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,

    /// Marketplace role
    pub role: UserRole,

    /// Is this account suspended?
    #[sea_orm(default_value = false)]
    pub is_suspended: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Name presented to the counterparty in notifications.
    #[must_use]
    pub fn presented_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}
