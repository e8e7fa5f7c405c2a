//! Support session entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Delivery channel of a session.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum SessionKind {
    #[sea_orm(string_value = "chat")]
    Chat,
    #[sea_orm(string_value = "phone")]
    Phone,
    #[sea_orm(string_value = "video")]
    Video,
}

/// Session lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum SessionStatus {
    /// Booked and waiting to take place.
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    /// Took place.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Cancelled before taking place.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// A booked session between a client and a supporter.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The client who booked the session.
    #[sea_orm(indexed)]
    pub client_id: String,

    /// The supporter providing the session.
    #[sea_orm(indexed)]
    pub supporter_id: String,

    /// Delivery channel.
    pub kind: SessionKind,

    /// Current status.
    pub status: SessionStatus,

    /// Agreed start time.
    #[sea_orm(indexed)]
    pub scheduled_at: DateTimeWithTimeZone,

    /// Booked length in minutes.
    pub duration_minutes: i32,

    /// Price paid by the client, in cents.
    pub price_cents: i64,

    /// Why the session was cancelled, if it was.
    #[sea_orm(nullable)]
    pub cancel_reason: Option<String>,

    /// When the session was cancelled, if it was.
    #[sea_orm(nullable)]
    pub cancelled_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ClientId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Client,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SupporterId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Supporter,
}

impl ActiveModelBehavior for ActiveModel {}
