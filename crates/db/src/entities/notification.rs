//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification types.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum NotificationType {
    /// A supporter proposed a new time for a session.
    #[sea_orm(string_value = "rescheduleRequested")]
    RescheduleRequested,
    /// The client accepted a reschedule proposal.
    #[sea_orm(string_value = "rescheduleAccepted")]
    RescheduleAccepted,
    /// The client declined a reschedule proposal.
    #[sea_orm(string_value = "rescheduleDeclined")]
    RescheduleDeclined,
    /// A session was cancelled because the response deadline passed.
    #[sea_orm(string_value = "sessionAutoCancelled")]
    SessionAutoCancelled,
    /// A refund settled with the payment provider.
    #[sea_orm(string_value = "refundIssued")]
    RefundIssued,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user receiving the notification
    #[sea_orm(indexed)]
    pub recipient_id: String,

    /// The user whose action triggered the notification (absent for
    /// system-driven notifications)
    #[sea_orm(nullable)]
    pub actor_id: Option<String>,

    /// Notification type
    pub notification_type: NotificationType,

    /// Related session ID
    #[sea_orm(nullable)]
    pub session_id: Option<String>,

    /// Related reschedule request ID
    #[sea_orm(nullable)]
    pub reschedule_request_id: Option<String>,

    /// Type-specific payload (counterparty name, date/time strings)
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub body: Option<Json>,

    /// Has the recipient seen this notification?
    #[sea_orm(default_value = false)]
    pub is_read: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RecipientId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Recipient,
}

impl ActiveModelBehavior for ActiveModel {}
