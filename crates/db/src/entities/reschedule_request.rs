//! Reschedule request entity.
//!
//! A supporter's proposal to move a scheduled session to a new time. The
//! client must respond before `response_deadline`; an unanswered request is
//! closed by the deadline sweeper.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reschedule request lifecycle status.
///
/// `Pending` is the only non-terminal state. Every transition out of it
/// happens at most once.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum RescheduleStatus {
    /// Waiting for the client's response.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Client accepted; the session moved to the proposed time.
    #[sea_orm(string_value = "accepted")]
    Accepted,
    /// Client declined; the original time stands.
    #[sea_orm(string_value = "declined")]
    Declined,
    /// Deadline passed while the session no longer needed cancelling.
    #[sea_orm(string_value = "expired")]
    Expired,
    /// Deadline passed; the session was cancelled and the client refunded.
    #[sea_orm(string_value = "auto_cancelled")]
    AutoCancelled,
}

impl RescheduleStatus {
    /// Whether the request can still be acted on by the client.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        *self == Self::Pending
    }
}

/// A proposal to move a session to a new time.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reschedule_request")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The session being rescheduled.
    #[sea_orm(indexed)]
    pub session_id: String,

    /// The supporter who proposed the new time.
    pub supporter_id: String,

    /// The client who must accept or decline.
    #[sea_orm(indexed)]
    pub client_id: String,

    /// The session time before the proposal.
    pub original_scheduled_at: DateTimeWithTimeZone,

    /// The new time being proposed.
    pub proposed_scheduled_at: DateTimeWithTimeZone,

    /// Current status.
    pub status: RescheduleStatus,

    /// Supporter's stated justification.
    #[sea_orm(column_type = "Text", nullable)]
    pub reason: Option<String>,

    /// Hard cutoff for the client's response. Always strictly before
    /// `original_scheduled_at`.
    #[sea_orm(indexed)]
    pub response_deadline: DateTimeWithTimeZone,

    pub created_at: DateTimeWithTimeZone,

    /// Set iff the client acted explicitly (accepted or declined).
    #[sea_orm(nullable)]
    pub responded_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::session::Entity",
        from = "Column::SessionId",
        to = "super::session::Column::Id",
        on_delete = "Cascade"
    )]
    Session,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SupporterId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Supporter,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ClientId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Client,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
