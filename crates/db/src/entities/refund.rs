//! Refund entity.
//!
//! A refund row is inserted in the same transaction as the session
//! cancellation it compensates, so a cancelled session and its refund are
//! never observable apart. Settlement with the payment provider happens
//! afterwards and is tracked through `status`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Refund settlement status.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum RefundStatus {
    /// Recorded, not yet settled with the payment provider.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Settled with the payment provider.
    #[sea_orm(string_value = "issued")]
    Issued,
    /// Last settlement attempt failed; retried by the sweeper.
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// A full refund owed to a client for a cancelled session.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "refund")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The cancelled session being refunded.
    #[sea_orm(indexed)]
    pub session_id: String,

    /// The client being refunded.
    #[sea_orm(indexed)]
    pub client_id: String,

    /// Amount in cents (the full session price).
    pub amount_cents: i64,

    /// Settlement status.
    pub status: RefundStatus,

    /// Payment provider receipt reference, once issued.
    #[sea_orm(nullable)]
    pub provider_ref: Option<String>,

    /// Why the last settlement attempt failed, if it did.
    #[sea_orm(nullable)]
    pub failure_reason: Option<String>,

    /// Number of settlement attempts so far.
    #[sea_orm(default_value = 0)]
    pub attempt_count: i32,

    pub created_at: DateTimeWithTimeZone,

    /// When the refund settled, if it has.
    #[sea_orm(nullable)]
    pub issued_at: Option<DateTimeWithTimeZone>,
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
        from = "Column::ClientId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Client,
}

impl ActiveModelBehavior for ActiveModel {}
