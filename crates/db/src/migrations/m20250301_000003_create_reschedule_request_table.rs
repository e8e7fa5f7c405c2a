//! Create `reschedule_request` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RescheduleRequest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RescheduleRequest::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RescheduleRequest::SessionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RescheduleRequest::SupporterId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RescheduleRequest::ClientId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RescheduleRequest::OriginalScheduledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RescheduleRequest::ProposedScheduledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RescheduleRequest::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RescheduleRequest::Reason).text())
                    .col(
                        ColumnDef::new(RescheduleRequest::ResponseDeadline)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RescheduleRequest::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RescheduleRequest::RespondedAt)
                            .timestamp_with_time_zone(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reschedule_request_session")
                            .from(RescheduleRequest::Table, RescheduleRequest::SessionId)
                            .to(Session::Table, Session::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reschedule_request_supporter")
                            .from(RescheduleRequest::Table, RescheduleRequest::SupporterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reschedule_request_client")
                            .from(RescheduleRequest::Table, RescheduleRequest::ClientId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: client_id (listing actionable requests for a client)
        manager
            .create_index(
                Index::create()
                    .name("idx_reschedule_request_client_id")
                    .table(RescheduleRequest::Table)
                    .col(RescheduleRequest::ClientId)
                    .to_owned(),
            )
            .await?;

        // Index: (status, response_deadline) for the deadline sweeper
        manager
            .create_index(
                Index::create()
                    .name("idx_reschedule_request_status_deadline")
                    .table(RescheduleRequest::Table)
                    .col(RescheduleRequest::Status)
                    .col(RescheduleRequest::ResponseDeadline)
                    .to_owned(),
            )
            .await?;

        // Partial unique index: at most one pending request per session.
        // sea-query has no builder support for partial indexes, so raw SQL.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_reschedule_request_pending_session \
                 ON \"reschedule_request\" (\"session_id\") WHERE \"status\" = 'pending'",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RescheduleRequest::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RescheduleRequest {
    Table,
    Id,
    SessionId,
    SupporterId,
    ClientId,
    OriginalScheduledAt,
    ProposedScheduledAt,
    Status,
    Reason,
    ResponseDeadline,
    CreatedAt,
    RespondedAt,
}

#[derive(Iden)]
enum Session {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
