//! Create `session` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Session::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Session::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Session::ClientId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Session::SupporterId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Session::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(Session::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Session::ScheduledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Session::DurationMinutes)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Session::PriceCents).big_integer().not_null())
                    .col(ColumnDef::new(Session::CancelReason).string_len(512))
                    .col(ColumnDef::new(Session::CancelledAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Session::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Session::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_client")
                            .from(Session::Table, Session::ClientId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_supporter")
                            .from(Session::Table, Session::SupporterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: client_id (listing a client's sessions)
        manager
            .create_index(
                Index::create()
                    .name("idx_session_client_id")
                    .table(Session::Table)
                    .col(Session::ClientId)
                    .to_owned(),
            )
            .await?;

        // Index: supporter_id (listing a supporter's sessions)
        manager
            .create_index(
                Index::create()
                    .name("idx_session_supporter_id")
                    .table(Session::Table)
                    .col(Session::SupporterId)
                    .to_owned(),
            )
            .await?;

        // Index: (status, scheduled_at) for upcoming-session queries
        manager
            .create_index(
                Index::create()
                    .name("idx_session_status_scheduled_at")
                    .table(Session::Table)
                    .col(Session::Status)
                    .col(Session::ScheduledAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Session::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Session {
    Table,
    Id,
    ClientId,
    SupporterId,
    Kind,
    Status,
    ScheduledAt,
    DurationMinutes,
    PriceCents,
    CancelReason,
    CancelledAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
