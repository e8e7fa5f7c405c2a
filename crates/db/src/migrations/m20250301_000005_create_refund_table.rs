//! Create `refund` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Refund::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Refund::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Refund::SessionId).string_len(32).not_null())
                    .col(ColumnDef::new(Refund::ClientId).string_len(32).not_null())
                    .col(ColumnDef::new(Refund::AmountCents).big_integer().not_null())
                    .col(ColumnDef::new(Refund::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Refund::ProviderRef).string_len(128))
                    .col(ColumnDef::new(Refund::FailureReason).string_len(512))
                    .col(
                        ColumnDef::new(Refund::AttemptCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Refund::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Refund::IssuedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_refund_session")
                            .from(Refund::Table, Refund::SessionId)
                            .to(Session::Table, Session::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_refund_client")
                            .from(Refund::Table, Refund::ClientId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one refund per session
        manager
            .create_index(
                Index::create()
                    .name("idx_refund_session_id")
                    .table(Refund::Table)
                    .col(Refund::SessionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: status (for the settlement sweeper)
        manager
            .create_index(
                Index::create()
                    .name("idx_refund_status")
                    .table(Refund::Table)
                    .col(Refund::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Refund::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Refund {
    Table,
    Id,
    SessionId,
    ClientId,
    AmountCents,
    Status,
    ProviderRef,
    FailureReason,
    AttemptCount,
    CreatedAt,
    IssuedAt,
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
