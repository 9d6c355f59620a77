//! Initial schema: records and their named fields.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_records(manager).await?;
        self.create_record_fields(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RecordFields::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Records::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_records(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Records::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Records::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Records::Title).string().not_null())
                    .col(
                        ColumnDef::new(Records::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Records::ModifiedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Records::SyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Sync passes walk records oldest-modified first
        manager
            .create_index(
                Index::create()
                    .name("idx_records_modified_at")
                    .table(Records::Table)
                    .col(Records::ModifiedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_record_fields(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RecordFields::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RecordFields::RecordId).uuid().not_null())
                    .col(ColumnDef::new(RecordFields::Name).string().not_null())
                    .col(ColumnDef::new(RecordFields::Value).json().not_null())
                    .col(
                        ColumnDef::new(RecordFields::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(RecordFields::RecordId)
                            .col(RecordFields::Name),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_record_fields_record")
                            .from(RecordFields::Table, RecordFields::RecordId)
                            .to(Records::Table, Records::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Records {
    Table,
    Id,
    Title,
    CreatedAt,
    ModifiedAt,
    SyncedAt,
}

#[derive(DeriveIden)]
enum RecordFields {
    Table,
    RecordId,
    Name,
    Value,
    UpdatedAt,
}
