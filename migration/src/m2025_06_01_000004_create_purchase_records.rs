//! Migration to create the purchase_records table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PurchaseRecords::TenantId).uuid().not_null())
                    .col(
                        ColumnDef::new(PurchaseRecords::AdminUserId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseRecords::AmountPaid)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseRecords::PaymentRef).text().null())
                    .col(ColumnDef::new(PurchaseRecords::ProgramId).text().not_null())
                    .col(
                        ColumnDef::new(PurchaseRecords::ProgramTitle)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseRecords::CourseIds)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseRecords::CourseTitles)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseRecords::RevenueShare)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_records_tenant_id")
                    .table(PurchaseRecords::Table)
                    .col(PurchaseRecords::TenantId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PurchaseRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PurchaseRecords {
    Table,
    Id,
    TenantId,
    AdminUserId,
    AmountPaid,
    PaymentRef,
    ProgramId,
    ProgramTitle,
    CourseIds,
    CourseTitles,
    RevenueShare,
    CreatedAt,
}
