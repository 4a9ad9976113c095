//! Migration to create the admin_users table.
//!
//! Admin users reference the tenant they administer. `tenant_id` is nullable
//! because historically-imported users can be orphaned until an operator
//! reassigns them; provisioning itself always writes a tenant id.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AdminUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdminUsers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AdminUsers::TenantId).uuid().null())
                    .col(ColumnDef::new(AdminUsers::Name).text().not_null())
                    .col(ColumnDef::new(AdminUsers::Email).text().not_null())
                    .col(ColumnDef::new(AdminUsers::Role).text().not_null())
                    .col(
                        ColumnDef::new(AdminUsers::LocationIds)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AdminUsers::CredentialUid)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AdminUsers::RequiresPasswordChange)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(AdminUsers::CreatedAt)
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
                    .name("idx_admin_users_tenant_id")
                    .table(AdminUsers::Table)
                    .col(AdminUsers::TenantId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_admin_users_email")
                    .table(AdminUsers::Table)
                    .col(AdminUsers::Email)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AdminUsers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AdminUsers {
    Table,
    Id,
    TenantId,
    Name,
    Email,
    Role,
    LocationIds,
    CredentialUid,
    RequiresPasswordChange,
    CreatedAt,
}
