//! Admin user entity model
//!
//! This module contains the SeaORM entity model for the admin_users table.
//! `tenant_id` is nullable: historically-imported users can be orphaned
//! until an operator reassigns them to a tenant.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

/// Admin user entity representing a tenant administrator
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "admin_users")]
pub struct Model {
    /// Unique identifier for the admin user (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Tenant this user administers (null while orphaned)
    pub tenant_id: Option<Uuid>,

    /// Display name for the user
    pub name: String,

    /// Email address (unique across the platform)
    pub email: String,

    /// Role label, e.g. "Admin"
    pub role: String,

    /// Identifiers of the locations this user can access (JSON array)
    #[sea_orm(column_type = "JsonBinary")]
    pub location_ids: JsonValue,

    /// Identifier of the user's credential in the identity service
    pub credential_uid: String,

    /// Whether the user must change their password on first login
    pub requires_password_change: bool,

    /// Timestamp when the user was created
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
