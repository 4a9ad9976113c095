//! Tenant entity model
//!
//! This module contains the SeaORM entity model for the tenants table. A
//! tenant (brand) is the unit of isolation created by every provisioning
//! flow; it owns locations, admin users, and purchase records.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

/// Tenant entity representing a provisioned brand
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    /// Unique identifier for the tenant (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name for the tenant
    pub name: String,

    /// Identifiers of the courses assigned to this tenant (JSON array)
    #[sea_orm(column_type = "JsonBinary")]
    pub course_ids: JsonValue,

    /// Seat limit for the tenant
    pub max_users: i32,

    /// Whether this tenant was created through the free-trial flow
    pub is_trial: bool,

    /// Trial expiry instant (trial tenants only)
    pub trial_ends_at: Option<DateTimeWithTimeZone>,

    /// Amount paid at checkout; zero for trials and public signups
    pub sale_amount: f64,

    /// Revenue-share terms attached to the sale (JSON array, optional)
    #[sea_orm(column_type = "JsonBinary")]
    pub revenue_share: Option<JsonValue>,

    /// Timestamp when the tenant was created
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::location::Entity")]
    Location,
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
