//! Purchase record entity model
//!
//! This module contains the SeaORM entity model for the purchase_records
//! table, the audit trail written by the paid-checkout flow.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

/// Purchase record entity capturing what was sold and to whom
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "purchase_records")]
pub struct Model {
    /// Unique identifier for the purchase record (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Tenant created by the sale
    pub tenant_id: Uuid,

    /// Admin user created by the sale
    pub admin_user_id: Uuid,

    /// Amount paid at checkout
    pub amount_paid: f64,

    /// External payment reference (optional)
    pub payment_ref: Option<String>,

    /// Identifier of the purchased program in the catalog
    pub program_id: String,

    /// Program title captured at purchase time
    pub program_title: String,

    /// Course identifiers included in the program (JSON array)
    #[sea_orm(column_type = "JsonBinary")]
    pub course_ids: JsonValue,

    /// Course titles captured at purchase time (JSON array)
    #[sea_orm(column_type = "JsonBinary")]
    pub course_titles: JsonValue,

    /// Revenue-share terms attached to the sale (JSON array, optional)
    #[sea_orm(column_type = "JsonBinary")]
    pub revenue_share: Option<JsonValue>,

    /// Timestamp when the record was created
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
