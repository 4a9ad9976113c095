//! # Datastore Access
//!
//! Store traits consumed by the provisioning saga, plus their SeaORM
//! implementations. The saga only sees the traits, so its control flow can
//! be tested against scripted fakes without a database.
//!
//! Every write goes through the bounded-backoff retry wrapper; a store error
//! surfacing from these traits means retries have already been exhausted.

use async_trait::async_trait;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{admin_user, location, purchase_record, tenant};

pub mod admin_user_store;
pub mod location_store;
pub mod purchase_record_store;
pub mod tenant_store;

pub use admin_user_store::SeaAdminUserStore;
pub use location_store::SeaLocationStore;
pub use purchase_record_store::SeaPurchaseRecordStore;
pub use tenant_store::SeaTenantStore;

/// Errors surfaced by store operations after retries are exhausted.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("datastore unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::RecordNotFound(record) => Self::NotFound(record),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// A single partner's cut of a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RevenueShareTerm {
    /// Opaque reference to the revenue-share partner
    pub partner_ref: String,
    /// Percentage of the sale owed to the partner (0.0 to 100.0)
    pub percent: f64,
}

pub(crate) fn revenue_share_json(
    terms: &Option<Vec<RevenueShareTerm>>,
) -> Result<Option<JsonValue>, StoreError> {
    terms
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|err| StoreError::Unavailable(format!("failed to encode revenue share: {err}")))
}

/// Everything needed to insert a tenant row.
#[derive(Debug, Clone)]
pub struct TenantDraft {
    pub name: String,
    pub course_ids: Vec<String>,
    pub max_users: i32,
    pub is_trial: bool,
    pub trial_ends_at: Option<DateTimeWithTimeZone>,
    pub sale_amount: f64,
    pub revenue_share: Option<Vec<RevenueShareTerm>>,
}

/// Everything needed to insert an admin user row.
#[derive(Debug, Clone)]
pub struct AdminUserDraft {
    pub tenant_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub location_ids: Vec<Uuid>,
    pub credential_uid: String,
}

/// Everything needed to insert a purchase record row.
#[derive(Debug, Clone)]
pub struct PurchaseRecordDraft {
    pub tenant_id: Uuid,
    pub admin_user_id: Uuid,
    pub amount_paid: f64,
    pub payment_ref: Option<String>,
    pub program_id: String,
    pub program_title: String,
    pub course_ids: Vec<String>,
    pub course_titles: Vec<String>,
    pub revenue_share: Option<Vec<RevenueShareTerm>>,
}

/// Tenant persistence as seen by the saga: creation, plus deletion for
/// compensating a partially-provisioned run.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn create(&self, draft: TenantDraft) -> Result<tenant::Model, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Location persistence as seen by the saga.
#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn create_default(
        &self,
        tenant_id: Uuid,
        name: &str,
    ) -> Result<location::Model, StoreError>;
}

/// Admin user persistence as seen by the saga.
#[async_trait]
pub trait AdminUserStore: Send + Sync {
    async fn create(&self, draft: AdminUserDraft) -> Result<admin_user::Model, StoreError>;
}

/// Purchase record persistence as seen by the saga.
#[async_trait]
pub trait PurchaseRecordStore: Send + Sync {
    async fn create(
        &self,
        draft: PurchaseRecordDraft,
    ) -> Result<purchase_record::Model, StoreError>;
}
