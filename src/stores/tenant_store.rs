//! Tenant store backed by SeaORM.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde_json::json;
use uuid::Uuid;

use crate::models::tenant;
use crate::retry::{RetryPolicy, with_retry};

use super::{StoreError, TenantDraft, TenantStore, revenue_share_json};

/// SeaORM-backed tenant persistence.
#[derive(Debug, Clone)]
pub struct SeaTenantStore {
    db: Arc<DatabaseConnection>,
    retry: RetryPolicy,
}

impl SeaTenantStore {
    pub fn new(db: Arc<DatabaseConnection>, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }

    /// Lists all tenants, newest first. Used by the operator back office.
    pub async fn list(&self) -> Result<Vec<tenant::Model>, StoreError> {
        tenant::Entity::find()
            .order_by_desc(tenant::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(StoreError::from)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<tenant::Model>, StoreError> {
        tenant::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl TenantStore for SeaTenantStore {
    async fn create(&self, draft: TenantDraft) -> Result<tenant::Model, StoreError> {
        let revenue_share = revenue_share_json(&draft.revenue_share)?;
        let row = tenant::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(draft.name),
            course_ids: Set(json!(draft.course_ids)),
            max_users: Set(draft.max_users),
            is_trial: Set(draft.is_trial),
            trial_ends_at: Set(draft.trial_ends_at),
            sale_amount: Set(draft.sale_amount),
            revenue_share: Set(revenue_share),
            created_at: Set(Utc::now().into()),
        };

        with_retry("tenant.create", self.retry, || {
            let row = row.clone();
            let db = Arc::clone(&self.db);
            async move { row.insert(db.as_ref()).await }
        })
        .await
        .map_err(StoreError::from)
    }

    /// Deletes a tenant; locations cascade at the database level. Deleting an
    /// already-deleted tenant is a no-op, so compensation stays idempotent.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        with_retry("tenant.delete", self.retry, || {
            let db = Arc::clone(&self.db);
            async move {
                tenant::Entity::delete_by_id(id)
                    .exec(db.as_ref())
                    .await
                    .map(|_| ())
            }
        })
        .await
        .map_err(StoreError::from)
    }
}
