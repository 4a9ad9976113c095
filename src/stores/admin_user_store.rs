//! Admin user store backed by SeaORM.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::json;
use uuid::Uuid;

use crate::models::admin_user;
use crate::retry::{RetryPolicy, with_retry};

use super::{AdminUserDraft, AdminUserStore, StoreError};

/// SeaORM-backed admin user persistence.
#[derive(Debug, Clone)]
pub struct SeaAdminUserStore {
    db: Arc<DatabaseConnection>,
    retry: RetryPolicy,
}

impl SeaAdminUserStore {
    pub fn new(db: Arc<DatabaseConnection>, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }

    /// Lists users with no tenant assignment, oldest first. These are the
    /// candidates for bulk reassignment.
    pub async fn list_orphaned(&self) -> Result<Vec<admin_user::Model>, StoreError> {
        admin_user::Entity::find()
            .filter(admin_user::Column::TenantId.is_null())
            .order_by_asc(admin_user::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl AdminUserStore for SeaAdminUserStore {
    async fn create(&self, draft: AdminUserDraft) -> Result<admin_user::Model, StoreError> {
        let row = admin_user::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(Some(draft.tenant_id)),
            name: Set(draft.name),
            email: Set(draft.email),
            role: Set(draft.role),
            location_ids: Set(json!(draft.location_ids)),
            credential_uid: Set(draft.credential_uid),
            requires_password_change: Set(true),
            created_at: Set(Utc::now().into()),
        };

        with_retry("admin_user.create", self.retry, || {
            let row = row.clone();
            let db = Arc::clone(&self.db);
            async move { row.insert(db.as_ref()).await }
        })
        .await
        .map_err(StoreError::from)
    }
}
