//! Location store backed by SeaORM.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

use crate::models::location;
use crate::retry::{RetryPolicy, with_retry};

use super::{LocationStore, StoreError};

/// SeaORM-backed location persistence.
#[derive(Debug, Clone)]
pub struct SeaLocationStore {
    db: Arc<DatabaseConnection>,
    retry: RetryPolicy,
}

impl SeaLocationStore {
    pub fn new(db: Arc<DatabaseConnection>, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }
}

#[async_trait]
impl LocationStore for SeaLocationStore {
    async fn create_default(
        &self,
        tenant_id: Uuid,
        name: &str,
    ) -> Result<location::Model, StoreError> {
        let row = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            name: Set(name.to_string()),
            is_default: Set(true),
            created_at: Set(Utc::now().into()),
        };

        with_retry("location.create_default", self.retry, || {
            let row = row.clone();
            let db = Arc::clone(&self.db);
            async move { row.insert(db.as_ref()).await }
        })
        .await
        .map_err(StoreError::from)
    }
}
