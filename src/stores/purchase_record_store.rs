//! Purchase record store backed by SeaORM.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::json;
use uuid::Uuid;

use crate::models::purchase_record;
use crate::retry::{RetryPolicy, with_retry};

use super::{PurchaseRecordDraft, PurchaseRecordStore, StoreError, revenue_share_json};

/// SeaORM-backed purchase record persistence.
#[derive(Debug, Clone)]
pub struct SeaPurchaseRecordStore {
    db: Arc<DatabaseConnection>,
    retry: RetryPolicy,
}

impl SeaPurchaseRecordStore {
    pub fn new(db: Arc<DatabaseConnection>, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }
}

#[async_trait]
impl PurchaseRecordStore for SeaPurchaseRecordStore {
    async fn create(
        &self,
        draft: PurchaseRecordDraft,
    ) -> Result<purchase_record::Model, StoreError> {
        let revenue_share = revenue_share_json(&draft.revenue_share)?;
        let row = purchase_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(draft.tenant_id),
            admin_user_id: Set(draft.admin_user_id),
            amount_paid: Set(draft.amount_paid),
            payment_ref: Set(draft.payment_ref),
            program_id: Set(draft.program_id),
            program_title: Set(draft.program_title),
            course_ids: Set(json!(draft.course_ids)),
            course_titles: Set(json!(draft.course_titles)),
            revenue_share: Set(revenue_share),
            created_at: Set(Utc::now().into()),
        };

        with_retry("purchase_record.create", self.retry, || {
            let row = row.clone();
            let db = Arc::clone(&self.db);
            async move { row.insert(db.as_ref()).await }
        })
        .await
        .map_err(StoreError::from)
    }
}
