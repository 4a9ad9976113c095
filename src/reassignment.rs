//! Bulk membership reassignment.
//!
//! Moves a batch of orphaned admin users into a target tenant. The
//! `tenant_id` update is one atomic batch inside a transaction; the
//! location backfill that follows is a best-effort per-user pass whose
//! failures are reported, never rolled back.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{admin_user, location, tenant};
use crate::retry::{RetryPolicy, with_retry};
use crate::saga::orchestrator::DEFAULT_LOCATION_NAME;

#[derive(Debug, Error)]
pub enum ReassignError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("target tenant not found: {0}")]
    TenantNotFound(Uuid),
    #[error("datastore unavailable: {0}")]
    Unavailable(String),
}

/// Result of one reassignment call. `backfill_errors` holds per-user
/// failures from the location pass; the tenant update itself is
/// all-or-nothing.
#[derive(Debug, Clone)]
pub struct ReassignmentOutcome {
    pub updated_count: u64,
    pub locations_backfilled: u32,
    pub backfill_errors: Vec<String>,
}

/// Operator-facing batch reassignment over the datastore.
#[derive(Debug, Clone)]
pub struct ReassignmentService {
    db: Arc<DatabaseConnection>,
    retry: RetryPolicy,
}

impl ReassignmentService {
    pub fn new(db: Arc<DatabaseConnection>, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }

    pub async fn reassign(
        &self,
        user_ids: &[Uuid],
        target_tenant_id: Uuid,
    ) -> Result<ReassignmentOutcome, ReassignError> {
        if user_ids.is_empty() {
            return Err(ReassignError::Validation(
                "user id set must not be empty".to_string(),
            ));
        }
        if target_tenant_id.is_nil() {
            return Err(ReassignError::Validation(
                "target tenant id must not be nil".to_string(),
            ));
        }

        let unique_ids: Vec<Uuid> = user_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let target = tenant::Entity::find_by_id(target_tenant_id)
            .one(self.db.as_ref())
            .await
            .map_err(|err| ReassignError::Unavailable(err.to_string()))?;
        if target.is_none() {
            return Err(ReassignError::TenantNotFound(target_tenant_id));
        }

        let updated_count = with_retry("reassignment.update_tenant", self.retry, || {
            let db = Arc::clone(&self.db);
            let ids = unique_ids.clone();
            async move {
                let txn = db.begin().await?;
                let result = admin_user::Entity::update_many()
                    .col_expr(admin_user::Column::TenantId, Expr::value(target_tenant_id))
                    .filter(admin_user::Column::Id.is_in(ids))
                    .exec(&txn)
                    .await?;
                txn.commit().await?;
                Ok::<u64, sea_orm::DbErr>(result.rows_affected)
            }
        })
        .await
        .map_err(|err| ReassignError::Unavailable(err.to_string()))?;

        counter!("reassignment_users_total").increment(updated_count);
        info!(
            target_tenant_id = %target_tenant_id,
            requested = unique_ids.len(),
            updated_count,
            "Reassigned users to tenant"
        );

        let mut outcome = ReassignmentOutcome {
            updated_count,
            locations_backfilled: 0,
            backfill_errors: Vec::new(),
        };

        // Best-effort pass; the batch above is already committed.
        let default_location = match self.find_or_create_default_location(target_tenant_id).await {
            Ok(location) => location,
            Err(err) => {
                warn!(
                    target_tenant_id = %target_tenant_id,
                    error = %err,
                    "Default location unavailable, skipping location backfill"
                );
                outcome
                    .backfill_errors
                    .push(format!("default location: {err}"));
                return Ok(outcome);
            }
        };

        for user_id in &unique_ids {
            match self.backfill_location(*user_id, default_location.id).await {
                Ok(true) => outcome.locations_backfilled += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(user_id = %user_id, error = %err, "Location backfill failed for user");
                    outcome.backfill_errors.push(format!("{user_id}: {err}"));
                }
            }
        }

        Ok(outcome)
    }

    async fn find_or_create_default_location(
        &self,
        tenant_id: Uuid,
    ) -> Result<location::Model, sea_orm::DbErr> {
        if let Some(existing) = location::Entity::find()
            .filter(location::Column::TenantId.eq(tenant_id))
            .filter(location::Column::IsDefault.eq(true))
            .one(self.db.as_ref())
            .await?
        {
            return Ok(existing);
        }

        let row = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            name: Set(DEFAULT_LOCATION_NAME.to_string()),
            is_default: Set(true),
            created_at: Set(Utc::now().into()),
        };
        row.insert(self.db.as_ref()).await
    }

    /// Assigns the default location to a user whose location set is empty.
    /// Returns whether a backfill was written.
    async fn backfill_location(
        &self,
        user_id: Uuid,
        location_id: Uuid,
    ) -> Result<bool, sea_orm::DbErr> {
        let Some(user) = admin_user::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
        else {
            return Ok(false);
        };

        let has_locations = user
            .location_ids
            .as_array()
            .is_some_and(|ids| !ids.is_empty());
        if has_locations {
            return Ok(false);
        }

        let mut row: admin_user::ActiveModel = user.into();
        row.location_ids = Set(json!([location_id]));
        row.update(self.db.as_ref()).await?;
        Ok(true)
    }
}
