//! Integration tests for bulk membership reassignment against an in-memory
//! SQLite database with the real migrations applied.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde_json::json;
use uuid::Uuid;

use provisioning::migration::{Migrator, MigratorTrait};
use provisioning::models::{admin_user, location, tenant};
use provisioning::reassignment::{ReassignError, ReassignmentService};
use provisioning::retry::RetryPolicy;
use provisioning::stores::SeaAdminUserStore;

async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect to in-memory sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

fn service(db: &DatabaseConnection) -> ReassignmentService {
    ReassignmentService::new(Arc::new(db.clone()), RetryPolicy::default())
}

async fn insert_tenant(db: &DatabaseConnection, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    tenant::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        course_ids: Set(json!(["c1"])),
        max_users: Set(25),
        is_trial: Set(false),
        trial_ends_at: Set(None),
        sale_amount: Set(0.0),
        revenue_share: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("insert tenant");
    id
}

async fn insert_user(
    db: &DatabaseConnection,
    email: &str,
    tenant_id: Option<Uuid>,
    location_ids: serde_json::Value,
) -> Uuid {
    let id = Uuid::new_v4();
    admin_user::ActiveModel {
        id: Set(id),
        tenant_id: Set(tenant_id),
        name: Set("Test User".to_string()),
        email: Set(email.to_string()),
        role: Set("Admin".to_string()),
        location_ids: Set(location_ids),
        credential_uid: Set(format!("uid-{id}")),
        requires_password_change: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("insert admin user");
    id
}

async fn fetch_user(db: &DatabaseConnection, id: Uuid) -> admin_user::Model {
    admin_user::Entity::find_by_id(id)
        .one(db)
        .await
        .expect("query user")
        .expect("user exists")
}

#[tokio::test]
async fn reassigns_users_and_backfills_missing_locations() {
    let db = setup_db().await;
    let target = insert_tenant(&db, "Target Brand").await;

    let u1 = insert_user(&db, "u1@test.dev", None, json!([])).await;
    let existing_location = Uuid::new_v4();
    let u2 = insert_user(&db, "u2@test.dev", None, json!([existing_location])).await;

    let outcome = service(&db)
        .reassign(&[u1, u2], target)
        .await
        .expect("reassign succeeds");

    assert_eq!(outcome.updated_count, 2);
    assert_eq!(outcome.locations_backfilled, 1);
    assert!(outcome.backfill_errors.is_empty());

    let u1 = fetch_user(&db, u1).await;
    let u2 = fetch_user(&db, u2).await;
    assert_eq!(u1.tenant_id, Some(target));
    assert_eq!(u2.tenant_id, Some(target));

    // Only the user without a location got a backfill.
    let u1_locations = u1.location_ids.as_array().unwrap();
    assert_eq!(u1_locations.len(), 1);
    assert_eq!(
        u2.location_ids,
        json!([existing_location]),
        "existing location assignment is untouched"
    );

    // The backfilled id points at the tenant's default location.
    let default_location = location::Entity::find()
        .filter(location::Column::TenantId.eq(target))
        .filter(location::Column::IsDefault.eq(true))
        .one(&db)
        .await
        .unwrap()
        .expect("default location created");
    assert_eq!(u1_locations[0], json!(default_location.id));
}

#[tokio::test]
async fn reuses_existing_default_location() {
    let db = setup_db().await;
    let target = insert_tenant(&db, "Target Brand").await;

    let existing = location::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(target),
        name: Set("Main Location".to_string()),
        is_default: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(&db)
    .await
    .unwrap();

    let user = insert_user(&db, "u@test.dev", None, json!([])).await;
    let outcome = service(&db).reassign(&[user], target).await.unwrap();
    assert_eq!(outcome.locations_backfilled, 1);

    let locations = location::Entity::find()
        .filter(location::Column::TenantId.eq(target))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(locations.len(), 1, "no second default location created");

    let user = fetch_user(&db, user).await;
    assert_eq!(user.location_ids, json!([existing.id]));
}

#[tokio::test]
async fn duplicate_ids_in_request_are_collapsed() {
    let db = setup_db().await;
    let target = insert_tenant(&db, "Target Brand").await;
    let user = insert_user(&db, "u@test.dev", None, json!([])).await;

    let outcome = service(&db)
        .reassign(&[user, user, user], target)
        .await
        .unwrap();

    assert_eq!(outcome.updated_count, 1);
    assert_eq!(outcome.locations_backfilled, 1);
}

#[tokio::test]
async fn empty_user_set_is_rejected_before_any_write() {
    let db = setup_db().await;
    let target = insert_tenant(&db, "Target Brand").await;

    let err = service(&db).reassign(&[], target).await.unwrap_err();
    assert!(matches!(err, ReassignError::Validation(_)));
}

#[tokio::test]
async fn nil_target_tenant_is_rejected() {
    let db = setup_db().await;
    let user = insert_user(&db, "u@test.dev", None, json!([])).await;

    let err = service(&db)
        .reassign(&[user], Uuid::nil())
        .await
        .unwrap_err();
    assert!(matches!(err, ReassignError::Validation(_)));

    let user = fetch_user(&db, user).await;
    assert_eq!(user.tenant_id, None, "no write happened");
}

#[tokio::test]
async fn unknown_target_tenant_is_rejected() {
    let db = setup_db().await;
    let user = insert_user(&db, "u@test.dev", None, json!([])).await;

    let missing = Uuid::new_v4();
    let err = service(&db).reassign(&[user], missing).await.unwrap_err();
    assert!(matches!(err, ReassignError::TenantNotFound(id) if id == missing));
}

#[tokio::test]
async fn unknown_user_ids_do_not_fail_the_batch() {
    let db = setup_db().await;
    let target = insert_tenant(&db, "Target Brand").await;
    let user = insert_user(&db, "u@test.dev", None, json!([])).await;

    let outcome = service(&db)
        .reassign(&[user, Uuid::new_v4()], target)
        .await
        .unwrap();

    assert_eq!(outcome.updated_count, 1);
    let user = fetch_user(&db, user).await;
    assert_eq!(user.tenant_id, Some(target));
}

#[tokio::test]
async fn orphaned_user_listing_only_returns_unassigned_users() {
    let db = setup_db().await;
    let tenant_id = insert_tenant(&db, "Existing Brand").await;

    let orphan = insert_user(&db, "orphan@test.dev", None, json!([])).await;
    insert_user(&db, "assigned@test.dev", Some(tenant_id), json!([])).await;

    let store = SeaAdminUserStore::new(Arc::new(db.clone()), RetryPolicy::default());
    let orphans = store.list_orphaned().await.unwrap();

    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].id, orphan);
}
