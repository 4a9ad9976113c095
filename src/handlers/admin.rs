//! # Back-Office Handlers
//!
//! Operator-facing endpoints: list orphaned users, list candidate target
//! tenants, and run a bulk reassignment. All routes here sit behind the
//! operator bearer middleware.

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::OperatorAuth;
use crate::error::ApiError;
use crate::models::{admin_user, tenant};
use crate::server::AppState;

use super::ApiResponse;

/// Orphaned user summary
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrphanedUserDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

impl From<admin_user::Model> for OrphanedUserDto {
    fn from(user: admin_user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Candidate target tenant summary
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantSummaryDto {
    pub id: Uuid,
    pub name: String,
    pub is_trial: bool,
    pub max_users: i32,
    pub created_at: String,
}

impl From<tenant::Model> for TenantSummaryDto {
    fn from(t: tenant::Model) -> Self {
        Self {
            id: t.id,
            name: t.name,
            is_trial: t.is_trial,
            max_users: t.max_users,
            created_at: t.created_at.to_rfc3339(),
        }
    }
}

/// Request payload for bulk reassignment
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReassignRequestDto {
    /// Users to move into the target tenant
    pub user_ids: Vec<Uuid>,
    /// Tenant receiving the users
    pub target_tenant_id: Uuid,
}

/// Response payload for bulk reassignment
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReassignResponseDto {
    /// Users whose tenant assignment was updated
    pub updated_count: u64,
    /// Users that gained a backfilled default location
    pub locations_backfilled: u32,
    /// Per-user backfill failures; the tenant update itself succeeded
    pub backfill_errors: Vec<String>,
}

/// List users with no tenant assignment
#[utoipa::path(
    get,
    path = "/api/v1/admin/orphaned-users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Orphaned users", body = ApiResponse<Vec<OrphanedUserDto>>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_orphaned_users(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
) -> Result<Json<ApiResponse<Vec<OrphanedUserDto>>>, ApiError> {
    let users = state.admin_users.list_orphaned().await?;
    Ok(Json(ApiResponse::new(
        users.into_iter().map(OrphanedUserDto::from).collect(),
    )))
}

/// List candidate target tenants
#[utoipa::path(
    get,
    path = "/api/v1/admin/tenants",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Tenants", body = ApiResponse<Vec<TenantSummaryDto>>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_tenants(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
) -> Result<Json<ApiResponse<Vec<TenantSummaryDto>>>, ApiError> {
    let tenants = state.tenants.list().await?;
    Ok(Json(ApiResponse::new(
        tenants.into_iter().map(TenantSummaryDto::from).collect(),
    )))
}

/// Move a batch of orphaned users into a target tenant
#[utoipa::path(
    post,
    path = "/api/v1/admin/reassign",
    security(("bearer_auth" = [])),
    request_body = ReassignRequestDto,
    responses(
        (status = 200, description = "Reassignment outcome", body = ApiResponse<ReassignResponseDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Target tenant not found", body = ApiError),
        (status = 503, description = "Datastore unavailable", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn reassign_users(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Json(dto): Json<ReassignRequestDto>,
) -> Result<Json<ApiResponse<ReassignResponseDto>>, ApiError> {
    let outcome = state
        .reassignment
        .reassign(&dto.user_ids, dto.target_tenant_id)
        .await?;

    Ok(Json(ApiResponse::new(ReassignResponseDto {
        updated_count: outcome.updated_count,
        locations_backfilled: outcome.locations_backfilled,
        backfill_errors: outcome.backfill_errors,
    })))
}
