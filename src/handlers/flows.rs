//! # Provisioning Flow Handlers
//!
//! The three public flows are thin request-mapping adapters over the one
//! parameterized saga: each handler turns its DTO into a
//! [`ProvisioningRequest`] and returns the receipt. Payment verification
//! happens upstream; `payment_ref` arrives pre-verified.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::saga::{ProvisioningReceipt, ProvisioningRequest};
use crate::server::AppState;
use crate::stores::RevenueShareTerm;

use super::ApiResponse;

/// Request payload for the paid checkout flow
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutRequestDto {
    /// Display name for the new tenant
    #[schema(example = "Acme Coffee Co")]
    pub tenant_name: String,
    /// Display name of the purchasing admin
    #[schema(example = "Ada Lovelace")]
    pub admin_name: String,
    /// Admin email; becomes the credential identifier
    #[schema(example = "ada@acme.test")]
    pub admin_email: String,
    /// Caller-supplied password; a temporary one is generated when absent
    pub password: Option<String>,
    /// Purchased program identifier
    #[schema(example = "prog-barista-101")]
    pub program_id: String,
    /// Seat limit; defaults from configuration when absent
    pub max_users: Option<i32>,
    /// Verified sale amount
    #[schema(example = 199.0)]
    pub amount_paid: f64,
    /// Pre-verified payment reference (required for a non-zero amount)
    pub payment_ref: Option<String>,
    /// Revenue-share terms attached to the sale
    pub revenue_share: Option<Vec<RevenueShareTerm>>,
}

/// Request payload for the free trial flow
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TrialRequestDto {
    pub tenant_name: String,
    pub admin_name: String,
    pub admin_email: String,
    pub password: Option<String>,
    pub program_id: String,
    pub max_users: Option<i32>,
    /// Trial length in days; defaults from configuration when absent
    pub trial_days: Option<u32>,
}

/// Request payload for the public signup flow
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignupRequestDto {
    pub tenant_name: String,
    pub admin_name: String,
    pub admin_email: String,
    pub password: Option<String>,
    pub program_id: String,
    pub max_users: Option<i32>,
}

/// Response payload shared by all three flows
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProvisioningResponseDto {
    /// Identifier of the created tenant
    pub tenant_id: Uuid,
    /// Identifier of the created admin user
    pub admin_user_id: Uuid,
    /// Identifier of the purchase record; absent when the write failed or
    /// the flow does not produce one
    pub purchase_record_id: Option<Uuid>,
    /// One-time login token (public signup only; absent on minting failure)
    pub login_token: Option<String>,
    /// Whether the welcome email was accepted for delivery
    pub welcome_email_sent: bool,
}

impl From<ProvisioningReceipt> for ProvisioningResponseDto {
    fn from(receipt: ProvisioningReceipt) -> Self {
        Self {
            tenant_id: receipt.tenant_id,
            admin_user_id: receipt.admin_user_id,
            purchase_record_id: receipt.purchase_record_id,
            login_token: receipt.login_token,
            welcome_email_sent: receipt.welcome_email_sent,
        }
    }
}

/// Provision a tenant from a paid checkout
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = CheckoutRequestDto,
    responses(
        (status = 201, description = "Tenant provisioned", body = ApiResponse<ProvisioningResponseDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError),
        (status = 502, description = "Identity provider error", body = ApiError),
        (status = 503, description = "Datastore unavailable", body = ApiError)
    ),
    tag = "provisioning"
)]
pub async fn checkout(
    State(state): State<AppState>,
    Json(dto): Json<CheckoutRequestDto>,
) -> Result<(StatusCode, Json<ApiResponse<ProvisioningResponseDto>>), ApiError> {
    let request = ProvisioningRequest::paid_checkout(
        dto.tenant_name,
        dto.admin_name,
        dto.admin_email,
        dto.password,
        dto.program_id,
        dto.max_users
            .unwrap_or(state.config.provisioning.default_max_users),
        dto.amount_paid,
        dto.payment_ref,
        dto.revenue_share,
    );

    let receipt = state.saga.provision(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(receipt.into())),
    ))
}

/// Provision a tenant from a free trial request
#[utoipa::path(
    post,
    path = "/api/v1/trials",
    request_body = TrialRequestDto,
    responses(
        (status = 201, description = "Trial tenant provisioned", body = ApiResponse<ProvisioningResponseDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError),
        (status = 502, description = "Identity provider error", body = ApiError),
        (status = 503, description = "Datastore unavailable", body = ApiError)
    ),
    tag = "provisioning"
)]
pub async fn start_trial(
    State(state): State<AppState>,
    Json(dto): Json<TrialRequestDto>,
) -> Result<(StatusCode, Json<ApiResponse<ProvisioningResponseDto>>), ApiError> {
    let request = ProvisioningRequest::free_trial(
        dto.tenant_name,
        dto.admin_name,
        dto.admin_email,
        dto.password,
        dto.program_id,
        dto.max_users
            .unwrap_or(state.config.provisioning.default_max_users),
        dto.trial_days
            .unwrap_or(state.config.provisioning.default_trial_days),
    );

    let receipt = state.saga.provision(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(receipt.into())),
    ))
}

/// Provision a tenant from a public signup
#[utoipa::path(
    post,
    path = "/api/v1/signups",
    request_body = SignupRequestDto,
    responses(
        (status = 201, description = "Tenant provisioned", body = ApiResponse<ProvisioningResponseDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError),
        (status = 502, description = "Identity provider error", body = ApiError),
        (status = 503, description = "Datastore unavailable", body = ApiError)
    ),
    tag = "provisioning"
)]
pub async fn public_signup(
    State(state): State<AppState>,
    Json(dto): Json<SignupRequestDto>,
) -> Result<(StatusCode, Json<ApiResponse<ProvisioningResponseDto>>), ApiError> {
    let request = ProvisioningRequest::public_signup(
        dto.tenant_name,
        dto.admin_name,
        dto.admin_email,
        dto.password,
        dto.program_id,
        dto.max_users
            .unwrap_or(state.config.provisioning.default_max_users),
    );

    let receipt = state.saga.provision(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(receipt.into())),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_maps_to_response_dto() {
        let receipt = ProvisioningReceipt {
            tenant_id: Uuid::new_v4(),
            admin_user_id: Uuid::new_v4(),
            purchase_record_id: None,
            login_token: Some("token".to_string()),
            welcome_email_sent: true,
        };

        let dto: ProvisioningResponseDto = receipt.clone().into();
        assert_eq!(dto.tenant_id, receipt.tenant_id);
        assert_eq!(dto.admin_user_id, receipt.admin_user_id);
        assert_eq!(dto.purchase_record_id, None);
        assert_eq!(dto.login_token.as_deref(), Some("token"));
        assert!(dto.welcome_email_sent);
    }

    #[test]
    fn test_checkout_dto_deserializes_with_optional_fields_absent() {
        let dto: CheckoutRequestDto = serde_json::from_value(serde_json::json!({
            "tenant_name": "Acme",
            "admin_name": "Ada",
            "admin_email": "ada@acme.test",
            "program_id": "prog-1",
            "amount_paid": 199.0,
            "payment_ref": "pay-1"
        }))
        .unwrap();

        assert!(dto.password.is_none());
        assert!(dto.max_users.is_none());
        assert!(dto.revenue_share.is_none());
    }
}
