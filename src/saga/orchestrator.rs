//! The provisioning orchestrator.
//!
//! Step order is fixed: resolve program, create tenant, create default
//! location, create credential, create admin user, write purchase record,
//! send welcome email, mint login token. Fatal steps compensate in strict
//! reverse-of-creation order; non-fatal steps log and continue.
//!
//! The orchestrator decides compensation by step identity. Each fatal step
//! knows exactly what was committed before it, so a failure never needs to
//! inspect error messages to work out what to undo.

use std::sync::Arc;

use chrono::{Duration, Utc};
use metrics::counter;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::catalog::{Catalog, CatalogError};
use crate::error::ProvisionError;
use crate::identity::{CredentialBroker, CredentialContext, CredentialErrorKind, IdentityError};
use crate::notifier::Notifier;
use crate::stores::{
    AdminUserDraft, AdminUserStore, LocationStore, PurchaseRecordDraft, PurchaseRecordStore,
    TenantDraft, TenantStore,
};

use super::ProvisioningRequest;

/// Name given to the single location created during provisioning.
pub const DEFAULT_LOCATION_NAME: &str = "Main Location";

/// Role assigned to every provisioned admin user.
pub const ADMIN_ROLE: &str = "Admin";

/// Successful outcome of a saga run.
///
/// `purchase_record_id`, `login_token`, and `welcome_email_sent` reflect
/// non-fatal steps: their absence means the step failed or was not part of
/// the flow, never that the tenant or admin user are missing.
#[derive(Debug, Clone)]
pub struct ProvisioningReceipt {
    pub tenant_id: Uuid,
    pub admin_user_id: Uuid,
    pub purchase_record_id: Option<Uuid>,
    pub login_token: Option<String>,
    pub welcome_email_sent: bool,
}

/// Orchestrates one provisioning run across the datastore and the identity
/// service. All collaborators sit behind traits so the control flow can be
/// exercised against scripted fakes.
pub struct ProvisioningSaga {
    tenants: Arc<dyn TenantStore>,
    locations: Arc<dyn LocationStore>,
    admin_users: Arc<dyn AdminUserStore>,
    purchase_records: Arc<dyn PurchaseRecordStore>,
    broker: Arc<dyn CredentialBroker>,
    catalog: Arc<dyn Catalog>,
    notifier: Arc<dyn Notifier>,
    temp_password_length: usize,
}

impl ProvisioningSaga {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        locations: Arc<dyn LocationStore>,
        admin_users: Arc<dyn AdminUserStore>,
        purchase_records: Arc<dyn PurchaseRecordStore>,
        broker: Arc<dyn CredentialBroker>,
        catalog: Arc<dyn Catalog>,
        notifier: Arc<dyn Notifier>,
        temp_password_length: usize,
    ) -> Self {
        Self {
            tenants,
            locations,
            admin_users,
            purchase_records,
            broker,
            catalog,
            notifier,
            temp_password_length,
        }
    }

    /// Runs one provisioning request to completion.
    ///
    /// The credential context acquired here is released exactly once on
    /// every exit path; `run` never consumes it.
    pub async fn provision(
        &self,
        request: ProvisioningRequest,
    ) -> Result<ProvisioningReceipt, ProvisionError> {
        let flow = request.flow.label();
        request.validate()?;

        let context = self
            .broker
            .acquire()
            .await
            .map_err(|err| ProvisionError::CredentialCreation {
                kind: CredentialErrorKind::Unavailable,
                message: err.to_string(),
            })?;

        let outcome = self.run(&context, &request).await;
        context.release();

        match &outcome {
            Ok(receipt) => {
                counter!("provisioning_success_total", "flow" => flow).increment(1);
                info!(
                    flow,
                    tenant_id = %receipt.tenant_id,
                    admin_user_id = %receipt.admin_user_id,
                    purchase_record = receipt.purchase_record_id.is_some(),
                    "Provisioning completed"
                );
            }
            Err(err) => {
                counter!("provisioning_failure_total", "flow" => flow, "kind" => err.kind_label())
                    .increment(1);
                warn!(flow, kind = err.kind_label(), error = %err, "Provisioning failed");
            }
        }

        outcome
    }

    async fn run(
        &self,
        context: &CredentialContext,
        request: &ProvisioningRequest,
    ) -> Result<ProvisioningReceipt, ProvisionError> {
        // Program resolution happens before any write, so an unknown
        // program fails the request with nothing to compensate.
        let program = self
            .catalog
            .get_program(&request.program_id)
            .await
            .map_err(|err| match err {
                CatalogError::ProgramNotFound(id) => {
                    ProvisionError::validation(format!("unknown program: {id}"))
                }
                other => ProvisionError::persistence("resolve_program", other.to_string()),
            })?;

        let course_titles = self.resolve_course_titles(&program.course_ids).await;

        let (secret, secret_generated) = match &request.password {
            Some(password) => (password.clone(), false),
            None => (generate_temp_password(self.temp_password_length), true),
        };

        // Step: tenant (fatal, nothing committed yet).
        let trial_ends_at = request
            .options
            .trial_days
            .map(|days| (Utc::now() + Duration::days(i64::from(days))).into());
        let tenant = self
            .tenants
            .create(TenantDraft {
                name: request.tenant_name.clone(),
                course_ids: program.course_ids.clone(),
                max_users: request.max_users,
                is_trial: request.options.trial_days.is_some(),
                trial_ends_at,
                sale_amount: request.amount_paid,
                revenue_share: request.revenue_share.clone(),
            })
            .await
            .map_err(|err| ProvisionError::persistence("create_tenant", err.to_string()))?;

        // Step: default location (non-fatal).
        let location_ids = match self
            .locations
            .create_default(tenant.id, DEFAULT_LOCATION_NAME)
            .await
        {
            Ok(location) => vec![location.id],
            Err(err) => {
                warn!(
                    tenant_id = %tenant.id,
                    error = %err,
                    "Default location creation failed, continuing without locations"
                );
                counter!("provisioning_partial_step_total", "step" => "create_location")
                    .increment(1);
                Vec::new()
            }
        };

        // Step: credential (fatal, compensate tenant).
        let credential = match context
            .create_credential(&request.admin_email, &secret)
            .await
        {
            Ok(credential) => credential,
            Err(err) => {
                self.compensate(context, None, Some(tenant.id)).await;
                return Err(map_credential_error(err));
            }
        };

        // Step: admin user (fatal, compensate credential then tenant).
        let admin_user = match self
            .admin_users
            .create(AdminUserDraft {
                tenant_id: tenant.id,
                name: request.admin_name.clone(),
                email: request.admin_email.clone(),
                role: ADMIN_ROLE.to_string(),
                location_ids,
                credential_uid: credential.uid.clone(),
            })
            .await
        {
            Ok(admin_user) => admin_user,
            Err(err) => {
                self.compensate(context, Some(&credential.uid), Some(tenant.id))
                    .await;
                return Err(ProvisionError::persistence(
                    "create_admin_user",
                    err.to_string(),
                ));
            }
        };

        // Step: purchase record (non-fatal, paid flow only).
        let purchase_record_id = if request.options.expect_purchase_record {
            match self
                .purchase_records
                .create(PurchaseRecordDraft {
                    tenant_id: tenant.id,
                    admin_user_id: admin_user.id,
                    amount_paid: request.amount_paid,
                    payment_ref: request.payment_ref.clone(),
                    program_id: program.id.clone(),
                    program_title: program.title.clone(),
                    course_ids: program.course_ids.clone(),
                    course_titles,
                    revenue_share: request.revenue_share.clone(),
                })
                .await
            {
                Ok(record) => Some(record.id),
                Err(err) => {
                    // The sale is committed but unrecorded. Operators watch
                    // for this line.
                    error!(
                        tenant_id = %tenant.id,
                        admin_user_id = %admin_user.id,
                        payment_ref = ?request.payment_ref,
                        error = %err,
                        "CRITICAL: purchase record write failed, manual reconciliation needed"
                    );
                    counter!("provisioning_partial_step_total", "step" => "create_purchase_record")
                        .increment(1);
                    None
                }
            }
        } else {
            None
        };

        // Step: welcome email (non-fatal).
        let temp_secret = secret_generated.then_some(secret.as_str());
        let welcome_email_sent = self
            .notifier
            .send_welcome(&request.admin_email, &request.admin_name, temp_secret)
            .await;
        if !welcome_email_sent {
            counter!("provisioning_partial_step_total", "step" => "send_welcome_email")
                .increment(1);
        }

        // Step: login token (non-fatal, public signup only). Failure is a
        // degraded success; the user can still log in with the password.
        let login_token = if request.options.mint_login_token {
            match context.mint_login_token(&credential.uid).await {
                Ok(token) => Some(token),
                Err(err) => {
                    warn!(
                        admin_user_id = %admin_user.id,
                        error = %err,
                        "Login token minting failed, returning success without token"
                    );
                    counter!("provisioning_partial_step_total", "step" => "mint_login_token")
                        .increment(1);
                    None
                }
            }
        } else {
            None
        };

        Ok(ProvisioningReceipt {
            tenant_id: tenant.id,
            admin_user_id: admin_user.id,
            purchase_record_id,
            login_token,
            welcome_email_sent,
        })
    }

    async fn resolve_course_titles(&self, course_ids: &[String]) -> Vec<String> {
        let mut titles = Vec::with_capacity(course_ids.len());
        for course_id in course_ids {
            match self.catalog.get_course(course_id).await {
                Ok(course) => titles.push(course.title),
                Err(err) => {
                    warn!(course_id, error = %err, "Course title lookup failed, using id");
                    titles.push(course_id.clone());
                }
            }
        }
        titles
    }

    /// Undoes committed fatal steps in reverse-of-creation order: credential
    /// first, then tenant. A failed delete is logged and skipped; the
    /// forward error already in flight is what the caller sees.
    async fn compensate(
        &self,
        context: &CredentialContext,
        credential_uid: Option<&str>,
        tenant_id: Option<Uuid>,
    ) {
        if let Some(uid) = credential_uid {
            if let Err(err) = context.delete_credential(uid).await {
                error!(
                    credential_uid = uid,
                    error = %err,
                    "Compensation failed: orphaned credential left in identity service"
                );
                counter!("provisioning_compensation_failure_total", "step" => "delete_credential")
                    .increment(1);
            } else {
                info!(credential_uid = uid, "Compensation: credential deleted");
            }
        }

        if let Some(id) = tenant_id {
            if let Err(err) = self.tenants.delete(id).await {
                error!(
                    tenant_id = %id,
                    error = %err,
                    "Compensation failed: partially-provisioned tenant left behind"
                );
                counter!("provisioning_compensation_failure_total", "step" => "delete_tenant")
                    .increment(1);
            } else {
                info!(tenant_id = %id, "Compensation: tenant deleted");
            }
        }
    }
}

fn map_credential_error(err: IdentityError) -> ProvisionError {
    match err {
        IdentityError::CredentialCreation { kind, message } => {
            ProvisionError::CredentialCreation { kind, message }
        }
        other => ProvisionError::CredentialCreation {
            kind: CredentialErrorKind::Unavailable,
            message: other.to_string(),
        },
    }
}

fn generate_temp_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_password_length_and_charset() {
        let password = generate_temp_password(16);
        assert_eq!(password.len(), 16);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_temp_passwords_differ() {
        assert_ne!(generate_temp_password(16), generate_temp_password(16));
    }
}
