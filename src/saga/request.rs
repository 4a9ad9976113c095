//! Provisioning request values.
//!
//! A [`ProvisioningRequest`] is immutable for the duration of one saga run.
//! The three flow constructors pin the variation points; everything after
//! request construction is flow-agnostic.

use crate::error::ProvisionError;
use crate::stores::RevenueShareTerm;

/// Upper bound on trial length; the expiry instant is computed with plain
/// chrono addition, which panics on out-of-range dates.
const MAX_TRIAL_DAYS: u32 = 3650;

/// Which public flow produced the request. Used for logging and metrics
/// labels only; behavior is driven by [`FlowOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    PaidCheckout,
    FreeTrial,
    PublicSignup,
}

impl FlowKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PaidCheckout => "paid_checkout",
            Self::FreeTrial => "free_trial",
            Self::PublicSignup => "public_signup",
        }
    }
}

/// Variation points between the three flows.
#[derive(Debug, Clone, Copy)]
pub struct FlowOptions {
    /// Mint a one-time login token at the end of the run.
    pub mint_login_token: bool,
    /// Attempt the purchase-record write.
    pub expect_purchase_record: bool,
    /// A payment reference must accompany a non-zero sale amount.
    pub require_payment_ref: bool,
    /// Trial length; `Some` marks the tenant as a trial.
    pub trial_days: Option<u32>,
}

/// Input to one saga run.
#[derive(Debug, Clone)]
pub struct ProvisioningRequest {
    pub flow: FlowKind,
    pub tenant_name: String,
    pub admin_name: String,
    pub admin_email: String,
    /// Caller-supplied password; when absent a temporary one is generated
    /// and `requires_password_change` stays in force.
    pub password: Option<String>,
    pub program_id: String,
    pub max_users: i32,
    pub amount_paid: f64,
    pub payment_ref: Option<String>,
    pub revenue_share: Option<Vec<RevenueShareTerm>>,
    pub options: FlowOptions,
}

impl ProvisioningRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn paid_checkout(
        tenant_name: String,
        admin_name: String,
        admin_email: String,
        password: Option<String>,
        program_id: String,
        max_users: i32,
        amount_paid: f64,
        payment_ref: Option<String>,
        revenue_share: Option<Vec<RevenueShareTerm>>,
    ) -> Self {
        Self {
            flow: FlowKind::PaidCheckout,
            tenant_name,
            admin_name,
            admin_email,
            password,
            program_id,
            max_users,
            amount_paid,
            payment_ref,
            revenue_share,
            options: FlowOptions {
                mint_login_token: false,
                expect_purchase_record: true,
                require_payment_ref: true,
                trial_days: None,
            },
        }
    }

    pub fn free_trial(
        tenant_name: String,
        admin_name: String,
        admin_email: String,
        password: Option<String>,
        program_id: String,
        max_users: i32,
        trial_days: u32,
    ) -> Self {
        Self {
            flow: FlowKind::FreeTrial,
            tenant_name,
            admin_name,
            admin_email,
            password,
            program_id,
            max_users,
            amount_paid: 0.0,
            payment_ref: None,
            revenue_share: None,
            options: FlowOptions {
                mint_login_token: false,
                expect_purchase_record: false,
                require_payment_ref: false,
                trial_days: Some(trial_days),
            },
        }
    }

    pub fn public_signup(
        tenant_name: String,
        admin_name: String,
        admin_email: String,
        password: Option<String>,
        program_id: String,
        max_users: i32,
    ) -> Self {
        Self {
            flow: FlowKind::PublicSignup,
            tenant_name,
            admin_name,
            admin_email,
            password,
            program_id,
            max_users,
            amount_paid: 0.0,
            payment_ref: None,
            revenue_share: None,
            options: FlowOptions {
                mint_login_token: true,
                expect_purchase_record: false,
                require_payment_ref: false,
                trial_days: None,
            },
        }
    }

    /// Field-level validation. Runs before any write; the saga never
    /// compensates a validation failure.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        if self.tenant_name.trim().is_empty() {
            return Err(ProvisionError::validation("tenant name is required"));
        }
        if self.admin_name.trim().is_empty() {
            return Err(ProvisionError::validation("admin name is required"));
        }
        if !is_plausible_email(&self.admin_email) {
            return Err(ProvisionError::validation(format!(
                "invalid admin email: {}",
                self.admin_email
            )));
        }
        if self.program_id.trim().is_empty() {
            return Err(ProvisionError::validation("program id is required"));
        }
        if self.max_users <= 0 {
            return Err(ProvisionError::validation("max users must be positive"));
        }
        if self.amount_paid < 0.0 {
            return Err(ProvisionError::validation("amount paid cannot be negative"));
        }
        if self.options.require_payment_ref && self.amount_paid > 0.0 && self.payment_ref.is_none()
        {
            return Err(ProvisionError::validation(
                "payment reference is required for a non-zero sale",
            ));
        }
        if let Some(days) = self.options.trial_days
            && !(1..=MAX_TRIAL_DAYS).contains(&days)
        {
            return Err(ProvisionError::validation(format!(
                "trial days must be between 1 and {MAX_TRIAL_DAYS}"
            )));
        }
        if let Some(password) = &self.password
            && password.len() < 8
        {
            return Err(ProvisionError::validation(
                "password must be at least 8 characters",
            ));
        }
        if let Some(terms) = &self.revenue_share {
            let total: f64 = terms.iter().map(|term| term.percent).sum();
            if terms.iter().any(|term| term.percent <= 0.0) || total > 100.0 {
                return Err(ProvisionError::validation(
                    "revenue share percentages must be positive and sum to at most 100",
                ));
            }
        }
        Ok(())
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial_request() -> ProvisioningRequest {
        ProvisioningRequest::free_trial(
            "Acme Coffee".to_string(),
            "Ada".to_string(),
            "ada@acme.test".to_string(),
            None,
            "prog-1".to_string(),
            25,
            7,
        )
    }

    #[test]
    fn test_flow_constructors_pin_variation_points() {
        let paid = ProvisioningRequest::paid_checkout(
            "Acme".into(),
            "Ada".into(),
            "ada@acme.test".into(),
            None,
            "prog-1".into(),
            25,
            199.0,
            Some("pay-1".into()),
            None,
        );
        assert!(paid.options.expect_purchase_record);
        assert!(!paid.options.mint_login_token);
        assert_eq!(paid.options.trial_days, None);

        let trial = trial_request();
        assert!(!trial.options.expect_purchase_record);
        assert_eq!(trial.options.trial_days, Some(7));
        assert_eq!(trial.amount_paid, 0.0);

        let signup = ProvisioningRequest::public_signup(
            "Acme".into(),
            "Ada".into(),
            "ada@acme.test".into(),
            None,
            "prog-1".into(),
            25,
        );
        assert!(signup.options.mint_login_token);
        assert!(!signup.options.expect_purchase_record);
    }

    #[test]
    fn test_validation_rejects_bad_email() {
        let mut request = trial_request();
        request.admin_email = "not-an-email".to_string();
        assert!(request.validate().is_err());

        request.admin_email = "a@b".to_string();
        assert!(request.validate().is_err());

        request.admin_email = "a@b.test".to_string();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_paid_sale_requires_payment_ref() {
        let request = ProvisioningRequest::paid_checkout(
            "Acme".into(),
            "Ada".into(),
            "ada@acme.test".into(),
            None,
            "prog-1".into(),
            25,
            199.0,
            None,
            None,
        );
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_zero_amount_checkout_allows_missing_payment_ref() {
        let request = ProvisioningRequest::paid_checkout(
            "Acme".into(),
            "Ada".into(),
            "ada@acme.test".into(),
            None,
            "prog-1".into(),
            25,
            0.0,
            None,
            None,
        );
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_trial_days_out_of_bounds_are_rejected() {
        let mut request = trial_request();
        request.options.trial_days = Some(0);
        assert!(request.validate().is_err());

        request.options.trial_days = Some(u32::MAX);
        assert!(request.validate().is_err());

        request.options.trial_days = Some(MAX_TRIAL_DAYS);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_revenue_share_over_100_percent_is_rejected() {
        let mut request = trial_request();
        request.revenue_share = Some(vec![
            RevenueShareTerm {
                partner_ref: "partner-a".into(),
                percent: 60.0,
            },
            RevenueShareTerm {
                partner_ref: "partner-b".into(),
                percent: 50.0,
            },
        ]);
        assert!(request.validate().is_err());
    }
}
