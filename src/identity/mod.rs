//! # Identity Service Integration
//!
//! Credential management against the external identity service. The saga
//! talks to it exclusively through an ephemeral [`CredentialContext`]
//! acquired from a [`CredentialBroker`] for the duration of one run.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub mod context;
pub mod http;

pub use context::{CredentialBroker, CredentialContext, HttpCredentialBroker};
pub use http::HttpIdentityService;

/// A credential held by the identity service on behalf of an admin user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Identity-service identifier for the account
    pub uid: String,
    /// Email the account was registered under
    pub email: String,
}

/// Classification of credential-creation failures, used to pick the HTTP
/// status surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialErrorKind {
    EmailAlreadyRegistered,
    InvalidEmail,
    WeakPassword,
    /// Network failure, timeout, or an unrecognized provider error.
    Unavailable,
}

impl fmt::Display for CredentialErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::EmailAlreadyRegistered => "email_already_registered",
            Self::InvalidEmail => "invalid_email",
            Self::WeakPassword => "weak_password",
            Self::Unavailable => "unavailable",
        };
        f.write_str(label)
    }
}

/// Errors from identity-service operations.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("credential creation failed ({kind}): {message}")]
    CredentialCreation {
        kind: CredentialErrorKind,
        message: String,
    },
    #[error("credential deletion failed: {0}")]
    CredentialDeletion(String),
    #[error("login token minting failed: {0}")]
    TokenMinting(String),
    #[error("credential context setup failed: {0}")]
    ContextSetup(String),
}

/// Operations the provisioning saga needs from the identity service.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Registers a new account and returns its credential.
    async fn create_account(&self, email: &str, secret: &str)
    -> Result<Credential, IdentityError>;

    /// Deletes an account. Deleting an unknown uid is treated as success so
    /// compensation stays idempotent.
    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError>;

    /// Mints a short-lived login token for the given account.
    async fn mint_login_token(&self, uid: &str) -> Result<String, IdentityError>;
}
