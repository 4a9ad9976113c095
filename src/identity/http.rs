//! HTTP client for the identity service.
//!
//! Wire format: `POST /v1/accounts` registers an account, `DELETE
//! /v1/accounts/{uid}` removes one, `POST /v1/accounts/{uid}/tokens` mints a
//! login token. Errors come back as `{"error": {"code": ..., "message": ...}}`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{Credential, CredentialErrorKind, IdentityError, IdentityService};

#[derive(Debug, Deserialize)]
struct AccountResponse {
    uid: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: Option<String>,
}

/// Identity service client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpIdentityService {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpIdentityService {
    pub fn new(client: reqwest::Client, base_url: Url, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn read_error_code(response: reqwest::Response) -> (Option<String>, String) {
        let status = response.status();
        match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => {
                let message = envelope
                    .error
                    .message
                    .unwrap_or_else(|| format!("provider returned {status}"));
                (Some(envelope.error.code), message)
            }
            Err(_) => (None, format!("provider returned {status}")),
        }
    }

    fn classify_creation_error(code: Option<&str>) -> CredentialErrorKind {
        match code {
            Some("EMAIL_EXISTS") => CredentialErrorKind::EmailAlreadyRegistered,
            Some("INVALID_EMAIL") => CredentialErrorKind::InvalidEmail,
            Some("WEAK_PASSWORD") => CredentialErrorKind::WeakPassword,
            _ => CredentialErrorKind::Unavailable,
        }
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn create_account(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<Credential, IdentityError> {
        let response = self
            .authorize(self.client.post(self.endpoint("v1/accounts")))
            .json(&json!({ "email": email, "password": secret }))
            .send()
            .await
            .map_err(|err| IdentityError::CredentialCreation {
                kind: CredentialErrorKind::Unavailable,
                message: err.to_string(),
            })?;

        if response.status().is_success() {
            let account: AccountResponse =
                response
                    .json()
                    .await
                    .map_err(|err| IdentityError::CredentialCreation {
                        kind: CredentialErrorKind::Unavailable,
                        message: format!("malformed account response: {err}"),
                    })?;
            return Ok(Credential {
                uid: account.uid,
                email: account.email,
            });
        }

        let (code, message) = Self::read_error_code(response).await;
        Err(IdentityError::CredentialCreation {
            kind: Self::classify_creation_error(code.as_deref()),
            message,
        })
    }

    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError> {
        let response = self
            .authorize(
                self.client
                    .delete(self.endpoint(&format!("v1/accounts/{uid}"))),
            )
            .send()
            .await
            .map_err(|err| IdentityError::CredentialDeletion(err.to_string()))?;

        // An already-deleted account is success from the caller's point of
        // view; compensation may race a manual cleanup.
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }

        let (_, message) = Self::read_error_code(response).await;
        Err(IdentityError::CredentialDeletion(message))
    }

    async fn mint_login_token(&self, uid: &str) -> Result<String, IdentityError> {
        let response = self
            .authorize(
                self.client
                    .post(self.endpoint(&format!("v1/accounts/{uid}/tokens"))),
            )
            .send()
            .await
            .map_err(|err| IdentityError::TokenMinting(err.to_string()))?;

        if !response.status().is_success() {
            let (_, message) = Self::read_error_code(response).await;
            return Err(IdentityError::TokenMinting(message));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| IdentityError::TokenMinting(format!("malformed token response: {err}")))?;
        Ok(token.token)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn service(server: &MockServer, api_key: Option<&str>) -> HttpIdentityService {
        HttpIdentityService::new(
            reqwest::Client::new(),
            Url::parse(&server.uri()).unwrap(),
            api_key.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn test_create_account_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts"))
            .and(header("authorization", "Bearer secret-key"))
            .and(body_json(json!({
                "email": "admin@example.com",
                "password": "Temp0rary!"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "uid": "acct-123",
                "email": "admin@example.com"
            })))
            .mount(&server)
            .await;

        let credential = service(&server, Some("secret-key"))
            .create_account("admin@example.com", "Temp0rary!")
            .await
            .unwrap();

        assert_eq!(credential.uid, "acct-123");
        assert_eq!(credential.email, "admin@example.com");
    }

    #[tokio::test]
    async fn test_create_account_duplicate_email() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": { "code": "EMAIL_EXISTS", "message": "email already registered" }
            })))
            .mount(&server)
            .await;

        let err = service(&server, None)
            .create_account("admin@example.com", "Temp0rary!")
            .await
            .unwrap_err();

        match err {
            IdentityError::CredentialCreation { kind, message } => {
                assert_eq!(kind, CredentialErrorKind::EmailAlreadyRegistered);
                assert_eq!(message, "email already registered");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_account_provider_outage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = service(&server, None)
            .create_account("admin@example.com", "Temp0rary!")
            .await
            .unwrap_err();

        match err {
            IdentityError::CredentialCreation { kind, .. } => {
                assert_eq!(kind, CredentialErrorKind::Unavailable);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_account_treats_missing_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/accounts/acct-gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": "NOT_FOUND" }
            })))
            .mount(&server)
            .await;

        service(&server, None)
            .delete_account("acct-gone")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_mint_login_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts/acct-123/tokens"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "token": "one-time-token" })),
            )
            .mount(&server)
            .await;

        let token = service(&server, None)
            .mint_login_token("acct-123")
            .await
            .unwrap();
        assert_eq!(token, "one-time-token");
    }
}
