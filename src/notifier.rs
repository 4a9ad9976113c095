//! Welcome notifications.
//!
//! Delivery is best effort: a failed welcome email never fails a
//! provisioning run, it only flips the `welcome_email_sent` flag on the
//! receipt.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

/// Outbound notifications produced by provisioning.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends the welcome email. Returns whether delivery was accepted.
    async fn send_welcome(&self, email: &str, name: &str, temp_secret: Option<&str>) -> bool;
}

/// Notifier that posts welcome payloads to a configured webhook. With no
/// webhook configured it logs and reports non-delivery.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: Option<Url>,
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, endpoint: Option<Url>) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_welcome(&self, email: &str, name: &str, temp_secret: Option<&str>) -> bool {
        let Some(endpoint) = &self.endpoint else {
            debug!(recipient = email, "No notification webhook configured, skipping welcome email");
            return false;
        };

        let payload = json!({
            "kind": "welcome",
            "to": email,
            "name": name,
            "temporary_password": temp_secret,
        });

        match self.client.post(endpoint.clone()).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(recipient = email, "Welcome email dispatched");
                true
            }
            Ok(response) => {
                warn!(
                    recipient = email,
                    status = %response.status(),
                    "Welcome email webhook rejected the payload"
                );
                false
            }
            Err(err) => {
                warn!(recipient = email, error = %err, "Welcome email webhook unreachable");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_missing_webhook_reports_not_delivered() {
        let notifier = WebhookNotifier::new(reqwest::Client::new(), None);
        assert!(!notifier.send_welcome("a@b.com", "Ada", None).await);
    }

    #[tokio::test]
    async fn test_webhook_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notify"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let endpoint = Url::parse(&format!("{}/notify", server.uri())).unwrap();
        let notifier = WebhookNotifier::new(reqwest::Client::new(), Some(endpoint));
        assert!(notifier.send_welcome("a@b.com", "Ada", Some("Temp0rary!")).await);
    }

    #[tokio::test]
    async fn test_webhook_failure_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notify"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let endpoint = Url::parse(&format!("{}/notify", server.uri())).unwrap();
        let notifier = WebhookNotifier::new(reqwest::Client::new(), Some(endpoint));
        assert!(!notifier.send_welcome("a@b.com", "Ada", None).await);
    }
}
