//! Ephemeral credential contexts.
//!
//! Each saga run acquires its own isolated identity client under a unique
//! context name, uses it for every credential operation in that run, and
//! releases it when the run ends. Contexts are never shared between runs and
//! there is no global client registry; the broker builds a fresh client per
//! acquisition.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use super::{Credential, HttpIdentityService, IdentityError, IdentityService};

static CONTEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Produces a context name that is unique for the process lifetime. The
/// random salt keeps names unique across restarts as well, since the
/// identity service may log them.
pub fn next_context_name(prefix: &str) -> String {
    let seq = CONTEXT_SEQ.fetch_add(1, Ordering::Relaxed);
    let salt: u32 = rand::random();
    format!("{prefix}-{seq}-{salt:08x}")
}

/// An isolated identity client scoped to a single provisioning run.
///
/// The context must be released exactly once. [`CredentialContext::release`]
/// consumes the context; if a context is dropped without an explicit release
/// (a bug in the calling code), the drop handler still runs the release hook
/// so the underlying client is never leaked.
pub struct CredentialContext {
    name: String,
    service: Arc<dyn IdentityService>,
    on_release: Option<Box<dyn FnOnce(&str) + Send + Sync>>,
}

impl CredentialContext {
    pub fn new(
        name: String,
        service: Arc<dyn IdentityService>,
        on_release: Box<dyn FnOnce(&str) + Send + Sync>,
    ) -> Self {
        Self {
            name,
            service,
            on_release: Some(on_release),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn create_credential(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<Credential, IdentityError> {
        self.service.create_account(email, secret).await
    }

    pub async fn delete_credential(&self, uid: &str) -> Result<(), IdentityError> {
        self.service.delete_account(uid).await
    }

    pub async fn mint_login_token(&self, uid: &str) -> Result<String, IdentityError> {
        self.service.mint_login_token(uid).await
    }

    /// Releases the context, tearing down the underlying client.
    pub fn release(mut self) {
        if let Some(hook) = self.on_release.take() {
            hook(&self.name);
        }
    }
}

impl Drop for CredentialContext {
    fn drop(&mut self) {
        if let Some(hook) = self.on_release.take() {
            warn!(
                context = %self.name,
                "Credential context dropped without explicit release"
            );
            hook(&self.name);
        }
    }
}

/// Hands out ephemeral credential contexts, one per saga run.
#[async_trait]
pub trait CredentialBroker: Send + Sync {
    async fn acquire(&self) -> Result<CredentialContext, IdentityError>;
}

/// Broker backed by the HTTP identity service. Every acquisition builds a
/// fresh `reqwest` client so runs cannot observe each other's state.
#[derive(Debug, Clone)]
pub struct HttpCredentialBroker {
    base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpCredentialBroker {
    pub fn new(base_url: Url, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            base_url,
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl CredentialBroker for HttpCredentialBroker {
    async fn acquire(&self) -> Result<CredentialContext, IdentityError> {
        let name = next_context_name("prov");

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| IdentityError::ContextSetup(err.to_string()))?;

        let service = Arc::new(HttpIdentityService::new(
            client,
            self.base_url.clone(),
            self.api_key.clone(),
        ));

        debug!(context = %name, "Acquired credential context");

        Ok(CredentialContext::new(
            name,
            service,
            Box::new(|context_name| {
                debug!(context = %context_name, "Released credential context");
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    struct NullIdentity;

    #[async_trait]
    impl IdentityService for NullIdentity {
        async fn create_account(
            &self,
            email: &str,
            _secret: &str,
        ) -> Result<Credential, IdentityError> {
            Ok(Credential {
                uid: "uid-1".to_string(),
                email: email.to_string(),
            })
        }

        async fn delete_account(&self, _uid: &str) -> Result<(), IdentityError> {
            Ok(())
        }

        async fn mint_login_token(&self, _uid: &str) -> Result<String, IdentityError> {
            Ok("token".to_string())
        }
    }

    #[test]
    fn test_context_is_usable_across_await_points() {
        // A saga run holds a shared reference to the context while awaiting
        // store calls, so the handle must be Send and Sync.
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CredentialContext>();
    }

    #[test]
    fn test_context_names_are_unique() {
        let names: HashSet<String> = (0..100).map(|_| next_context_name("prov")).collect();
        assert_eq!(names.len(), 100);
        assert!(names.iter().all(|name| name.starts_with("prov-")));
    }

    #[test]
    fn test_explicit_release_runs_hook_once() {
        let released = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&released);

        let ctx = CredentialContext::new(
            "prov-test".to_string(),
            Arc::new(NullIdentity),
            Box::new(move |name| sink.lock().unwrap().push(name.to_string())),
        );
        ctx.release();

        assert_eq!(released.lock().unwrap().as_slice(), ["prov-test"]);
    }

    #[test]
    fn test_drop_without_release_still_runs_hook() {
        let released = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&released);

        {
            let _ctx = CredentialContext::new(
                "prov-dropped".to_string(),
                Arc::new(NullIdentity),
                Box::new(move |name| sink.lock().unwrap().push(name.to_string())),
            );
        }

        assert_eq!(released.lock().unwrap().as_slice(), ["prov-dropped"]);
    }

    #[tokio::test]
    async fn test_broker_hands_out_distinct_contexts() {
        let broker = HttpCredentialBroker::new(
            Url::parse("http://localhost:9099").unwrap(),
            None,
            Duration::from_secs(5),
        );

        let first = broker.acquire().await.unwrap();
        let second = broker.acquire().await.unwrap();
        assert_ne!(first.name(), second.name());

        first.release();
        second.release();
    }
}
