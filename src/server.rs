//! # Server Configuration
//!
//! This module contains the server setup and configuration for the
//! Provisioning API: shared state construction, routing, and the OpenAPI
//! document.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use url::Url;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::auth;
use crate::catalog::HttpCatalog;
use crate::config::AppConfig;
use crate::db;
use crate::error::ApiError;
use crate::handlers::{self, admin, flows};
use crate::identity::HttpCredentialBroker;
use crate::notifier::WebhookNotifier;
use crate::reassignment::ReassignmentService;
use crate::saga::ProvisioningSaga;
use crate::stores::{SeaAdminUserStore, SeaLocationStore, SeaPurchaseRecordStore, SeaTenantStore};
use crate::telemetry::{TraceContext, with_trace_context};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub saga: Arc<ProvisioningSaga>,
    pub reassignment: Arc<ReassignmentService>,
    pub tenants: Arc<SeaTenantStore>,
    pub admin_users: Arc<SeaAdminUserStore>,
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

/// Wires collaborators together from configuration and a live pool.
pub fn build_state(
    config: Arc<AppConfig>,
    db: DatabaseConnection,
) -> Result<AppState, Box<dyn std::error::Error>> {
    let retry = config.retry.policy();
    let shared_db = Arc::new(db.clone());

    let tenants = Arc::new(SeaTenantStore::new(Arc::clone(&shared_db), retry));
    let locations = Arc::new(SeaLocationStore::new(Arc::clone(&shared_db), retry));
    let admin_users = Arc::new(SeaAdminUserStore::new(Arc::clone(&shared_db), retry));
    let purchase_records = Arc::new(SeaPurchaseRecordStore::new(Arc::clone(&shared_db), retry));

    let identity_base_url = Url::parse(&config.identity_base_url)
        .map_err(|e| format!("Invalid identity base URL: {}", e))?;
    let broker = Arc::new(HttpCredentialBroker::new(
        identity_base_url,
        config.identity_api_key.clone(),
        Duration::from_millis(config.identity_timeout_ms),
    ));

    let catalog_base_url = Url::parse(&config.catalog_base_url)
        .map_err(|e| format!("Invalid catalog base URL: {}", e))?;
    let catalog = Arc::new(HttpCatalog::new(reqwest::Client::new(), catalog_base_url));

    let webhook = config
        .notifier_webhook_url
        .as_deref()
        .map(Url::parse)
        .transpose()
        .map_err(|e| format!("Invalid notifier webhook URL: {}", e))?;
    let notifier = Arc::new(WebhookNotifier::new(reqwest::Client::new(), webhook));

    let saga = Arc::new(ProvisioningSaga::new(
        Arc::clone(&tenants) as _,
        locations,
        Arc::clone(&admin_users) as _,
        purchase_records,
        broker,
        catalog,
        notifier,
        config.provisioning.temp_password_length,
    ));

    let reassignment = Arc::new(ReassignmentService::new(shared_db, retry));

    Ok(AppState {
        db,
        config,
        saga,
        reassignment,
        tenants,
        admin_users,
    })
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/orphaned-users",
            get(admin::list_orphaned_users),
        )
        .route("/api/v1/admin/tenants", get(admin::list_tenants))
        .route("/api/v1/admin/reassign", post(admin::reassign_users))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.config),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(healthz))
        .route("/api/v1/checkout", post(flows::checkout))
        .route("/api/v1/trials", post(flows::start_trial))
        .route("/api/v1/signups", post(flows::public_signup))
        .merge(admin_routes)
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Assigns each request a trace id, available through task-local storage for
/// the whole request lifetime.
async fn trace_context_middleware(request: Request, next: Next) -> Response {
    let context = TraceContext {
        trace_id: format!("req-{}", Uuid::new_v4()),
    };

    let mut request = request;
    request.extensions_mut().insert(context.clone());

    with_trace_context(context, next.run(request)).await
}

/// Liveness and readiness probe backed by a trivial database query.
async fn healthz(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    db::health_check(&state.db).await.map_err(|err| {
        tracing::warn!(error = %err, "Health check failed");
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Database health check failed",
        )
    })?;
    Ok("ok")
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();

    let state = build_state(Arc::new(config), db)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::flows::checkout,
        crate::handlers::flows::start_trial,
        crate::handlers::flows::public_signup,
        crate::handlers::admin::list_orphaned_users,
        crate::handlers::admin::list_tenants,
        crate::handlers::admin::reassign_users,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::flows::CheckoutRequestDto,
            crate::handlers::flows::TrialRequestDto,
            crate::handlers::flows::SignupRequestDto,
            crate::handlers::flows::ProvisioningResponseDto,
            crate::handlers::admin::OrphanedUserDto,
            crate::handlers::admin::TenantSummaryDto,
            crate::handlers::admin::ReassignRequestDto,
            crate::handlers::admin::ReassignResponseDto,
            crate::stores::RevenueShareTerm,
            crate::error::ApiError,
        )
    ),
    info(
        title = "Tenant Provisioning API",
        description = "Provisions tenants, admin users, and purchase records across checkout, trial, and signup flows",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
