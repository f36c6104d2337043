//! PPE Guard API
//!
//! Multi-tenant PPE violation monitoring: cameras report violations,
//! tenants see their own events and statistics, and paid modules unlock
//! AI reporting and drone dispatch.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              PPE GUARD                                  │
//! │                                                                         │
//! │  request ─► identify ─► subscription gate ─► route handler              │
//! │             (JWT/cookie)  (302 when lapsed)                             │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────┐ │
//! │  │   Tenancy    │  │  Detections  │  │   Module     │  │  Features   │ │
//! │  │ customers,   │  │ ingest, 7-day│  │ permissions  │  │ LLM report, │ │
//! │  │ subscriptions│  │ trend, media │  │ (fail closed)│  │ drone       │ │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └─────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                        NOTIFICATIONS                             │   │
//! │  │   LLM advice | CallMeBot WhatsApp | Twilio | best effort         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod detections;
pub mod error;
pub mod integrations;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod reports;
pub mod routes;
pub mod tenancy;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::detections::{DetectionIngest, MediaStore};
use crate::integrations::{CallMeBotChannel, DroneClient, IntegrationError, LlmClient, TwilioChannel};
use crate::middleware::{AccessGate, TokenService};
use crate::notifications::{NotificationService, Notifier};
use crate::tenancy::TenantStore;

pub use models::*;

/// URL prefix for stored snapshots
pub const MEDIA_URL: &str = "/media";

/// Shared request state
pub struct ApiState {
    /// Tenant data
    pub store: Arc<dyn TenantStore>,
    /// Subscription gate
    pub gate: AccessGate,
    /// Session tokens
    pub tokens: TokenService,
    /// Detection ingestion
    pub ingest: DetectionIngest,
    /// Present when the LLM is enabled
    pub llm: Option<Arc<LlmClient>>,
    /// Drone workflow client
    pub drone: DroneClient,
}

impl ApiState {
    /// Wire every component from configuration
    pub fn from_config(config: &AppConfig, store: Arc<dyn TenantStore>) -> Result<Self, IntegrationError> {
        let integrations = &config.integrations;
        let timeout = integrations.timeout();

        let llm = if integrations.llm.enabled {
            Some(Arc::new(LlmClient::new(integrations.llm.clone(), timeout)?))
        } else {
            None
        };

        let mut notifier = NotificationService::new();
        if let Some(llm) = &llm {
            notifier = notifier.with_advisor(llm.clone());
        }
        if let Some(channel) = CallMeBotChannel::from_config(&integrations.whatsapp, timeout)? {
            notifier = notifier.with_channel(Arc::new(channel));
        }
        if let Some(channel) = TwilioChannel::from_config(&integrations.twilio, timeout)? {
            notifier = notifier.with_channel(Arc::new(channel));
        }
        let drone = DroneClient::new(integrations.drone.clone(), timeout)?;
        tracing::info!(
            channels = notifier.channel_count(),
            llm = llm.is_some(),
            drone = drone.is_configured(),
            "Integrations ready"
        );

        Ok(Self::new(config, store, Arc::new(notifier), llm, drone))
    }

    /// Assemble state around explicit collaborators
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn TenantStore>,
        notifier: Arc<dyn Notifier>,
        llm: Option<Arc<LlmClient>>,
        drone: DroneClient,
    ) -> Self {
        let media = MediaStore::new(&config.server.media_root, MEDIA_URL);
        Self {
            gate: AccessGate::new(config.gate.clone(), store.clone()),
            tokens: TokenService::new(
                &config.auth.jwt_secret,
                config.auth.token_lifetime_minutes,
                &config.auth.cookie_name,
            ),
            ingest: DetectionIngest::new(
                store.clone(),
                media,
                notifier,
                &config.server.public_base_url,
                config.integrations.notification_timeout(),
            ),
            store,
            llm,
            drone,
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "PPE Guard API",
        version = "1.0.0",
        description = "Multi-tenant PPE violation monitoring",
        license(name = "Apache-2.0")
    ),
    paths(
        routes::health::health_check,
        routes::session::index,
        routes::session::login,
        routes::session::logout,
        routes::session::service_suspended,
        routes::profile::get_profile,
        routes::profile::list_modules,
        routes::events::list_events,
        routes::events::create_event,
        routes::dashboard::get_dashboard_stats,
        routes::features::generate_report,
        routes::features::dispatch_drone,
    ),
    components(
        schemas(
            ErrorResponse,
            LoginRequest, LoginResponse, IndexResponse, SuspendedResponse,
            ProfileResponse, ModulesResponse,
            EventView, EventCreated, ReportResponse,
            routes::health::HealthResponse,
            routes::events::EventUpload,
            tenancy::Customer, tenancy::ProfileRole,
            detections::DetectionEvent, detections::DashboardStats,
            detections::CameraCount, detections::DailyCount,
            integrations::DroneDispatch
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Login, logout and landing data"),
        (name = "profile", description = "Caller profile and modules"),
        (name = "detections", description = "Violation events and statistics"),
        (name = "features", description = "Module-gated features")
    )
)]
pub struct ApiDoc;

/// Build the API router
pub fn build_router(state: ApiState) -> Router {
    let state = Arc::new(state);
    let media_root = state.ingest.media().root().clone();

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(routes::health::health_check))
        .merge(routes::session::router())
        .nest("/api/v1", api_routes())
        .nest_service(MEDIA_URL, ServeDir::new(media_root))
        .layer(from_fn_with_state(state.clone(), middleware::gate::subscription_gate))
        .layer(from_fn_with_state(state.clone(), middleware::auth::identify))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_routes() -> Router<Arc<ApiState>> {
    Router::new()
        .merge(routes::profile::router())
        .merge(routes::features::router())
        // Tenant-scoped detections
        .nest("/ppe", routes::events::router().merge(routes::dashboard::router()))
}
