//! Liveness and store reachability

use crate::tenancy::TenantStore;
use crate::ApiState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Service health
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the store is unreachable
    pub status: String,
    /// Crate version
    pub version: String,
    /// "ok" or "unavailable"
    pub store: String,
    /// RFC 3339 check time
    pub timestamp: String,
}

impl HealthResponse {
    /// Ping the store and summarise
    pub async fn check(store: &dyn TenantStore, now: DateTime<Utc>) -> Self {
        let store_ok = match store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Health check: store unreachable: {}", e);
                false
            }
        };

        Self {
            status: if store_ok { "ok" } else { "degraded" }.into(),
            version: env!("CARGO_PKG_VERSION").into(),
            store: if store_ok { "ok" } else { "unavailable" }.into(),
            timestamp: now.to_rfc3339(),
        }
    }

    /// Whether every dependency answered
    pub fn is_healthy(&self) -> bool {
        self.status == "ok"
    }
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and store are up", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let health = HealthResponse::check(state.store.as_ref(), Utc::now()).await;
    let status = if health.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detections::DetectionEvent;
    use crate::tenancy::model::{Customer, CustomerId, Subscription, User, UserId, UserProfile};
    use crate::tenancy::{InMemoryStore, StoreError};
    use async_trait::async_trait;

    struct DownStore;

    fn down<T>() -> Result<T, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    #[async_trait]
    impl TenantStore for DownStore {
        async fn user(&self, _: UserId) -> Result<Option<User>, StoreError> {
            down()
        }
        async fn user_by_username(&self, _: &str) -> Result<Option<User>, StoreError> {
            down()
        }
        async fn profile_for_user(&self, _: UserId) -> Result<Option<UserProfile>, StoreError> {
            down()
        }
        async fn customer(&self, _: CustomerId) -> Result<Option<Customer>, StoreError> {
            down()
        }
        async fn subscriptions_for(&self, _: CustomerId) -> Result<Vec<Subscription>, StoreError> {
            down()
        }
        async fn insert_event(&self, _: DetectionEvent) -> Result<DetectionEvent, StoreError> {
            down()
        }
        async fn events_for(&self, _: CustomerId) -> Result<Vec<DetectionEvent>, StoreError> {
            down()
        }
        async fn ping(&self) -> Result<(), StoreError> {
            down()
        }
    }

    #[tokio::test]
    async fn test_reachable_store_is_healthy() {
        let health = HealthResponse::check(&InMemoryStore::new(), Utc::now()).await;
        assert!(health.is_healthy());
        assert_eq!(health.store, "ok");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_degraded() {
        let health = HealthResponse::check(&DownStore, Utc::now()).await;
        assert!(!health.is_healthy());
        assert_eq!(health.status, "degraded");
        assert_eq!(health.store, "unavailable");
    }
}
