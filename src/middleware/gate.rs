//! Subscription gate middleware
//!
//! Every non-exempt request from a tenant user is checked against the
//! tenant's account and subscription state. Lapsed tenants are redirected
//! to the suspended page. The gate is a triage aid rather than a security
//! boundary, so lookup failures let the request through.

use crate::middleware::auth::Caller;
use crate::tenancy::{StoreError, TenantStore, UserId};
use crate::ApiState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Gate configuration, fixed at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Path prefixes that bypass the check
    pub exempt_prefixes: Vec<String>,
    /// Where lapsed tenants are sent
    pub suspended_path: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            exempt_prefixes: vec![
                "/admin/".into(),
                "/login/".into(),
                "/service-suspended/".into(),
                "/logout/".into(),
                "/static/".into(),
                "/media/".into(),
            ],
            suspended_path: "/service-suspended/".into(),
        }
    }
}

/// Gate verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the request through
    Allow(AllowReason),
    /// Send the caller to the suspended page
    Redirect {
        /// Redirect target
        location: String,
        /// Why the tenant was turned away
        reason: DenyReason,
    },
}

impl GateDecision {
    /// Whether the request proceeds
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow(_))
    }
}

/// Why a request was let through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    /// Path is exempt
    ExemptPath,
    /// Not logged in
    Anonymous,
    /// Superusers are never gated
    Superuser,
    /// Account has no customer
    NoProfile,
    /// At least one subscription is current
    SubscriptionCurrent,
    /// Already on the suspended page
    OnSuspendedPage,
    /// Store error; the gate fails open
    LookupFailed,
}

/// Why a tenant was redirected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Customer account deactivated
    CustomerInactive,
    /// Customer holds no subscriptions
    NoSubscriptions,
    /// Every subscription is inactive or expired
    SubscriptionsLapsed,
}

/// Tenant account state as the gate sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccountStatus {
    NoProfile,
    Lapsed(DenyReason),
    Current,
}

/// Subscription gate
pub struct AccessGate {
    config: GateConfig,
    store: Arc<dyn TenantStore>,
}

impl AccessGate {
    /// Gate over `store`
    pub fn new(config: GateConfig, store: Arc<dyn TenantStore>) -> Self {
        Self { config, store }
    }

    /// Exempt by prefix, or by containing "logout" anywhere in any case
    pub fn is_exempt(&self, path: &str) -> bool {
        self.config.exempt_prefixes.iter().any(|p| path.starts_with(p.as_str()))
            || path.to_lowercase().contains("logout")
    }

    /// Decide whether a request may proceed
    pub async fn evaluate(&self, path: &str, caller: &Caller, now: DateTime<Utc>) -> GateDecision {
        if self.is_exempt(path) {
            tracing::debug!(path, "Gate: exempt path");
            return GateDecision::Allow(AllowReason::ExemptPath);
        }

        let user = match caller {
            Caller::Anonymous => {
                tracing::debug!(path, "Gate: anonymous caller");
                return GateDecision::Allow(AllowReason::Anonymous);
            }
            Caller::User(user) if user.is_superuser => {
                tracing::debug!(path, user = %user.username, "Gate: superuser");
                return GateDecision::Allow(AllowReason::Superuser);
            }
            Caller::User(user) => user,
        };

        let status = match self.account_status(user.user_id, now.date_naive()).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(path, user = %user.username, "Gate: lookup failed, allowing: {}", e);
                return GateDecision::Allow(AllowReason::LookupFailed);
            }
        };

        match status {
            AccountStatus::NoProfile => {
                tracing::debug!(path, user = %user.username, "Gate: no profile");
                GateDecision::Allow(AllowReason::NoProfile)
            }
            AccountStatus::Current => GateDecision::Allow(AllowReason::SubscriptionCurrent),
            AccountStatus::Lapsed(reason) if path == self.config.suspended_path => {
                tracing::debug!(path, user = %user.username, ?reason, "Gate: already on suspended page");
                GateDecision::Allow(AllowReason::OnSuspendedPage)
            }
            AccountStatus::Lapsed(reason) => {
                tracing::info!(path, user = %user.username, ?reason, "Gate: redirecting lapsed tenant");
                GateDecision::Redirect {
                    location: self.config.suspended_path.clone(),
                    reason,
                }
            }
        }
    }

    async fn account_status(&self, user_id: UserId, today: NaiveDate) -> Result<AccountStatus, StoreError> {
        let Some(profile) = self.store.profile_for_user(user_id).await? else {
            return Ok(AccountStatus::NoProfile);
        };

        let customer = self
            .store
            .customer(profile.customer)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("customer {}", profile.customer)))?;

        if !customer.is_active {
            return Ok(AccountStatus::Lapsed(DenyReason::CustomerInactive));
        }

        let subscriptions = self.store.subscriptions_for(customer.license_key).await?;
        if subscriptions.is_empty() {
            return Ok(AccountStatus::Lapsed(DenyReason::NoSubscriptions));
        }

        if subscriptions.iter().any(|s| s.is_current_on(today)) {
            Ok(AccountStatus::Current)
        } else {
            Ok(AccountStatus::Lapsed(DenyReason::SubscriptionsLapsed))
        }
    }
}

/// Gate middleware; runs after identity resolution
pub async fn subscription_gate(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    request: Request,
    next: Next,
) -> Response {
    let now = Utc::now();
    let path = request.uri().path().to_string();

    match state.gate.evaluate(&path, &caller, now).await {
        GateDecision::Allow(_) => next.run(request).await,
        GateDecision::Redirect { location, .. } => {
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
    }
}
