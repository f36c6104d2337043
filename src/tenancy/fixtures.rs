//! Fixtures loader
//!
//! Operators populate tenants, modules, subscriptions and accounts from a
//! JSON document at startup.

use crate::middleware::auth::{hash_password, AuthError};
use crate::tenancy::model::{Customer, Module, ProfileRole};
use crate::tenancy::store::{InMemoryStore, StoreError};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Fixtures document
#[derive(Debug, Default, Deserialize)]
pub struct Fixtures {
    /// Modules to register
    #[serde(default)]
    pub modules: Vec<Module>,
    /// Platform administrators
    #[serde(default)]
    pub superusers: Vec<AccountFixture>,
    /// Tenants with their subscriptions and users
    #[serde(default)]
    pub customers: Vec<CustomerFixture>,
}

/// Login account
#[derive(Debug, Deserialize)]
pub struct AccountFixture {
    /// Login name
    pub username: String,
    /// Plain-text password, hashed on load
    pub password: String,
    /// Profile role; ignored for superusers
    #[serde(default)]
    pub role: ProfileRole,
}

/// Tenant
#[derive(Debug, Deserialize)]
pub struct CustomerFixture {
    /// Display name
    pub name: String,
    /// Fixed license key; generated when absent
    #[serde(default)]
    pub license_key: Option<Uuid>,
    /// Defaults to true
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Module subscriptions
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionFixture>,
    /// Tenant users
    #[serde(default)]
    pub users: Vec<AccountFixture>,
}

/// Subscription
#[derive(Debug, Deserialize)]
pub struct SubscriptionFixture {
    /// Module slug
    pub module: String,
    /// Defaults to true
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Expiry
    pub expiration_date: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Load summary
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FixtureSummary {
    /// Modules registered
    pub modules: usize,
    /// Customers created
    pub customers: usize,
    /// Users created
    pub users: usize,
    /// Subscriptions created
    pub subscriptions: usize,
}

impl Fixtures {
    /// Read a fixtures file
    pub fn load(path: &str) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply to a store
    pub fn apply(&self, store: &InMemoryStore) -> Result<FixtureSummary, FixtureError> {
        let mut summary = FixtureSummary::default();

        for module in &self.modules {
            store.create_module(module.clone())?;
            summary.modules += 1;
        }

        for account in &self.superusers {
            store.create_user(&account.username, hash_password(&account.password)?, true)?;
            summary.users += 1;
        }

        for fixture in &self.customers {
            let mut customer = Customer::new(&fixture.name);
            if let Some(key) = fixture.license_key {
                customer.license_key = key;
            }
            customer.is_active = fixture.is_active;
            let customer = store.insert_customer(customer)?;
            summary.customers += 1;

            for sub in &fixture.subscriptions {
                store.upsert_subscription(
                    customer.license_key,
                    &sub.module,
                    sub.is_active,
                    sub.expiration_date,
                )?;
                summary.subscriptions += 1;
            }

            for account in &fixture.users {
                let user = store.create_user(&account.username, hash_password(&account.password)?, false)?;
                store.attach_profile(user.id, customer.license_key, account.role)?;
                summary.users += 1;
            }
        }

        tracing::info!(
            modules = summary.modules,
            customers = summary.customers,
            users = summary.users,
            subscriptions = summary.subscriptions,
            "Fixtures loaded"
        );
        Ok(summary)
    }
}

/// Fixture loading error
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// File could not be read
    #[error("cannot read fixtures: {0}")]
    Io(#[from] std::io::Error),
    /// File is not valid fixtures JSON
    #[error("invalid fixtures: {0}")]
    Parse(#[from] serde_json::Error),
    /// Store refused an entry
    #[error("fixture rejected by store: {0}")]
    Store(#[from] StoreError),
    /// Password hashing failed
    #[error("cannot hash fixture password: {0}")]
    Password(#[from] AuthError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenancy::store::TenantStore;

    const FIXTURES: &str = r#"{
        "modules": [
            {"slug": "ppe", "name": "PPE Detection", "price": "49.00"},
            {"slug": "ppe_llm", "name": "AI Reporting"}
        ],
        "superusers": [{"username": "root", "password": "rootpass"}],
        "customers": [{
            "name": "Acme",
            "subscriptions": [
                {"module": "ppe", "expiration_date": "2099-01-01T00:00:00Z"}
            ],
            "users": [{"username": "alice", "password": "secret", "role": "manager"}]
        }]
    }"#;

    #[tokio::test]
    async fn test_apply_fixtures() {
        let fixtures: Fixtures = serde_json::from_str(FIXTURES).unwrap();
        let store = InMemoryStore::new();
        let summary = fixtures.apply(&store).unwrap();

        assert_eq!(summary, FixtureSummary { modules: 2, customers: 1, users: 2, subscriptions: 1 });

        let alice = store.user_by_username("alice").await.unwrap().unwrap();
        assert!(!alice.is_superuser);
        let profile = store.profile_for_user(alice.id).await.unwrap().unwrap();
        assert_eq!(profile.role, ProfileRole::Manager);

        let root = store.user_by_username("root").await.unwrap().unwrap();
        assert!(root.is_superuser);
        assert!(store.profile_for_user(root.id).await.unwrap().is_none());
    }

    #[test]
    fn test_unknown_module_rejected() {
        let fixtures: Fixtures = serde_json::from_str(
            r#"{"customers": [{"name": "Acme", "subscriptions": [
                {"module": "missing", "expiration_date": "2099-01-01T00:00:00Z"}
            ]}]}"#,
        )
        .unwrap();
        let result = fixtures.apply(&InMemoryStore::new());
        assert!(matches!(result, Err(FixtureError::Store(StoreError::NotFound(_)))));
    }
}
