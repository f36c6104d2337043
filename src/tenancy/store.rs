//! Tenant & Subscription Store

use crate::detections::DetectionEvent;
use crate::tenancy::model::{
    Customer, CustomerId, Module, ProfileRole, Subscription, User, UserId, UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Read-side data access used while serving requests.
///
/// Every query is keyed by a customer (or by a user that resolves to one),
/// so callers cannot read across tenants through this trait.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Look up a user account
    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Look up a user account by login name
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Profile attached to a user, if any
    async fn profile_for_user(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError>;

    /// Look up a customer by license key
    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError>;

    /// All subscriptions held by a customer, valid or not
    async fn subscriptions_for(&self, customer: CustomerId) -> Result<Vec<Subscription>, StoreError>;

    /// Persist a detection event
    async fn insert_event(&self, event: DetectionEvent) -> Result<DetectionEvent, StoreError>;

    /// Events owned by a customer, newest first
    async fn events_for(&self, customer: CustomerId) -> Result<Vec<DetectionEvent>, StoreError>;

    /// Fails when the backing store cannot serve queries
    async fn ping(&self) -> Result<(), StoreError>;

    /// Resolve user -> profile -> customer
    async fn customer_for_user(&self, user_id: UserId) -> Result<Option<Customer>, StoreError> {
        match self.profile_for_user(user_id).await? {
            Some(profile) => self.customer(profile.customer).await,
            None => Ok(None),
        }
    }

    /// Whether the customer holds an active, unexpired subscription to `slug`.
    /// An inactive customer holds none.
    async fn has_valid_subscription(
        &self,
        customer: CustomerId,
        slug: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(self.valid_module_slugs(customer, now).await?.iter().any(|s| s == slug))
    }

    /// Slugs of every module the customer may currently use
    async fn valid_module_slugs(
        &self,
        customer: CustomerId,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        match self.customer(customer).await? {
            Some(c) if c.is_active => {}
            _ => return Ok(Vec::new()),
        }

        let mut slugs: Vec<String> = self
            .subscriptions_for(customer)
            .await?
            .into_iter()
            .filter(|s| s.is_valid(now))
            .map(|s| s.module)
            .collect();
        slugs.sort();
        Ok(slugs)
    }
}

/// In-memory store
#[derive(Default)]
pub struct InMemoryStore {
    users: Arc<RwLock<HashMap<UserId, User>>>,
    profiles: Arc<RwLock<HashMap<UserId, UserProfile>>>,
    customers: Arc<RwLock<HashMap<CustomerId, Customer>>>,
    modules: Arc<RwLock<HashMap<String, Module>>>,
    subscriptions: Arc<RwLock<HashMap<(CustomerId, String), Subscription>>>,
    events: Arc<RwLock<HashMap<CustomerId, Vec<DetectionEvent>>>>,
}

impl InMemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a customer with a fresh license key
    pub fn create_customer(&self, name: &str) -> Customer {
        let customer = Customer::new(name);
        self.customers.write().insert(customer.license_key, customer.clone());
        customer
    }

    /// Insert a customer carrying an existing license key
    pub fn insert_customer(&self, customer: Customer) -> Result<Customer, StoreError> {
        let mut customers = self.customers.write();
        if customers.contains_key(&customer.license_key) {
            return Err(StoreError::Duplicate(format!("license key {}", customer.license_key)));
        }
        customers.insert(customer.license_key, customer.clone());
        Ok(customer)
    }

    /// Activate or deactivate a customer account
    pub fn set_customer_active(&self, id: CustomerId, active: bool) -> Result<(), StoreError> {
        let mut customers = self.customers.write();
        let customer = customers
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("customer {}", id)))?;
        customer.is_active = active;
        Ok(())
    }

    /// Register a module
    pub fn create_module(&self, module: Module) -> Result<Module, StoreError> {
        let mut modules = self.modules.write();
        if modules.contains_key(&module.slug) {
            return Err(StoreError::Duplicate(format!("module {}", module.slug)));
        }
        modules.insert(module.slug.clone(), module.clone());
        Ok(module)
    }

    /// Create a user account from an already-hashed password
    pub fn create_user(
        &self,
        username: &str,
        password_hash: String,
        is_superuser: bool,
    ) -> Result<User, StoreError> {
        let mut users = self.users.write();
        if users.values().any(|u| u.username == username) {
            return Err(StoreError::Duplicate(format!("username {}", username)));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
            is_superuser,
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Attach the single profile of a user to a customer
    pub fn attach_profile(
        &self,
        user_id: UserId,
        customer: CustomerId,
        role: ProfileRole,
    ) -> Result<UserProfile, StoreError> {
        if !self.users.read().contains_key(&user_id) {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        if !self.customers.read().contains_key(&customer) {
            return Err(StoreError::NotFound(format!("customer {}", customer)));
        }

        let mut profiles = self.profiles.write();
        if profiles.contains_key(&user_id) {
            return Err(StoreError::Duplicate(format!("profile for user {}", user_id)));
        }
        let profile = UserProfile {
            user_id,
            customer,
            role,
            created_at: Utc::now(),
        };
        profiles.insert(user_id, profile.clone());
        Ok(profile)
    }

    /// Create or renew the subscription for a (customer, module) pair
    pub fn upsert_subscription(
        &self,
        customer: CustomerId,
        module: &str,
        is_active: bool,
        expiration_date: DateTime<Utc>,
    ) -> Result<Subscription, StoreError> {
        if !self.customers.read().contains_key(&customer) {
            return Err(StoreError::NotFound(format!("customer {}", customer)));
        }
        if !self.modules.read().contains_key(module) {
            return Err(StoreError::NotFound(format!("module {}", module)));
        }

        let mut subs = self.subscriptions.write();
        let sub = subs
            .entry((customer, module.to_string()))
            .and_modify(|s| {
                s.is_active = is_active;
                s.expiration_date = expiration_date;
            })
            .or_insert_with(|| Subscription {
                id: Uuid::new_v4(),
                customer,
                module: module.to_string(),
                is_active,
                expiration_date,
                created_at: Utc::now(),
            });
        Ok(sub.clone())
    }
}

#[async_trait]
impl TenantStore for InMemoryStore {
    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().values().find(|u| u.username == username).cloned())
    }

    async fn profile_for_user(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.read().get(&user_id).cloned())
    }

    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        Ok(self.customers.read().get(&id).cloned())
    }

    async fn subscriptions_for(&self, customer: CustomerId) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .subscriptions
            .read()
            .values()
            .filter(|s| s.customer == customer)
            .cloned()
            .collect())
    }

    async fn insert_event(&self, event: DetectionEvent) -> Result<DetectionEvent, StoreError> {
        if !self.customers.read().contains_key(&event.customer) {
            return Err(StoreError::NotFound(format!("customer {}", event.customer)));
        }
        self.events
            .write()
            .entry(event.customer)
            .or_default()
            .push(event.clone());
        Ok(event)
    }

    async fn events_for(&self, customer: CustomerId) -> Result<Vec<DetectionEvent>, StoreError> {
        let mut events = self
            .events
            .read()
            .get(&customer)
            .cloned()
            .unwrap_or_default();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Store error
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Referenced record does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// Unique key already taken
    #[error("duplicate: {0}")]
    Duplicate(String),
    /// Backing store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
