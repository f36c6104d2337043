//! Tenants, modules and subscriptions

pub mod fixtures;
pub mod model;
pub mod store;

pub use fixtures::Fixtures;
pub use model::{Customer, CustomerId, Module, ProfileRole, Subscription, User, UserId, UserProfile};
pub use store::{InMemoryStore, StoreError, TenantStore};
