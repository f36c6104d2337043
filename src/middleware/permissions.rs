//! Module permissions
//!
//! Paid features are gated on an active, unexpired subscription to one
//! module. Unlike the subscription gate this check fails closed: a caller
//! that does not resolve to a tenant is denied.

use crate::middleware::auth::Caller;
use crate::tenancy::TenantStore;
use chrono::{DateTime, Utc};

/// Permission check for a single module slug
#[derive(Debug, Clone, Copy)]
pub struct ModuleGate<'a> {
    slug: &'a str,
    allow_superuser: bool,
}

impl<'a> ModuleGate<'a> {
    /// Check for `slug`, denying superusers without a subscription
    pub fn new(slug: &'a str) -> Self {
        Self { slug, allow_superuser: false }
    }

    /// Let superusers through regardless of subscriptions
    pub fn allow_superuser(mut self) -> Self {
        self.allow_superuser = true;
        self
    }

    /// Module slug being checked
    pub fn slug(&self) -> &str {
        self.slug
    }

    /// Whether `caller` may use the module at `now`
    pub async fn check(&self, store: &dyn TenantStore, caller: &Caller, now: DateTime<Utc>) -> bool {
        if self.allow_superuser && caller.is_superuser() {
            return true;
        }
        has_module_permission(store, caller, self.slug, now).await
    }
}

/// Whether the caller's tenant holds a valid subscription to `slug`
pub async fn has_module_permission(
    store: &dyn TenantStore,
    caller: &Caller,
    slug: &str,
    now: DateTime<Utc>,
) -> bool {
    let Some(user) = caller.user() else {
        return false;
    };

    let customer = match store.customer_for_user(user.user_id).await {
        Ok(Some(customer)) => customer,
        Ok(None) => return false,
        Err(e) => {
            tracing::warn!(user = %user.username, slug, "Module check lookup failed: {}", e);
            return false;
        }
    };

    match store.has_valid_subscription(customer.license_key, slug, now).await {
        Ok(allowed) => allowed,
        Err(e) => {
            tracing::warn!(user = %user.username, slug, "Module check lookup failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::AuthenticatedUser;
    use crate::tenancy::model::{slugs, Module, ProfileRole, UserId};
    use crate::tenancy::InMemoryStore;
    use chrono::Duration;

    fn caller(user_id: UserId, is_superuser: bool) -> Caller {
        Caller::User(AuthenticatedUser {
            user_id,
            username: "user".into(),
            is_superuser,
        })
    }

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        for slug in [slugs::PPE, slugs::PPE_LLM, slugs::PPE_DRONE] {
            store
                .create_module(Module {
                    slug: slug.into(),
                    name: slug.into(),
                    description: String::new(),
                    price: None,
                })
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_exact_slug_required() {
        let store = store();
        let now = Utc::now();
        let acme = store.create_customer("Acme");
        let user = store.create_user("alice", "hash".into(), false).unwrap();
        store.attach_profile(user.id, acme.license_key, ProfileRole::Staff).unwrap();
        store
            .upsert_subscription(acme.license_key, slugs::PPE_LLM, true, now + Duration::days(10))
            .unwrap();

        let alice = caller(user.id, false);
        assert!(has_module_permission(&store, &alice, slugs::PPE_LLM, now).await);
        assert!(!has_module_permission(&store, &alice, slugs::PPE_DRONE, now).await);
        assert!(!has_module_permission(&store, &alice, "ppe_ll", now).await);
    }

    #[tokio::test]
    async fn test_expired_subscription_denied() {
        let store = store();
        let now = Utc::now();
        let acme = store.create_customer("Acme");
        let user = store.create_user("alice", "hash".into(), false).unwrap();
        store.attach_profile(user.id, acme.license_key, ProfileRole::Staff).unwrap();
        store
            .upsert_subscription(acme.license_key, slugs::PPE_LLM, true, now - Duration::seconds(1))
            .unwrap();

        assert!(!has_module_permission(&store, &caller(user.id, false), slugs::PPE_LLM, now).await);
    }

    #[tokio::test]
    async fn test_missing_profile_fails_closed() {
        let store = store();
        let user = store.create_user("orphan", "hash".into(), false).unwrap();

        assert!(!has_module_permission(&store, &caller(user.id, false), slugs::PPE, Utc::now()).await);
        assert!(!has_module_permission(&store, &Caller::Anonymous, slugs::PPE, Utc::now()).await);
    }

    #[tokio::test]
    async fn test_superuser_override_is_per_call_site() {
        let store = store();
        let root = store.create_user("root", "hash".into(), true).unwrap();
        let root = caller(root.id, true);
        let now = Utc::now();

        assert!(!ModuleGate::new(slugs::PPE_LLM).check(&store, &root, now).await);
        assert!(ModuleGate::new(slugs::PPE_DRONE).allow_superuser().check(&store, &root, now).await);
    }
}
