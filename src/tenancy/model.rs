//! Tenant Data Model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Customer identity (the license key)
pub type CustomerId = Uuid;

/// User account ID
pub type UserId = Uuid;

/// Module slugs referenced from code
pub mod slugs {
    /// Base PPE detection
    pub const PPE: &str = "ppe";
    /// AI reporting
    pub const PPE_LLM: &str = "ppe_llm";
    /// Drone support
    pub const PPE_DRONE: &str = "ppe_drone";
}

/// Tenant
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    /// License key, generated once and never reassigned
    #[schema(value_type = String, format = Uuid)]
    pub license_key: CustomerId,
    /// Display name
    pub name: String,
    /// Cleared when the account lapses
    pub is_active: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Create new active customer with a fresh license key
    pub fn new(name: &str) -> Self {
        Self {
            license_key: Uuid::new_v4(),
            name: name.to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// User account
#[derive(Debug, Clone)]
pub struct User {
    /// Account ID
    pub id: UserId,
    /// Unique login name
    pub username: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Platform administrator
    pub is_superuser: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Profile role, display only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProfileRole {
    /// Tenant administrator
    Admin,
    /// Site manager
    Manager,
    /// Regular staff
    #[default]
    Staff,
}

/// Links one user to its customer
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    /// Account
    #[schema(value_type = String, format = Uuid)]
    pub user_id: UserId,
    /// Owning customer
    #[schema(value_type = String, format = Uuid)]
    pub customer: CustomerId,
    /// Display role
    pub role: ProfileRole,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Licensable feature area
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Module {
    /// Stable identifier used in code
    pub slug: String,
    /// Display name
    pub name: String,
    /// Marketing text
    #[serde(default)]
    pub description: String,
    /// Monthly price
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// A customer's time-bounded entitlement to one module
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Subscription {
    /// Subscription ID
    pub id: Uuid,
    /// Subscribing customer
    #[schema(value_type = String, format = Uuid)]
    pub customer: CustomerId,
    /// Module slug
    pub module: String,
    /// Cleared to suspend without deleting
    pub is_active: bool,
    /// End of the paid period
    pub expiration_date: DateTime<Utc>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Active and not yet expired at `now`
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expiration_date > now
    }

    /// Active and expiring today or later, by calendar day (UTC)
    pub fn is_current_on(&self, today: NaiveDate) -> bool {
        self.is_active && self.expiration_date.date_naive() >= today
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn subscription(active: bool, expiration_date: DateTime<Utc>) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            customer: Uuid::new_v4(),
            module: slugs::PPE.into(),
            is_active: active,
            expiration_date,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validity_uses_full_precision() {
        let now = Utc::now();
        assert!(subscription(true, now + Duration::minutes(1)).is_valid(now));
        assert!(!subscription(true, now).is_valid(now));
        assert!(!subscription(false, now + Duration::days(30)).is_valid(now));
    }

    #[test]
    fn test_current_on_uses_calendar_days() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let later_today = today.and_hms_opt(23, 59, 0).unwrap().and_utc();
        let tomorrow = (today + Duration::days(1)).and_hms_opt(0, 5, 0).unwrap().and_utc();
        let yesterday = (today - Duration::days(1)).and_hms_opt(23, 59, 0).unwrap().and_utc();

        assert!(subscription(true, later_today).is_current_on(today));
        assert!(subscription(true, tomorrow).is_current_on(today));
        assert!(!subscription(true, yesterday).is_current_on(today));
        assert!(!subscription(false, tomorrow).is_current_on(today));
    }
}
