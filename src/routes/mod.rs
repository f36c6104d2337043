//! API Routes

pub mod dashboard;
pub mod events;
pub mod features;
pub mod health;
pub mod profile;
pub mod session;

use crate::error::ApiError;
use crate::middleware::auth::{AuthenticatedUser, Caller};
use crate::tenancy::Customer;
use crate::ApiState;

/// Authenticated caller or 401
pub(crate) fn require_user(caller: &Caller) -> Result<&AuthenticatedUser, ApiError> {
    caller.user().ok_or(ApiError::Unauthenticated)
}

/// Caller's own customer; 401 when anonymous, 403 without a profile
pub(crate) async fn require_tenant<'a>(
    state: &ApiState,
    caller: &'a Caller,
) -> Result<(&'a AuthenticatedUser, Customer), ApiError> {
    let user = require_user(caller)?;
    let customer = state
        .store
        .customer_for_user(user.user_id)
        .await?
        .ok_or(ApiError::NoProfile)?;
    Ok((user, customer))
}
