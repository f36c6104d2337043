//! Authentication middleware
//!
//! Resolves the caller of every request from a bearer token or the session
//! cookie. Resolution never rejects a request: anything that does not
//! verify becomes an anonymous caller and enforcement happens downstream.

use crate::tenancy::{TenantStore, UserId};
use crate::ApiState;
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Resolved identity of a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Caller {
    /// No valid session
    #[default]
    Anonymous,
    /// Logged-in account
    User(AuthenticatedUser),
}

/// Authenticated account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Account ID
    pub user_id: UserId,
    /// Login name
    pub username: String,
    /// Platform administrator
    pub is_superuser: bool,
}

impl Caller {
    /// Logged in as a superuser
    pub fn is_superuser(&self) -> bool {
        matches!(self, Caller::User(u) if u.is_superuser)
    }

    /// The account, when logged in
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Caller::User(u) => Some(u),
            Caller::Anonymous => None,
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Caller>().cloned().unwrap_or_default())
    }
}

/// Identity resolution middleware
pub async fn identify(State(state): State<Arc<ApiState>>, mut request: Request, next: Next) -> Response {
    let caller = resolve_caller(&state, request.headers()).await;
    request.extensions_mut().insert(caller);
    next.run(request).await
}

async fn resolve_caller(state: &ApiState, headers: &HeaderMap) -> Caller {
    let Some(token) = bearer_token(headers).or_else(|| session_cookie(headers, &state.tokens.cookie_name)) else {
        return Caller::Anonymous;
    };

    let claims = match state.tokens.verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Ignoring credentials: {}", e);
            return Caller::Anonymous;
        }
    };

    let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
        return Caller::Anonymous;
    };

    match state.store.user(user_id).await {
        Ok(Some(user)) => Caller::User(AuthenticatedUser {
            user_id: user.id,
            username: user.username,
            is_superuser: user.is_superuser,
        }),
        Ok(None) => Caller::Anonymous,
        Err(e) => {
            tracing::warn!("User lookup failed during identity resolution: {}", e);
            Caller::Anonymous
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
}

fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.is_empty())
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Login name
    pub username: String,
    /// Issued at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

/// Issues and verifies session tokens
pub struct TokenService {
    secret: String,
    lifetime_minutes: i64,
    /// Session cookie name
    pub cookie_name: String,
}

impl TokenService {
    /// Token service signing with `secret`
    pub fn new(secret: &str, lifetime_minutes: i64, cookie_name: &str) -> Self {
        Self {
            secret: secret.to_string(),
            lifetime_minutes,
            cookie_name: cookie_name.to_string(),
        }
    }

    /// Token lifetime in seconds
    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_minutes * 60
    }

    /// Issue a token for a user
    pub fn issue(&self, user_id: UserId, username: &str) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now,
            exp: now + self.lifetime_secs(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Failed to issue token: {}", e)))
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        })
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"<redacted>")
            .field("lifetime_minutes", &self.lifetime_minutes)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

/// Hash a password with Argon2id
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Internal(format!("Password hashing error: {}", e)))
}

/// Check a password against a stored hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(password_hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Authentication error
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// Unknown user or wrong password
    #[error("invalid username or password")]
    InvalidCredentials,
    /// Malformed or badly signed token
    #[error("invalid token")]
    InvalidToken,
    /// Token past its expiry
    #[error("token expired")]
    ExpiredToken,
    /// Hashing or signing failure
    #[error("internal error: {0}")]
    Internal(String),
}
