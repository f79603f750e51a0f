//! Authentication: resolving a request to a principal

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use publish_core::{Principal, RpcError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (numeric user ID)
    pub sub: String,
    /// Expiration time
    pub exp: i64,
    /// Issued at
    pub iat: Option<i64>,
    /// Issuer
    pub iss: Option<String>,
    /// SDK address assigned to the user
    #[serde(default)]
    pub sdk: Option<String>,
}

/// Authentication failures
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("authentication required")]
    MissingToken,

    #[error("invalid Authorization header format")]
    MalformedHeader,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("token subject {0:?} is not a user id")]
    InvalidSubject(String),

    #[error("JWT secret not configured")]
    NotConfigured,
}

impl From<&AuthError> for RpcError {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::MissingToken => RpcError::auth_required(err.to_string()),
            AuthError::NotConfigured => RpcError::internal(err),
            _ => RpcError::auth_failed(err.to_string()),
        }
    }
}

/// Resolves the principal a request executes as
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError>;
}

/// Validate a JWT token and extract claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Token validation failed: {}", e);
            AuthError::InvalidToken
        })
}

/// Convert claims to a principal
pub fn claims_to_principal(claims: Claims) -> Result<Principal, AuthError> {
    if claims.exp < Utc::now().timestamp() {
        return Err(AuthError::InvalidToken);
    }
    let id = claims
        .sub
        .parse::<u64>()
        .map_err(|_| AuthError::InvalidSubject(claims.sub.clone()))?;
    Ok(Principal::new(id, claims.sdk))
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}

/// Authenticates `Authorization: Bearer <jwt>` headers
pub struct JwtAuthenticator {
    secret: Option<String>,
}

impl JwtAuthenticator {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let auth_header = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::MalformedHeader)?;

        let token = extract_bearer_token(auth_header).ok_or(AuthError::MalformedHeader)?;
        let secret = self.secret.as_deref().ok_or(AuthError::NotConfigured)?;

        claims_to_principal(validate_token(token, secret)?)
    }
}

/// Accepts every request as a fixed development principal
pub struct DevAuthenticator {
    principal: Principal,
}

impl DevAuthenticator {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }
}

#[async_trait]
impl Authenticator for DevAuthenticator {
    async fn authenticate(&self, _headers: &HeaderMap) -> Result<Principal, AuthError> {
        Ok(self.principal.clone())
    }
}

/// A principal cleared to call its SDK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkPrincipal {
    pub id: u64,
    pub sdk_address: String,
}

/// Authenticate the request and require an assigned SDK address
pub async fn authorize(
    authenticator: &dyn Authenticator,
    headers: &HeaderMap,
) -> Result<SdkPrincipal, RpcError> {
    let principal = authenticator.authenticate(headers).await.map_err(|e| {
        tracing::debug!(error = %e, "request rejected by authentication");
        RpcError::from(&e)
    })?;

    match principal.sdk_address() {
        Some(sdk_address) => Ok(SdkPrincipal {
            id: principal.id,
            sdk_address: sdk_address.to_string(),
        }),
        None => {
            tracing::error!("user {} does not have sdk address assigned", principal.id);
            Err(RpcError::internal("user does not have sdk address assigned"))
        }
    }
}

/// Principal used when authentication is disabled
pub fn dev_principal(sdk_address: Option<String>) -> Principal {
    Principal::new(0, sdk_address)
}
