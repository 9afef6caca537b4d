// ABOUTME: JWT-based staff authentication and password hashing
// ABOUTME: Issues and validates HS256 tokens carrying role and service center claims
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 CouponHub Contributors

//! # Authentication
//!
//! Tokens are HS256 JWTs signed with the configured secret and bound to the configured
//! issuer and audience. Besides the standard claims they carry the user's role and,
//! for Admins, the service center they operate, so authorization never needs a
//! database round trip.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::constants::auth::AUTH_PROVIDER_INTERNAL;
use crate::errors::{AppError, AppResult};
use crate::models::User;
use crate::permissions::{effective_service_center_id, UserRole, INSUFFICIENT_PERMISSIONS};

/// `JWT` validation error with detailed information
#[derive(Debug, Clone, Error)]
pub enum JwtValidationError {
    /// Token has expired
    #[error("JWT token expired at {}", .expired_at.format("%Y-%m-%d %H:%M:%S UTC"))]
    TokenExpired {
        /// When the token expired
        expired_at: DateTime<Utc>,
    },
    /// Token signature, issuer or audience is invalid
    #[error("JWT token is invalid: {reason}")]
    TokenInvalid {
        /// Reason for invalidity
        reason: String,
    },
    /// Token is malformed (not proper `JWT` format)
    #[error("JWT token is malformed: {details}")]
    TokenMalformed {
        /// Details about malformation
        details: String,
    },
}

impl From<JwtValidationError> for AppError {
    fn from(error: JwtValidationError) -> Self {
        match error {
            JwtValidationError::TokenExpired { .. } => Self::auth_expired(),
            other => Self::auth_invalid(other.to_string()),
        }
    }
}

/// `JWT` claims for staff authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// User `ID`
    pub sub: String,
    /// Given name
    pub name: String,
    /// Family name
    pub last_name: String,
    /// User email
    pub email: String,
    /// Contact number
    pub mobile_number: String,
    /// Role used for authorization
    pub role: UserRole,
    /// Whether the account was active when the token was issued
    pub is_active: bool,
    /// Service center of an Admin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_center_id: Option<i64>,
    /// Which login flow issued the token
    pub auth_provider: String,
    /// Issuer
    pub iss: String,
    /// Audience (who the token is intended for)
    pub aud: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Authenticated caller extracted from a validated token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// User `ID`
    pub user_id: i64,
    /// User email
    pub email: String,
    /// Role used for authorization
    pub role: UserRole,
    /// Service center of an Admin
    pub service_center_id: Option<i64>,
}

impl AuthUser {
    /// Require a `SuperAdmin` or `Admin`
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for other roles
    pub fn require_staff(&self) -> AppResult<()> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::permission_denied(INSUFFICIENT_PERMISSIONS))
        }
    }

    /// Require a `SuperAdmin`
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for other roles
    pub fn require_super_admin(&self) -> AppResult<()> {
        if self.role == UserRole::SuperAdmin {
            Ok(())
        } else {
            Err(AppError::permission_denied(INSUFFICIENT_PERMISSIONS))
        }
    }

    /// Service center this caller may work with for a request
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when the role has no service center scope
    pub fn effective_service_center_id(&self, requested: Option<i64>) -> AppResult<Option<i64>> {
        effective_service_center_id(Some(self.role), self.service_center_id, requested)
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> AppResult<Self> {
        let user_id = claims
            .sub
            .parse()
            .map_err(|_| AppError::auth_invalid("Token subject is not a user id"))?;
        Ok(Self {
            user_id,
            email: claims.email,
            role: claims.role,
            service_center_id: claims.service_center_id,
        })
    }
}

/// Issues and validates `JWT` tokens
#[derive(Clone)]
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    token_expiry: Duration,
}

impl AuthManager {
    /// Create a new authentication manager from the auth configuration
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            token_expiry: Duration::minutes(config.jwt_expiry_minutes),
        }
    }

    /// Token lifetime
    #[must_use]
    pub const fn token_expiry(&self) -> Duration {
        self.token_expiry
    }

    /// Generate a `JWT` token for a user
    ///
    /// # Errors
    ///
    /// Returns an error if token encoding fails
    pub fn generate_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            mobile_number: user.mobile_number.clone(),
            role: user.role,
            is_active: user.is_active,
            service_center_id: user.service_center_id,
            auth_provider: AUTH_PROVIDER_INTERNAL.to_owned(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + self.token_expiry).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }

    /// Validate a token and return its claims
    ///
    /// # Errors
    ///
    /// Returns a `JwtValidationError` describing why the token was rejected
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtValidationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below so the error can say when the token expired
        validation.validate_exp = false;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience
                | ErrorKind::InvalidAlgorithm => JwtValidationError::TokenInvalid {
                    reason: e.to_string(),
                },
                _ => JwtValidationError::TokenMalformed {
                    details: e.to_string(),
                },
            })?
            .claims;

        let now = Utc::now();
        if now.timestamp() >= claims.exp {
            let expired_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(now);
            warn!(user.id = %claims.sub, expired_at = %expired_at.to_rfc3339(), "JWT token expired");
            return Err(JwtValidationError::TokenExpired { expired_at });
        }

        debug!(user.id = %claims.sub, "JWT token validated");
        Ok(claims)
    }

    /// Authenticate a request from its `Authorization: Bearer` header
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` when the header is missing and `AuthInvalid` /
    /// `AuthExpired` when the token is rejected
    pub fn authenticate(&self, headers: &HeaderMap) -> AppResult<AuthUser> {
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(AppError::auth_required)?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::auth_invalid("Authorization header must use the Bearer scheme"))?;

        let claims = self.validate_token(token)?;
        if !claims.is_active {
            return Err(AppError::auth_invalid("User account is inactive"));
        }
        AuthUser::try_from(claims)
    }
}

/// Hash a password with bcrypt on the blocking thread pool
///
/// # Errors
///
/// Returns an error if hashing fails or the blocking task panics
pub async fn hash_password(password: String) -> AppResult<String> {
    task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a bcrypt hash on the blocking thread pool
///
/// Malformed hashes verify as `false`.
///
/// # Errors
///
/// Returns an error if the blocking task panics
pub async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::http::HeaderValue;

    fn manager() -> AuthManager {
        AuthManager::new(&ServerConfig::default().auth)
    }

    fn admin() -> User {
        User {
            id: 42,
            first_name: "Meera".to_owned(),
            last_name: "Iyer".to_owned(),
            email: "meera@example.com".to_owned(),
            mobile_number: "9000000001".to_owned(),
            role: UserRole::Admin,
            password_hash: None,
            service_center_id: Some(3),
            service_center_name: Some("Indiranagar".to_owned()),
            created_at: Utc::now(),
            is_active: true,
        }
    }

    #[test]
    fn test_token_round_trip_carries_scope() {
        let auth = manager();
        let token = auth.generate_token(&admin()).unwrap();
        let claims = auth.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.service_center_id, Some(3));
        assert_eq!(claims.auth_provider, "internal");
        assert_eq!(claims.iss, "couponhub");
        assert_eq!(claims.aud, "couponhub_clients");
    }

    #[test]
    fn test_token_signed_with_other_secret_is_invalid() {
        let mut other = ServerConfig::default().auth;
        other.jwt_secret = "another-secret".to_owned();
        let token = AuthManager::new(&other).generate_token(&admin()).unwrap();

        let err = manager().validate_token(&token).unwrap_err();
        assert!(matches!(err, JwtValidationError::TokenInvalid { .. }));
    }

    #[test]
    fn test_wrong_audience_is_invalid() {
        let mut other = ServerConfig::default().auth;
        other.jwt_audience = "someone_else".to_owned();
        let token = AuthManager::new(&other).generate_token(&admin()).unwrap();

        let err = manager().validate_token(&token).unwrap_err();
        assert!(matches!(err, JwtValidationError::TokenInvalid { .. }));
    }

    #[test]
    fn test_expired_token_is_reported_as_expired() {
        let mut config = ServerConfig::default().auth;
        config.jwt_expiry_minutes = -5;
        let auth = AuthManager::new(&config);
        let token = auth.generate_token(&admin()).unwrap();

        let err = auth.validate_token(&token).unwrap_err();
        assert!(matches!(err, JwtValidationError::TokenExpired { .. }));
        assert_eq!(AppError::from(err).http_status(), 401);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = manager().validate_token("not-a-jwt").unwrap_err();
        assert!(matches!(err, JwtValidationError::TokenMalformed { .. }));
    }

    #[test]
    fn test_authenticate_reads_bearer_header() {
        let auth = manager();
        let token = auth.generate_token(&admin()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );

        let user = auth.authenticate(&headers).unwrap();
        assert_eq!(user.user_id, 42);
        assert_eq!(user.effective_service_center_id(Some(8)).unwrap(), Some(3));
        assert!(user.require_staff().is_ok());
        assert!(user.require_super_admin().is_err());
    }

    #[test]
    fn test_authenticate_without_header_requires_auth() {
        let err = manager().authenticate(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.http_status(), 401);
    }

    #[tokio::test]
    async fn test_password_hash_and_verify() {
        let hash = hash_password("secret123".to_owned()).await.unwrap();
        assert!(verify_password("secret123".to_owned(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".to_owned(), hash).await.unwrap());
        assert!(!verify_password("x".to_owned(), "not-a-hash".to_owned()).await.unwrap());
    }
}
