//! JWT authentication module.
//!
//! Handles token generation and validation, and the HTTP-only cookies the
//! tokens travel in.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clinic_core::{Capability, Role, User};

use crate::error::ApiError;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Which of the two tokens a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub username: String,

    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    pub token_type: TokenType,
}

/// The authenticated caller, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn has(&self, capability: Capability) -> bool {
        self.role.has(capability)
    }
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        CurrentUser {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

/// JWT token manager.
#[derive(Clone)]
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_lifetime_secs: i64,
    refresh_lifetime_secs: i64,
    cookie_secure: bool,
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: &str, access_lifetime_secs: i64, refresh_lifetime_secs: i64) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_lifetime_secs,
            refresh_lifetime_secs,
            cookie_secure: false,
        }
    }

    /// Mark issued cookies `Secure`.
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    fn generate(
        &self,
        user_id: &str,
        username: &str,
        role: Role,
        token_type: TokenType,
    ) -> Result<String, ApiError> {
        let lifetime = match token_type {
            TokenType::Access => self.access_lifetime_secs,
            TokenType::Refresh => self.refresh_lifetime_secs,
        };
        let now = Utc::now();
        let exp = now + Duration::seconds(lifetime);

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Generate an access token.
    pub fn generate_access_token(&self, user_id: &str, username: &str, role: Role) -> Result<String, ApiError> {
        self.generate(user_id, username, role, TokenType::Access)
    }

    /// Generate a refresh token.
    pub fn generate_refresh_token(&self, user_id: &str, username: &str, role: Role) -> Result<String, ApiError> {
        self.generate(user_id, username, role, TokenType::Refresh)
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let token_data: TokenData<Claims> = decode(token, &self.decoding, &validation)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(token_data.claims)
    }

    /// Validate that a token is an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != TokenType::Access {
            return Err(ApiError::Unauthorized("Expected access token".to_string()));
        }

        Ok(claims)
    }

    /// Validate that a token is a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != TokenType::Refresh {
            return Err(ApiError::Unauthorized("Expected refresh token".to_string()));
        }

        Ok(claims)
    }

    /// Issues a fresh access and refresh cookie pair for a user.
    pub fn session_cookies(&self, user: &User) -> Result<(Cookie<'static>, Cookie<'static>), ApiError> {
        let access = self.generate_access_token(&user.id, &user.username, user.role)?;
        let refresh = self.generate_refresh_token(&user.id, &user.username, user.role)?;
        Ok((self.access_cookie(access), self.refresh_cookie(refresh)))
    }

    pub fn access_cookie(&self, token: String) -> Cookie<'static> {
        self.cookie(ACCESS_COOKIE, token, self.access_lifetime_secs)
    }

    pub fn refresh_cookie(&self, token: String) -> Cookie<'static> {
        self.cookie(REFRESH_COOKIE, token, self.refresh_lifetime_secs)
    }

    /// An expired, empty cookie that makes the browser drop `name`.
    pub fn removal_cookie(&self, name: &'static str) -> Cookie<'static> {
        let mut cookie = self.cookie(name, String::new(), 0);
        cookie.make_removal();
        cookie
    }

    fn cookie(&self, name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.cookie_secure)
            .max_age(time::Duration::seconds(max_age_secs))
            .build()
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new("test-secret", 900, 86400)
    }

    #[test]
    fn test_jwt_roundtrip() {
        let access_token = manager()
            .generate_access_token("user-001", "optician", Role::Optical)
            .unwrap();

        let claims = manager().validate_access_token(&access_token).unwrap();

        assert_eq!(claims.sub, "user-001");
        assert_eq!(claims.username, "optician");
        assert_eq!(claims.role, Role::Optical);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_wrong_token_type() {
        let access_token = manager()
            .generate_access_token("user-001", "optician", Role::Optical)
            .unwrap();
        assert!(manager().validate_refresh_token(&access_token).is_err());

        let refresh_token = manager()
            .generate_refresh_token("user-001", "optician", Role::Optical)
            .unwrap();
        assert!(manager().validate_access_token(&refresh_token).is_err());
        assert!(manager().validate_refresh_token(&refresh_token).is_ok());
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = JwtManager::new("another-secret", 900, 86400)
            .generate_access_token("user-001", "optician", Role::Optical)
            .unwrap();
        assert!(manager().validate_access_token(&token).is_err());
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = manager().with_secure_cookies(true).access_cookie("abc".to_string());
        assert_eq!(cookie.name(), ACCESS_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_bearer_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
