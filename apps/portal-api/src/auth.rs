//! Session cookie authentication.
//!
//! The `auth-user` cookie carries an HS256 JWT whose claims describe the
//! principal. A cookie that fails verification (bad signature, expired,
//! malformed) is treated exactly like a missing one.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use cookie::{Cookie, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use perkhub_core::{CoreError, Principal, UserRole};

use crate::config::PortalConfig;
use crate::error::ApiError;
use crate::AppState;

/// Name of the session cookie.
pub const AUTH_COOKIE: &str = "auth-user";

/// JWT claims stored in the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub email: String,
    pub name: String,
    pub role: UserRole,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Principal {
            id: claims.sub,
            role: claims.role,
            email: claims.email,
            name: claims.name,
            company_name: claims.company_name,
        }
    }
}

/// Issues and verifies session cookies.
pub struct SessionManager {
    secret: String,
    lifetime_secs: i64,
    secure: bool,
}

impl SessionManager {
    pub fn new(secret: impl Into<String>, lifetime_secs: i64, secure: bool) -> Self {
        SessionManager {
            secret: secret.into(),
            lifetime_secs,
            secure,
        }
    }

    pub fn from_config(config: &PortalConfig) -> Self {
        SessionManager::new(
            config.session_secret.clone(),
            config.session_lifetime_secs,
            config.secure_cookies,
        )
    }

    /// Signs a session token for `principal`.
    pub fn issue(&self, principal: &Principal) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: principal.id.clone(),
            email: principal.email.clone(),
            name: principal.name.clone(),
            role: principal.role,
            company_name: principal.company_name.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to sign session: {e}")))
    }

    /// Verifies a token, returning `None` for anything that does not check out.
    pub fn verify(&self, token: &str) -> Option<Principal> {
        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => Some(data.claims.into()),
            Err(e) => {
                debug!(error = %e, "Rejected session cookie");
                None
            }
        }
    }

    /// The principal carried by the request's `auth-user` cookie, if valid.
    pub fn principal_from_headers(&self, headers: &HeaderMap) -> Option<Principal> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|c| c.name() == AUTH_COOKIE)
            .and_then(|c| self.verify(c.value()))
    }

    /// `Set-Cookie` for a fresh session.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((AUTH_COOKIE, token))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .secure(self.secure)
            .max_age(cookie::time::Duration::seconds(self.lifetime_secs))
            .build()
    }

    /// `Set-Cookie` that expires the session.
    pub fn clear_cookie(&self) -> Cookie<'static> {
        Cookie::build((AUTH_COOKIE, ""))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .secure(self.secure)
            .max_age(cookie::time::Duration::ZERO)
            .build()
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// The caller's principal if a valid session cookie is present.
pub struct MaybePrincipal(pub Option<Principal>);

impl FromRequestParts<Arc<AppState>> for MaybePrincipal {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybePrincipal(
            state.sessions.principal_from_headers(&parts.headers),
        ))
    }
}

/// The caller's principal; rejects with 401 when there is no valid session.
pub struct Authenticated(pub Principal);

impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        state
            .sessions
            .principal_from_headers(&parts.headers)
            .map(Authenticated)
            .ok_or_else(|| CoreError::Unauthenticated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn manager() -> SessionManager {
        SessionManager::new("test-secret-key-for-unit-tests-only", 3600, false)
    }

    fn principal() -> Principal {
        Principal {
            id: "user-1".to_string(),
            role: UserRole::Employee,
            email: "jane@acme.test".to_string(),
            name: "Jane".to_string(),
            company_name: Some("Acme Corp".to_string()),
        }
    }

    fn headers_with(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_session_roundtrip() {
        let manager = manager();
        let token = manager.issue(&principal()).unwrap();

        let verified = manager.verify(&token).unwrap();
        assert_eq!(verified, principal());
    }

    #[test]
    fn test_tampered_token_is_absent() {
        let manager = manager();
        let token = manager.issue(&principal()).unwrap();

        // Flip one character in the payload segment.
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let payload = &mut parts[1];
        let last = payload.pop().unwrap();
        payload.push(if last == 'A' { 'B' } else { 'A' });
        let tampered = parts.join(".");

        assert!(manager.verify(&tampered).is_none());
        assert!(manager.verify("not-a-jwt").is_none());
    }

    #[test]
    fn test_foreign_secret_is_absent() {
        let token = manager().issue(&principal()).unwrap();
        let other = SessionManager::new("another-secret-entirely-different", 3600, false);
        assert!(other.verify(&token).is_none());
    }

    #[test]
    fn test_expired_session_is_absent() {
        let manager = SessionManager::new("test-secret-key-for-unit-tests-only", -3600, false);
        let token = manager.issue(&principal()).unwrap();
        assert!(manager.verify(&token).is_none());
    }

    #[test]
    fn test_principal_from_cookie_header() {
        let manager = manager();
        let token = manager.issue(&principal()).unwrap();

        let headers = headers_with(&format!("theme=dark; {AUTH_COOKIE}={token}"));
        assert_eq!(manager.principal_from_headers(&headers), Some(principal()));

        let headers = headers_with(&format!("{AUTH_COOKIE}={token}x"));
        assert_eq!(manager.principal_from_headers(&headers), None);

        assert_eq!(manager.principal_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let manager = SessionManager::new("secret", 86_400, true);
        let cookie = manager.session_cookie("token".to_string()).to_string();

        assert!(cookie.starts_with("auth-user=token"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Max-Age=86400"));

        let cleared = manager.clear_cookie().to_string();
        assert!(cleared.contains("Max-Age=0"));
    }
}
