//! # Authentication
//!
//! Password hashing, session tokens and the [`AuthUser`] extractor.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /login                                                            │
//! │     verify Argon2 hash ──► JwtManager::issue(customer) ──► token        │
//! │     response body { token } + Set-Cookie: parking_session=<token>       │
//! │                                                                         │
//! │  Any protected route                                                    │
//! │     Authorization: Bearer <token>  ─┐                                   │
//! │     Cookie: parking_session=<token> ┴─► AuthUser { id, role, name }     │
//! │                                        │                                │
//! │                                        ├─ require_staff()  ──► 403?     │
//! │                                        └─ require_admin()  ──► 403?     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tokens are HS256 JWTs. The role inside the token is trusted until the
//! token expires; a role change takes effect at the next login.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use park_core::{Customer, Role};
use park_db::{Database, DbError, NewCustomer};

use crate::config::WebConfig;
use crate::error::ApiError;
use crate::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "parking_session";

// =============================================================================
// Passwords
// =============================================================================

/// Hashes a password for storage.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored hash. Unparseable hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Tokens
// =============================================================================

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (customer_id)
    pub sub: String,

    pub role: Role,

    /// Display name, for greeting without a lookup
    pub name: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// JWT token manager.
#[derive(Clone)]
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            lifetime_secs,
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Issues a session token for a logged-in customer.
    pub fn issue(&self, customer: &Customer) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: customer.customer_id.to_string(),
            role: customer.role,
            name: customer.full_name.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            debug!(error = %e, "Rejected session token");
            ApiError::unauthorized("Please log in to continue")
        })?;

        Ok(token_data.claims)
    }

    /// `Set-Cookie` value carrying a fresh token.
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE, token, self.lifetime_secs
        )
    }
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ").map(str::trim)
}

/// Finds the session cookie in a `Cookie` header.
pub fn extract_session_cookie(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

// =============================================================================
// Extractor
// =============================================================================

/// The logged-in caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub customer_id: i64,
    pub role: Role,
    pub name: String,
}

impl AuthUser {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    /// Operators and admins.
    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    pub fn require_customer(&self) -> Result<(), ApiError> {
        if self.role == Role::Customer {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = ApiError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let customer_id = claims
            .sub
            .parse()
            .map_err(|_| ApiError::unauthorized("Please log in to continue"))?;
        Ok(AuthUser {
            customer_id,
            role: claims.role,
            name: claims.name,
        })
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer_token);

        let from_cookie = || {
            parts
                .headers
                .get_all(COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .find_map(extract_session_cookie)
        };

        let token = from_header
            .or_else(from_cookie)
            .ok_or_else(|| ApiError::unauthorized("Please log in to continue"))?;

        state.jwt.validate(token)?.try_into()
    }
}

// =============================================================================
// Staff Bootstrap
// =============================================================================

struct StaffAccount<'a> {
    full_name: &'a str,
    phone: &'a str,
    email: &'a str,
    password: &'a str,
    role: Role,
}

/// Makes sure the configured admin and operator accounts exist with the
/// right role. Existing passwords are left alone.
pub async fn ensure_staff_accounts(db: &Database, config: &WebConfig) -> Result<(), ApiError> {
    let accounts = [
        StaffAccount {
            full_name: "System Administrator",
            phone: "0700000000",
            email: &config.admin_email,
            password: &config.admin_password,
            role: Role::Admin,
        },
        StaffAccount {
            full_name: "Parking Operator",
            phone: "0700000001",
            email: &config.operator_email,
            password: &config.operator_password,
            role: Role::Operator,
        },
    ];

    for account in accounts {
        match db.customers().find_credentials_by_email(account.email).await? {
            Some(existing) if existing.customer.role == account.role => {
                debug!(email = account.email, "Staff account present");
            }
            Some(existing) => {
                db.customers()
                    .set_role(existing.customer.customer_id, account.role)
                    .await?;
                info!(email = account.email, role = %account.role, "Staff role corrected");
            }
            None => {
                let created = db
                    .customers()
                    .create(&NewCustomer {
                        full_name: account.full_name.to_string(),
                        phone: account.phone.to_string(),
                        email: account.email.to_string(),
                        password_hash: hash_password(account.password)?,
                        role: account.role,
                    })
                    .await;
                match created {
                    Ok(_) => info!(email = account.email, role = %account.role, "Staff account created"),
                    // Reserved phone already registered to someone else.
                    Err(DbError::UniqueViolation { field, .. }) => {
                        warn!(email = account.email, %field, "Could not create staff account");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use park_db::DbConfig;

    fn customer(role: Role) -> Customer {
        Customer {
            customer_id: 42,
            full_name: "Jane Doe".to_string(),
            phone: "0712345678".to_string(),
            email: "jane@example.com".to_string(),
            role,
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);
        let token = manager.issue(&customer(Role::Operator)).unwrap();

        let user: AuthUser = manager.validate(&token).unwrap().try_into().unwrap();
        assert_eq!(user.customer_id, 42);
        assert_eq!(user.role, Role::Operator);
        assert_eq!(user.name, "Jane Doe");
        assert!(user.require_staff().is_ok());
        assert_eq!(user.require_admin().unwrap_err().code, ErrorCode::Forbidden);
    }

    #[test]
    fn test_foreign_token_rejected() {
        let ours = JwtManager::new("ours".to_string(), 3600);
        let theirs = JwtManager::new("theirs".to_string(), 3600);
        let token = theirs.issue(&customer(Role::Admin)).unwrap();

        let err = ours.validate(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn test_cookie_parsing() {
        assert_eq!(
            extract_session_cookie("theme=dark; parking_session=abc.def; lang=en"),
            Some("abc.def")
        );
        assert_eq!(extract_session_cookie("parking_session="), None);
        assert_eq!(extract_session_cookie("theme=dark"), None);
        assert_eq!(extract_bearer_token("Bearer xyz"), Some("xyz"));
        assert_eq!(extract_bearer_token("Basic xyz"), None);

        let manager = JwtManager::new("s".to_string(), 86_400);
        assert!(manager.session_cookie("t").contains("Max-Age=86400"));
        assert!(manager.session_cookie("t").contains("HttpOnly"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_staff_bootstrap_creates_and_corrects() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = WebConfig::default();

        // Someone registered the operator email as a customer first.
        db.customers()
            .create(&NewCustomer {
                full_name: "Early Bird".to_string(),
                phone: "0799999999".to_string(),
                email: config.operator_email.clone(),
                password_hash: hash_password("whatever1").unwrap(),
                role: Role::Customer,
            })
            .await
            .unwrap();

        ensure_staff_accounts(&db, &config).await.unwrap();
        ensure_staff_accounts(&db, &config).await.unwrap();

        let admin = db
            .customers()
            .find_credentials_by_email(&config.admin_email)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.customer.role, Role::Admin);
        assert!(verify_password(&config.admin_password, &admin.password_hash));

        let operator = db
            .customers()
            .find_credentials_by_email(&config.operator_email)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(operator.customer.role, Role::Operator);
        assert_eq!(db.customers().count(None).await.unwrap(), 2);
    }
}
