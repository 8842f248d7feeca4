//! # Account Routes
//!
//! Registration, login/logout and the caller's own profile.
//!
//! ## Register
//! ```text
//! all five fields present? ──no──► 400 "All fields are required"
//! password == confirm?     ──no──► 400 "Passwords do not match"
//! phone 07XXXXXXXX?        ──no──► 400
//! email name@domain.tld?   ──no──► 400
//! password ≥ 8 chars?      ──no──► 400
//! email / phone free?      ──no──► 409 "An account with this email already exists"
//! INSERT (role = customer) ──────► 201 CustomerDto
//! ```

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use park_core::validation::{
    validate_email, validate_full_name, validate_password, validate_password_confirmation,
    validate_phone,
};
use park_core::Role;
use park_db::{DbError, NewCustomer};

use crate::auth::{clear_session_cookie, hash_password, verify_password, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::routes::dto::CustomerDto;
use crate::AppState;

const INVALID_LOGIN: &str = "Invalid email or password";

// =============================================================================
// Requests & Responses
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub customer: CustomerDto,
    /// Where the frontend should go next.
    pub redirect: &'static str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(MessageResponse {
            message: message.into(),
        })
    }
}

/// Trimmed, non-empty values or `None`.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Landing page for a role.
pub fn home_for(role: Role) -> &'static str {
    if role.is_staff() {
        "/admin/dashboard"
    } else {
        "/user/dashboard"
    }
}

fn duplicate_account(err: DbError) -> ApiError {
    match err {
        DbError::UniqueViolation { field, .. } => {
            ApiError::conflict(format!("An account with this {} already exists", field))
        }
        other => other.into(),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<CustomerDto>)> {
    let (Some(full_name), Some(phone), Some(email), Some(password), Some(confirm)) = (
        present(&req.full_name),
        present(&req.phone),
        present(&req.email),
        req.password.as_deref().filter(|p| !p.is_empty()),
        req.confirm_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::validation("All fields are required"));
    };

    if password != confirm {
        return Err(ApiError::validation("Passwords do not match"));
    }
    let phone = validate_phone(phone)?;
    let email = validate_email(email)?;
    validate_password(password)?;
    let full_name = validate_full_name(full_name)?;

    let customer = state
        .db
        .customers()
        .create(&NewCustomer {
            full_name,
            phone,
            email,
            password_hash: hash_password(password)?,
            role: Role::Customer,
        })
        .await
        .map_err(duplicate_account)?;

    Ok((StatusCode::CREATED, Json(customer.into())))
}

/// POST /login
///
/// Returns the token in the body and as the `parking_session` cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<([(axum::http::HeaderName, String); 1], Json<LoginResponse>)> {
    let (Some(email), Some(password)) = (
        present(&req.email),
        req.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::validation("Email and password are required"));
    };

    let credentials = state.db.customers().find_credentials_by_email(email).await?;
    let credentials = match credentials {
        Some(c) if verify_password(password, &c.password_hash) => c,
        _ => {
            warn!(email, "Failed login");
            return Err(ApiError::unauthorized(INVALID_LOGIN));
        }
    };

    let customer = credentials.customer;
    let token = state.jwt.issue(&customer)?;
    info!(customer_id = customer.customer_id, role = %customer.role, "Logged in");

    Ok((
        [(SET_COOKIE, state.jwt.session_cookie(&token))],
        Json(LoginResponse {
            token,
            redirect: home_for(customer.role),
            customer: customer.into(),
        }),
    ))
}

/// POST /logout
pub async fn logout(
    user: AuthUser,
) -> ([(axum::http::HeaderName, String); 1], Json<MessageResponse>) {
    info!(customer_id = user.customer_id, "Logged out");
    (
        [(SET_COOKIE, clear_session_cookie())],
        MessageResponse::new("Logged out successfully"),
    )
}

/// GET /user/profile
pub async fn profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<CustomerDto>> {
    let customer = state
        .db
        .customers()
        .get_by_id(user.customer_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer", user.customer_id))?;
    Ok(Json(customer.into()))
}

/// POST /profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<ProfileRequest>,
) -> ApiResult<Json<CustomerDto>> {
    let (Some(full_name), Some(phone), Some(email)) = (
        present(&req.full_name),
        present(&req.phone),
        present(&req.email),
    ) else {
        return Err(ApiError::validation("All fields are required"));
    };

    let full_name = validate_full_name(full_name)?;
    let phone = validate_phone(phone)?;
    let email = validate_email(email)?;

    let customer = state
        .db
        .customers()
        .update_profile(user.customer_id, &full_name, &phone, &email)
        .await
        .map_err(duplicate_account)?;
    Ok(Json(customer.into()))
}

/// POST /profile/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<PasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (Some(current), Some(new), Some(confirm)) = (
        req.current_password.as_deref().filter(|p| !p.is_empty()),
        req.new_password.as_deref().filter(|p| !p.is_empty()),
        req.confirm_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::validation("All password fields are required"));
    };

    validate_password_confirmation(new, confirm)?;
    validate_password(new)?;

    let customers = state.db.customers();
    let credentials = customers.get_credentials(user.customer_id).await?;
    if !verify_password(current, &credentials.password_hash) {
        return Err(ApiError::validation("Current password is incorrect"));
    }

    customers
        .update_password_hash(user.customer_id, &hash_password(new)?)
        .await?;
    info!(customer_id = user.customer_id, "Password changed");
    Ok(MessageResponse::new("Password changed successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing;

    fn registration(email: &str, phone: &str) -> RegisterRequest {
        RegisterRequest {
            full_name: Some("Jane Doe".to_string()),
            phone: Some(phone.to_string()),
            email: Some(email.to_string()),
            password: Some("password1".to_string()),
            confirm_password: Some("password1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let (state, _clock) = testing::state().await;

        let (status, Json(customer)) = register(
            State(state.clone()),
            Json(registration("jane@example.com", "0712345678")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(customer.role, Role::Customer);

        let (headers, Json(resp)) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: Some("jane@example.com".to_string()),
                password: Some("password1".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(resp.redirect, "/user/dashboard");
        assert!(headers[0].1.starts_with("parking_session="));

        let user: AuthUser = state.jwt.validate(&resp.token).unwrap().try_into().unwrap();
        assert_eq!(user.customer_id, customer.customer_id);
    }

    #[tokio::test]
    async fn test_register_validation_order() {
        let (state, _clock) = testing::state().await;

        let mut req = registration("jane@example.com", "0712345678");
        req.confirm_password = None;
        let err = register(State(state.clone()), Json(req)).await.unwrap_err();
        assert_eq!(err.message, "All fields are required");

        let mut req = registration("jane@example.com", "0712345678");
        req.confirm_password = Some("password2".to_string());
        let err = register(State(state.clone()), Json(req)).await.unwrap_err();
        assert_eq!(err.message, "Passwords do not match");

        let err = register(State(state.clone()), Json(registration("jane@example.com", "0812345678")))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("phone"));

        let err = register(State(state.clone()), Json(registration("jane@example", "0712345678")))
            .await
            .unwrap_err();
        assert!(err.message.contains("email"));

        let mut req = registration("jane@example.com", "0712345678");
        req.password = Some("short".to_string());
        req.confirm_password = Some("short".to_string());
        let err = register(State(state), Json(req)).await.unwrap_err();
        assert!(err.message.contains("at least 8"));
    }

    #[tokio::test]
    async fn test_register_duplicate_names_field() {
        let (state, _clock) = testing::state().await;
        register(State(state.clone()), Json(registration("jane@example.com", "0712345678")))
            .await
            .unwrap();

        let err = register(State(state.clone()), Json(registration("jane@example.com", "0711111111")))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.message, "An account with this email already exists");

        let err = register(State(state.clone()), Json(registration("tom@example.com", "0712345678")))
            .await
            .unwrap_err();
        assert_eq!(err.message, "An account with this phone already exists");

        let err = register(State(state), Json(registration("jane@example.com", "0712345678")))
            .await
            .unwrap_err();
        assert_eq!(err.message, "An account with this email and phone already exists");
    }

    #[tokio::test]
    async fn test_login_failures_look_alike() {
        let (state, _clock) = testing::state().await;
        testing::customer(&state, "jane@example.com", "0712345678").await;

        let attempt = |email: &str, password: &str| LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        };

        let unknown = login(State(state.clone()), Json(attempt("nobody@example.com", "password1")))
            .await
            .unwrap_err();
        let wrong = login(State(state.clone()), Json(attempt("jane@example.com", "password2")))
            .await
            .unwrap_err();
        assert_eq!(unknown.message, INVALID_LOGIN);
        assert_eq!(wrong.message, INVALID_LOGIN);
        assert_eq!(wrong.code, ErrorCode::Unauthorized);

        let err = login(State(state), Json(LoginRequest::default())).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_staff_login_redirects_to_admin() {
        let (state, _clock) = testing::state().await;
        let (_, Json(resp)) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: Some(state.config.operator_email.clone()),
                password: Some(state.config.operator_password.clone()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(resp.redirect, "/admin/dashboard");
        assert_eq!(resp.customer.role, Role::Operator);
    }

    #[tokio::test]
    async fn test_profile_and_password_change() {
        let (state, _clock) = testing::state().await;
        let jane = testing::customer(&state, "jane@example.com", "0712345678").await;
        testing::customer(&state, "tom@example.com", "0711111111").await;

        let Json(updated) = update_profile(
            State(state.clone()),
            jane.clone(),
            Json(ProfileRequest {
                full_name: Some("Jane Q. Doe".to_string()),
                phone: Some("0722222222".to_string()),
                email: Some("jane.doe@example.com".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.full_name, "Jane Q. Doe");

        let err = update_profile(
            State(state.clone()),
            jane.clone(),
            Json(ProfileRequest {
                full_name: Some("Jane".to_string()),
                phone: Some("0722222222".to_string()),
                email: Some("tom@example.com".to_string()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        let change = |current: &str, new: &str, confirm: &str| PasswordRequest {
            current_password: Some(current.to_string()),
            new_password: Some(new.to_string()),
            confirm_password: Some(confirm.to_string()),
        };

        let err = change_password(State(state.clone()), jane.clone(), Json(change("nope", "newpass12", "newpass12")))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Current password is incorrect");

        let err = change_password(State(state.clone()), jane.clone(), Json(change("password1", "newpass12", "newpass13")))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        change_password(State(state.clone()), jane.clone(), Json(change("password1", "newpass12", "newpass12")))
            .await
            .unwrap();

        let Json(me) = profile(State(state.clone()), jane).await.unwrap();
        let creds = state.db.customers().get_credentials(me.customer_id).await.unwrap();
        assert!(verify_password("newpass12", &creds.password_hash));
    }
}
