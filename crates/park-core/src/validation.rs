//! # Validation Module
//!
//! Input validation for accounts, vehicles, slots and reservations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (apps/web)                                      │
//! │  ├── Type validation (JSON deserialization)                            │
//! │  └── THIS MODULE: field rules, normalisation                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Session ledger / repositories (park-db)                      │
//! │  └── Business rules that need the store (occupancy, overlap)           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE constraints (email, phone, slot number, plate per owner)   │
//! │  ├── Partial unique indexes (one active session per slot/vehicle)      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every validator runs before any store access.
//!
//! ## Usage
//! ```rust
//! use park_core::validation::{normalize_license_plate, validate_phone};
//!
//! assert!(validate_phone("0712345678").is_ok());
//! assert_eq!(normalize_license_plate(" kca 123a ").unwrap(), "KCA 123A");
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::MIN_PASSWORD_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 254;
const MAX_PLATE_LENGTH: usize = 20;
const MAX_VEHICLE_TYPE_LENGTH: usize = 30;
const MAX_SLOT_NUMBER_LENGTH: usize = 10;

// =============================================================================
// Presence
// =============================================================================

/// Unwraps an optional form value, failing with `Required` when absent.
pub fn require<T>(field: &str, value: Option<T>) -> ValidationResult<T> {
    value.ok_or_else(|| ValidationError::required(field))
}

/// Like [`require`] for text: blank strings count as missing.
///
/// Returns the trimmed value.
pub fn require_text(field: &str, value: Option<&str>) -> ValidationResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::required(field)),
    }
}

fn non_blank<'a>(field: &str, value: &'a str) -> ValidationResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(value)
}

fn max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

// =============================================================================
// Account Validators
// =============================================================================

/// Validates a display name and returns it trimmed.
pub fn validate_full_name(name: &str) -> ValidationResult<String> {
    let name = non_blank("full name", name)?;
    max_len("full name", name, MAX_NAME_LENGTH)?;
    Ok(name.to_string())
}

/// Validates a mobile number: `07` followed by exactly eight digits.
///
/// ## Example
/// ```rust
/// use park_core::validation::validate_phone;
///
/// assert!(validate_phone("0712345678").is_ok());
/// assert!(validate_phone("0812345678").is_err());
/// assert!(validate_phone("071234567").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let phone = non_blank("phone", phone)?;
    let ok = phone.len() == 10
        && phone.starts_with("07")
        && phone.chars().all(|c| c.is_ascii_digit());
    if !ok {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must start with 07 followed by 8 digits".to_string(),
        });
    }
    Ok(phone.to_string())
}

/// Validates `local@domain.tld` shape with no whitespace.
///
/// ## Example
/// ```rust
/// use park_core::validation::validate_email;
///
/// assert!(validate_email("jane@example.com").is_ok());
/// assert!(validate_email("jane@example").is_err());
/// assert!(validate_email("jane doe@example.com").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = non_blank("email", email)?;
    max_len("email", email, MAX_EMAIL_LENGTH)?;

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@domain.tld".to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    // The domain needs a dot with something on both sides.
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(email.to_string()),
        _ => Err(invalid()),
    }
}

/// Validates a new password's length. Not trimmed.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::required("password"));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

pub fn validate_password_confirmation(password: &str, confirm: &str) -> ValidationResult<()> {
    if password != confirm {
        return Err(ValidationError::Mismatch {
            field: "confirm password".to_string(),
            other: "password".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Vehicle & Slot Validators
// =============================================================================

/// Trims and upper-cases a license plate.
pub fn normalize_license_plate(plate: &str) -> ValidationResult<String> {
    let plate = non_blank("license plate", plate)?;
    max_len("license plate", plate, MAX_PLATE_LENGTH)?;
    Ok(plate.to_uppercase())
}

pub fn validate_vehicle_type(vehicle_type: &str) -> ValidationResult<String> {
    let vehicle_type = non_blank("vehicle type", vehicle_type)?;
    max_len("vehicle type", vehicle_type, MAX_VEHICLE_TYPE_LENGTH)?;
    Ok(vehicle_type.to_string())
}

/// Validates a slot label such as `S101` or `B-12`.
///
/// ## Rules
/// - Must not be empty
/// - At most 10 characters
/// - Letters, digits and hyphens only
pub fn validate_slot_number(number: &str) -> ValidationResult<String> {
    let number = non_blank("slot number", number)?;
    max_len("slot number", number, MAX_SLOT_NUMBER_LENGTH)?;
    if !number.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidFormat {
            field: "slot number".to_string(),
            reason: "must contain only letters, numbers and hyphens".to_string(),
        });
    }
    Ok(number.to_uppercase())
}

// =============================================================================
// Reservation Validators
// =============================================================================

/// A reservation must end strictly after it starts.
pub fn validate_reservation_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> ValidationResult<()> {
    if end <= start {
        return Err(ValidationError::InvalidWindow {
            field: "reservation".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
