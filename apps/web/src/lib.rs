//! # Parking Web Server
//!
//! JSON over HTTP for the parking service. Customers manage their vehicles
//! and reservations; operators and admins run the lot through the
//! [`SessionLedger`].
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Web Server                                      │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Accounts      │  │  Vehicles      │  │  Sessions (staff)          ││
//! │  │                │  │                │  │                            ││
//! │  │ • register     │  │ • add / delete │  │ • start  ──► SessionLedger ││
//! │  │ • login/logout │  │ • set default  │  │ • end    ──► SessionLedger ││
//! │  │ • profile      │  │ • lists        │  │ • consistency report       ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Slots (staff) │  │  Reservations  │  │  Dashboards                ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  AppState { Database, SessionLedger, JwtManager, WebConfig }            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`]. The most important environment variables:
//! - `PARKING_DB_PATH` - SQLite file (default: ./parking.db)
//! - `PARKING_HTTP_PORT` - listen port (default: 3000)
//! - `SESSION_SECRET` - secret for signing session tokens
//! - `PARKING_HOURLY_RATE_CENTS` - fee per started hour (default: 10000)

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};

use park_core::Clock;
use park_db::{Database, SessionLedger};

pub use auth::{AuthUser, JwtManager};
pub use config::{ConfigError, WebConfig};
pub use error::{ApiError, ApiResult, ErrorCode};

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub ledger: SessionLedger,
    pub jwt: JwtManager,
    pub config: WebConfig,
}

impl AppState {
    pub fn new(db: Database, config: WebConfig, clock: Arc<dyn Clock>) -> Self {
        let ledger = db.ledger(config.fee_policy(), clock);
        let jwt = JwtManager::new(config.session_secret.clone(), config.session_lifetime_secs);
        AppState {
            db,
            ledger,
            jwt,
            config,
        }
    }

    /// Current time from the ledger's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.ledger.now()
    }
}

/// Builds the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    routes::router().with_state(state)
}
