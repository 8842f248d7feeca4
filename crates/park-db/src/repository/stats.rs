//! # Dashboard Statistics
//!
//! Read-only aggregates for the customer and staff dashboards and the
//! customer's session history.
//!
//! ```text
//! CustomerDashboard            StaffDashboard
//! ─────────────────            ──────────────────────────
//! vehicle_count                customer_count (role-scoped)
//! active_sessions              vehicle_count
//! upcoming_reservations        available_slots / total_slots
//! recent_sessions (5)          active_sessions
//!                              today_revenue
//!                              recent_sessions (8)
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::DbResult;
use crate::repository::customer::CustomerRepository;
use crate::repository::reservation::ReservationRepository;
use crate::repository::session::{SessionDetails, SessionRepository};
use crate::repository::slot::SlotRepository;
use crate::repository::vehicle::VehicleRepository;
use park_core::{Money, Role};

/// Recent sessions shown on a customer's dashboard.
pub const CUSTOMER_RECENT_SESSIONS: i64 = 5;
/// Recent sessions shown on the staff dashboard.
pub const STAFF_RECENT_SESSIONS: i64 = 8;

#[derive(Debug, Clone, Serialize)]
pub struct CustomerDashboard {
    pub vehicle_count: i64,
    pub active_sessions: i64,
    pub upcoming_reservations: i64,
    pub recent_sessions: Vec<SessionDetails>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaffDashboard {
    pub customer_count: i64,
    pub vehicle_count: i64,
    pub available_slots: i64,
    pub total_slots: i64,
    pub active_sessions: i64,
    pub today_revenue: Money,
    pub recent_sessions: Vec<SessionDetails>,
}

/// One row of a customer's session history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub details: SessionDetails,
    /// `Active` or `Completed`.
    pub status: &'static str,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionHistory {
    pub sessions: Vec<HistoryEntry>,
    pub total_sessions: i64,
    pub active_sessions: i64,
    pub total_spent: Money,
}

#[derive(Debug, Clone)]
pub struct StatsRepository {
    pool: SqlitePool,
}

impl StatsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StatsRepository { pool }
    }

    pub async fn customer_dashboard(
        &self,
        customer_id: i64,
        now: DateTime<Utc>,
    ) -> DbResult<CustomerDashboard> {
        let sessions = SessionRepository::new(self.pool.clone());
        Ok(CustomerDashboard {
            vehicle_count: VehicleRepository::new(self.pool.clone())
                .count(Some(customer_id))
                .await?,
            active_sessions: sessions.count_active(Some(customer_id)).await?,
            upcoming_reservations: ReservationRepository::new(self.pool.clone())
                .count_upcoming(customer_id, now)
                .await?,
            recent_sessions: sessions
                .for_customer(customer_id, Some(CUSTOMER_RECENT_SESSIONS))
                .await?,
        })
    }

    /// Staff overview. Admins count every account, operators only customers.
    pub async fn staff_dashboard(&self, viewer: Role, now: DateTime<Utc>) -> DbResult<StaffDashboard> {
        let sessions = SessionRepository::new(self.pool.clone());
        let customer_scope = match viewer {
            Role::Admin => None,
            _ => Some(Role::Customer),
        };
        let (total_slots, available_slots) = SlotRepository::new(self.pool.clone()).counts().await?;

        let day_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|d| d.and_utc())
            .unwrap_or(now);
        let today_revenue = sessions
            .revenue_between(day_start, day_start + Duration::days(1))
            .await?;

        Ok(StaffDashboard {
            customer_count: CustomerRepository::new(self.pool.clone())
                .count(customer_scope)
                .await?,
            vehicle_count: VehicleRepository::new(self.pool.clone()).count(None).await?,
            available_slots,
            total_slots,
            active_sessions: sessions.count_active(None).await?,
            today_revenue: Money::from_cents(today_revenue),
            recent_sessions: sessions.recent(STAFF_RECENT_SESSIONS).await?,
        })
    }

    /// Every session of the customer with status, duration and totals.
    /// Active sessions are measured up to `now`.
    pub async fn customer_history(&self, customer_id: i64, now: DateTime<Utc>) -> DbResult<SessionHistory> {
        let details = SessionRepository::new(self.pool.clone())
            .for_customer(customer_id, None)
            .await?;

        let total_spent: Money = details.iter().filter_map(|d| d.session.fee()).sum();
        let active_sessions = details.iter().filter(|d| d.session.is_active()).count() as i64;

        let sessions: Vec<HistoryEntry> = details
            .into_iter()
            .map(|details| HistoryEntry {
                status: details.session.state.label(),
                duration_minutes: details.session.duration_minutes(now),
                details,
            })
            .collect();

        Ok(SessionHistory {
            total_sessions: sessions.len() as i64,
            active_sessions,
            total_spent,
            sessions,
        })
    }
}
