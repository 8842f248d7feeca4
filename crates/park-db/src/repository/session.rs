//! # Session Repository
//!
//! Read side of parking sessions. All writes go through
//! [`SessionLedger`](crate::ledger::SessionLedger).
//!
//! ## Storage Boundary
//! ```text
//! parking_sessions row                      ParkingSession
//! ────────────────────────────────          ─────────────────────────────
//! exit_time NULL,  total_fee NULL    ──►    state: Active
//! exit_time SET,   total_fee SET     ──►    state: Closed { exit_time, fee }
//! exactly one of them set            ──►    DbError::CorruptRow
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::error::{DbError, DbResult};
use park_core::{ParkingSession, SessionState};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
pub(crate) struct SessionRow {
    pub session_id: i64,
    pub vehicle_id: i64,
    pub slot_id: i64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub total_fee_cents: Option<i64>,
}

impl TryFrom<SessionRow> for ParkingSession {
    type Error = DbError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let state = SessionState::from_columns(row.exit_time, row.total_fee_cents)
            .ok_or_else(|| DbError::CorruptRow {
                entity: "parking session".to_string(),
                id: row.session_id.to_string(),
            })?;
        Ok(ParkingSession {
            session_id: row.session_id,
            vehicle_id: row.vehicle_id,
            slot_id: row.slot_id,
            entry_time: row.entry_time,
            state,
        })
    }
}

#[derive(Debug, FromRow)]
struct SessionDetailsRow {
    #[sqlx(flatten)]
    session: SessionRow,
    license_plate: String,
    slot_number: String,
    customer_id: i64,
    customer_name: String,
}

/// A session joined with the names people recognise.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetails {
    #[serde(flatten)]
    pub session: ParkingSession,
    pub license_plate: String,
    pub slot_number: String,
    pub customer_id: i64,
    pub customer_name: String,
}

impl TryFrom<SessionDetailsRow> for SessionDetails {
    type Error = DbError;

    fn try_from(row: SessionDetailsRow) -> Result<Self, Self::Error> {
        Ok(SessionDetails {
            session: row.session.try_into()?,
            license_plate: row.license_plate,
            slot_number: row.slot_number,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
        })
    }
}

const SELECT_DETAILS: &str = r#"
    SELECT s.session_id, s.vehicle_id, s.slot_id, s.entry_time, s.exit_time, s.total_fee_cents,
           v.license_plate, p.slot_number, c.customer_id, c.full_name AS customer_name
    FROM parking_sessions s
    JOIN vehicles v ON v.vehicle_id = s.vehicle_id
    JOIN parking_slots p ON p.slot_id = s.slot_id
    JOIN customers c ON c.customer_id = v.customer_id
"#;

fn convert(rows: Vec<SessionDetailsRow>) -> DbResult<Vec<SessionDetails>> {
    rows.into_iter().map(SessionDetails::try_from).collect()
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    pub async fn get_by_id(&self, session_id: i64) -> DbResult<Option<ParkingSession>> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT session_id, vehicle_id, slot_id, entry_time, exit_time, total_fee_cents
            FROM parking_sessions WHERE session_id = ?1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ParkingSession::try_from).transpose()
    }

    /// Sessions in progress, oldest entry first.
    pub async fn list_active(&self) -> DbResult<Vec<SessionDetails>> {
        let rows: Vec<SessionDetailsRow> = sqlx::query_as(&format!(
            "{} WHERE s.exit_time IS NULL ORDER BY s.entry_time",
            SELECT_DETAILS
        ))
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    /// Most recent sessions across the lot.
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<SessionDetails>> {
        let rows: Vec<SessionDetailsRow> = sqlx::query_as(&format!(
            "{} ORDER BY s.entry_time DESC, s.session_id DESC LIMIT ?1",
            SELECT_DETAILS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    /// A customer's sessions, newest first. `None` returns all of them.
    pub async fn for_customer(&self, customer_id: i64, limit: Option<i64>) -> DbResult<Vec<SessionDetails>> {
        let rows: Vec<SessionDetailsRow> = sqlx::query_as(&format!(
            "{} WHERE c.customer_id = ?1 ORDER BY s.entry_time DESC, s.session_id DESC LIMIT ?2",
            SELECT_DETAILS
        ))
        .bind(customer_id)
        // SQLite treats a negative LIMIT as unbounded.
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    /// Active sessions, optionally only for one customer's vehicles.
    pub async fn count_active(&self, customer_id: Option<i64>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM parking_sessions s
            JOIN vehicles v ON v.vehicle_id = s.vehicle_id
            WHERE s.exit_time IS NULL AND (?1 IS NULL OR v.customer_id = ?1)
            "#,
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn count_all(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM parking_sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Sum of fees for sessions that ended in `[from, to)`.
    pub async fn revenue_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<i64> {
        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_fee_cents), 0)
            FROM parking_sessions
            WHERE exit_time IS NOT NULL AND exit_time >= ?1 AND exit_time < ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;
        Ok(cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use chrono::Duration;
    use park_core::Clock;

    #[tokio::test]
    async fn test_corrupt_row_is_rejected() {
        let (db, _clock, ledger) = testing::ledger().await;
        let jane = testing::customer(&db, "jane@example.com", "0712345678").await;
        let car = testing::vehicle(&db, jane, "KAA 001A").await;
        let slot = testing::slot(&db, "S101").await;
        let session = ledger.start_session(Some(car), Some(slot)).await.unwrap();

        sqlx::query("UPDATE parking_sessions SET total_fee_cents = 100 WHERE session_id = ?1")
            .bind(session)
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.sessions().get_by_id(session).await.unwrap_err();
        assert!(matches!(err, DbError::CorruptRow { .. }));
    }

    #[tokio::test]
    async fn test_customer_history_and_revenue() {
        let (db, clock, ledger) = testing::ledger().await;
        let jane = testing::customer(&db, "jane@example.com", "0712345678").await;
        let tom = testing::customer(&db, "tom@example.com", "0711111111").await;
        let janes = testing::vehicle(&db, jane, "KAA 001A").await;
        let toms = testing::vehicle(&db, tom, "KBB 002B").await;
        let s1 = testing::slot(&db, "S101").await;
        let s2 = testing::slot(&db, "S102").await;

        let start = clock.now();
        let first = ledger.start_session(Some(janes), Some(s1)).await.unwrap();
        clock.advance(Duration::minutes(30));
        ledger.end_session(first).await.unwrap();
        ledger.start_session(Some(janes), Some(s1)).await.unwrap();
        ledger.start_session(Some(toms), Some(s2)).await.unwrap();

        let history = db.sessions().for_customer(jane, None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].session.is_active());
        assert_eq!(history[1].session.session_id, first);

        let limited = db.sessions().for_customer(jane, Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);

        assert_eq!(db.sessions().count_active(Some(jane)).await.unwrap(), 1);
        assert_eq!(db.sessions().count_active(None).await.unwrap(), 2);
        assert_eq!(db.sessions().list_active().await.unwrap().len(), 2);

        let revenue = db
            .sessions()
            .revenue_between(start, start + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(revenue, 10_000);
    }
}
