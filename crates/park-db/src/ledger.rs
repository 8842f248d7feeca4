//! # Session Ledger
//!
//! The only writer of `parking_slots.is_occupied` and of a session's
//! `exit_time` / `total_fee_cents`. Each transition runs as one SQLite
//! transaction; on any error the transaction is rolled back before the
//! error is returned, so no partial state is ever visible.
//!
//! ## Start
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  start_session(vehicle, slot)                                           │
//! │                                                                         │
//! │  vehicle/slot missing?  ──► MissingFields        (no store access)     │
//! │       │                                                                 │
//! │  BEGIN                                                                  │
//! │  UPDATE parking_slots SET is_occupied = 1                               │
//! │   WHERE slot_id = ? AND is_occupied = 0     ◄── serialization point    │
//! │       │ 0 rows ──► ROLLBACK, SlotUnavailable                           │
//! │       ▼                                                                 │
//! │  vehicle exists and not parked?                                        │
//! │       │ no ──► ROLLBACK, VehicleUnavailable                            │
//! │       ▼                                                                 │
//! │  INSERT parking_sessions (entry_time = now)                            │
//! │  COMMIT ──► session_id                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The compare-and-swap is the first statement, so the transaction takes
//! SQLite's write lock before it reads anything. Two racing starts on one
//! slot queue on that lock; the second sees `is_occupied = 1` and matches
//! zero rows.
//!
//! ## End
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  end_session(session)                                                   │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │  UPDATE parking_sessions SET exit_time = now                            │
//! │   WHERE session_id = ? AND exit_time IS NULL RETURNING slot, entry     │
//! │       │ no row ──► ROLLBACK, SessionNotFound | SessionAlreadyClosed    │
//! │       ▼                                                                 │
//! │  fee = FeePolicy::calculate(entry, now)                                 │
//! │       │ Err ──► ROLLBACK, Fee(InvalidDuration)                         │
//! │       ▼                                                                 │
//! │  UPDATE parking_sessions SET total_fee_cents = fee                      │
//! │  UPDATE parking_slots SET is_occupied = 0                               │
//! │   WHERE slot_id = ? AND is_occupied = 1                                 │
//! │       │ 0 rows ──► ROLLBACK, SessionEndFailed (never repaired here)    │
//! │  COMMIT ──► SessionReceipt                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, error, info, warn};

use crate::error::{DbError, DbResult, LedgerError, LedgerResult, StartFailure};
use park_core::{Clock, FeePolicy, Money};

// =============================================================================
// Results
// =============================================================================

/// What a successful `end_session` hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReceipt {
    pub session_id: i64,
    pub vehicle_id: i64,
    pub slot_id: i64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub fee: Money,
}

/// A slot whose occupancy flag disagrees with its active sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct SlotViolation {
    pub slot_id: i64,
    pub slot_number: String,
    pub is_occupied: bool,
    pub active_sessions: i64,
}

/// Output of [`SessionLedger::check_consistency`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub slots_checked: i64,
    pub violations: Vec<SlotViolation>,
    /// Sessions with exactly one of exit time / fee recorded.
    pub corrupt_sessions: Vec<i64>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty() && self.corrupt_sessions.is_empty()
    }
}

// =============================================================================
// Session Ledger
// =============================================================================

#[derive(Clone)]
pub struct SessionLedger {
    pool: SqlitePool,
    policy: FeePolicy,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SessionLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLedger")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl SessionLedger {
    pub fn new(pool: SqlitePool, policy: FeePolicy, clock: Arc<dyn Clock>) -> Self {
        SessionLedger {
            pool,
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &FeePolicy {
        &self.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Parks a vehicle in a slot and returns the new session id.
    ///
    /// Both references are optional so that a missing form field is
    /// reported as [`StartFailure::MissingFields`] without touching the store.
    pub async fn start_session(
        &self,
        vehicle_id: Option<i64>,
        slot_id: Option<i64>,
    ) -> LedgerResult<i64> {
        let (vehicle_id, slot_id) = match (vehicle_id, slot_id) {
            (Some(v), Some(s)) => (v, s),
            (None, Some(_)) => {
                return Err(LedgerError::start(StartFailure::MissingFields, "vehicle is required"))
            }
            (Some(_), None) => {
                return Err(LedgerError::start(StartFailure::MissingFields, "slot is required"))
            }
            (None, None) => {
                return Err(LedgerError::start(
                    StartFailure::MissingFields,
                    "vehicle and slot are required",
                ))
            }
        };

        let now = self.clock.now();
        debug!(vehicle_id, slot_id, "Starting parking session");

        let mut tx = self.pool.begin().await.map_err(start_storage)?;
        let result = start_in(&mut tx, vehicle_id, slot_id, now).await;
        let session_id = finish(tx, result, start_storage).await?;

        info!(session_id, vehicle_id, slot_id, "Parking session started");
        Ok(session_id)
    }

    /// Closes an active session, charges it and frees its slot.
    pub async fn end_session(&self, session_id: i64) -> LedgerResult<SessionReceipt> {
        let now = self.clock.now();
        debug!(session_id, "Ending parking session");

        let storage_error = move |e: sqlx::Error| end_storage(session_id, e);
        let mut tx = self.pool.begin().await.map_err(storage_error)?;
        let result = end_in(&mut tx, &self.policy, session_id, now).await;
        let receipt = finish(tx, result, storage_error).await?;

        info!(
            session_id,
            slot_id = receipt.slot_id,
            fee_cents = receipt.fee.cents(),
            "Parking session ended"
        );
        Ok(receipt)
    }

    /// Compares every slot's flag with its count of active sessions.
    ///
    /// Read-only; violations are reported, never repaired.
    pub async fn check_consistency(&self) -> DbResult<ConsistencyReport> {
        let slots: Vec<SlotViolation> = sqlx::query_as(
            r#"
            SELECT p.slot_id, p.slot_number, p.is_occupied,
                   (SELECT COUNT(*) FROM parking_sessions s
                     WHERE s.slot_id = p.slot_id AND s.exit_time IS NULL) AS active_sessions
            FROM parking_slots p
            ORDER BY p.slot_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let corrupt_sessions: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT session_id FROM parking_sessions
            WHERE (exit_time IS NULL) <> (total_fee_cents IS NULL)
            ORDER BY session_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let slots_checked = slots.len() as i64;
        let violations: Vec<SlotViolation> = slots
            .into_iter()
            .filter(|s| s.active_sessions != i64::from(s.is_occupied))
            .collect();

        let report = ConsistencyReport {
            slots_checked,
            violations,
            corrupt_sessions,
        };
        if report.is_consistent() {
            debug!(slots_checked, "Ledger consistent");
        } else {
            error!(
                violations = report.violations.len(),
                corrupt_sessions = report.corrupt_sessions.len(),
                "Ledger inconsistency detected"
            );
        }
        Ok(report)
    }
}

// =============================================================================
// Transaction Steps
// =============================================================================

async fn start_in(
    conn: &mut SqliteConnection,
    vehicle_id: i64,
    slot_id: i64,
    now: DateTime<Utc>,
) -> LedgerResult<i64> {
    let claimed = sqlx::query(
        "UPDATE parking_slots SET is_occupied = 1 WHERE slot_id = ?1 AND is_occupied = 0",
    )
    .bind(slot_id)
    .execute(&mut *conn)
    .await
    .map_err(start_storage)?
    .rows_affected();

    if claimed == 0 {
        let slot_number: Option<String> =
            sqlx::query_scalar("SELECT slot_number FROM parking_slots WHERE slot_id = ?1")
                .bind(slot_id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(start_storage)?;
        let message = match slot_number {
            Some(number) => format!("slot {} is already occupied", number),
            None => format!("slot {} does not exist", slot_id),
        };
        warn!(slot_id, vehicle_id, %message, "Session start rejected");
        return Err(LedgerError::start(StartFailure::SlotUnavailable, message));
    }

    let vehicle: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT (SELECT COUNT(*) FROM parking_sessions s
                 WHERE s.vehicle_id = v.vehicle_id AND s.exit_time IS NULL)
        FROM vehicles v WHERE v.vehicle_id = ?1
        "#,
    )
    .bind(vehicle_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(start_storage)?;

    match vehicle {
        None => {
            let message = format!("vehicle {} does not exist", vehicle_id);
            warn!(slot_id, vehicle_id, %message, "Session start rejected");
            return Err(LedgerError::start(StartFailure::VehicleUnavailable, message));
        }
        Some((active,)) if active > 0 => {
            let message = format!("vehicle {} is already parked", vehicle_id);
            warn!(slot_id, vehicle_id, %message, "Session start rejected");
            return Err(LedgerError::start(StartFailure::VehicleUnavailable, message));
        }
        Some(_) => {}
    }

    let session_id: i64 = sqlx::query_scalar(
        "INSERT INTO parking_sessions (vehicle_id, slot_id, entry_time) VALUES (?1, ?2, ?3) RETURNING session_id",
    )
    .bind(vehicle_id)
    .bind(slot_id)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        // The partial unique indexes back up the checks above.
        DbError::UniqueViolation { field, .. } if field.contains("vehicle_id") => {
            LedgerError::start(StartFailure::VehicleUnavailable, "vehicle is already parked")
        }
        DbError::UniqueViolation { .. } => {
            LedgerError::start(StartFailure::SlotUnavailable, "slot is already occupied")
        }
        other => LedgerError::start(StartFailure::StorageFailure, other.to_string()),
    })?;

    Ok(session_id)
}

#[derive(Debug, FromRow)]
struct ClosingRow {
    vehicle_id: i64,
    slot_id: i64,
    entry_time: DateTime<Utc>,
}

async fn end_in(
    conn: &mut SqliteConnection,
    policy: &FeePolicy,
    session_id: i64,
    now: DateTime<Utc>,
) -> LedgerResult<SessionReceipt> {
    let closing: Option<ClosingRow> = sqlx::query_as(
        r#"
        UPDATE parking_sessions SET exit_time = ?1
        WHERE session_id = ?2 AND exit_time IS NULL
        RETURNING vehicle_id, slot_id, entry_time
        "#,
    )
    .bind(now)
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| end_storage(session_id, e))?;

    let Some(closing) = closing else {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM parking_sessions WHERE session_id = ?1)")
                .bind(session_id)
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| end_storage(session_id, e))?;
        warn!(session_id, exists, "Session end rejected");
        return Err(if exists {
            LedgerError::SessionAlreadyClosed { session_id }
        } else {
            LedgerError::SessionNotFound { session_id }
        });
    };

    let fee = policy.calculate(closing.entry_time, now).map_err(|e| {
        warn!(session_id, error = %e, "Fee calculation failed");
        LedgerError::from(e)
    })?;

    sqlx::query("UPDATE parking_sessions SET total_fee_cents = ?1 WHERE session_id = ?2")
        .bind(fee.cents())
        .bind(session_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| end_storage(session_id, e))?;

    let released = sqlx::query(
        "UPDATE parking_slots SET is_occupied = 0 WHERE slot_id = ?1 AND is_occupied = 1",
    )
    .bind(closing.slot_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| end_storage(session_id, e))?
    .rows_affected();

    if released == 0 {
        error!(
            session_id,
            slot_id = closing.slot_id,
            "Active session references a slot that is not marked occupied"
        );
        return Err(LedgerError::end(
            session_id,
            format!("slot {} was not marked occupied", closing.slot_id),
        ));
    }

    Ok(SessionReceipt {
        session_id,
        vehicle_id: closing.vehicle_id,
        slot_id: closing.slot_id,
        entry_time: closing.entry_time,
        exit_time: now,
        fee,
    })
}

// =============================================================================
// Helpers
// =============================================================================

/// Commits on `Ok`, rolls back on `Err`. The error passed in is what the
/// caller sees even if the rollback itself fails.
async fn finish<T>(
    tx: Transaction<'_, Sqlite>,
    result: LedgerResult<T>,
    on_commit_error: impl FnOnce(sqlx::Error) -> LedgerError,
) -> LedgerResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(on_commit_error)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

fn start_storage(err: sqlx::Error) -> LedgerError {
    let err = DbError::from(err);
    error!(error = %err, "Session start storage failure");
    LedgerError::start(StartFailure::StorageFailure, err.to_string())
}

fn end_storage(session_id: i64, err: sqlx::Error) -> LedgerError {
    let err = DbError::from(err);
    error!(session_id, error = %err, "Session end storage failure");
    LedgerError::end(session_id, err.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use park_core::{FeeError, ManualClock, Rounding};

    async fn slot_occupied(db: &Database, slot_id: i64) -> bool {
        db.slots()
            .get_by_id(slot_id)
            .await
            .unwrap()
            .unwrap()
            .is_occupied
    }

    async fn assert_consistent(ledger: &SessionLedger) {
        let report = ledger.check_consistency().await.unwrap();
        assert!(report.is_consistent(), "inconsistent ledger: {:?}", report);
    }

    #[tokio::test]
    async fn test_start_then_end_on_s101() {
        let (db, clock, ledger) = testing::ledger().await;
        let jane = testing::customer(&db, "jane@example.com", "0712345678").await;
        let v1 = testing::vehicle(&db, jane, "KAA 001A").await;
        let s101 = testing::slot(&db, "S101").await;

        assert!(!slot_occupied(&db, s101).await);
        assert_consistent(&ledger).await;

        let session_id = ledger.start_session(Some(v1), Some(s101)).await.unwrap();
        assert!(slot_occupied(&db, s101).await);
        assert_consistent(&ledger).await;

        let session = db.sessions().get_by_id(session_id).await.unwrap().unwrap();
        assert!(session.is_active());
        assert_eq!(session.entry_time, clock.now());

        clock.advance(Duration::minutes(61));
        let receipt = ledger.end_session(session_id).await.unwrap();
        assert_eq!(receipt.fee, Money::from_cents(20_000));
        assert_eq!(receipt.exit_time - receipt.entry_time, Duration::minutes(61));
        assert!(!slot_occupied(&db, s101).await);
        assert_consistent(&ledger).await;

        let session = db.sessions().get_by_id(session_id).await.unwrap().unwrap();
        assert_eq!(session.fee(), Some(Money::from_cents(20_000)));
        assert_eq!(session.exit_time(), Some(receipt.exit_time));
    }

    #[tokio::test]
    async fn test_second_vehicle_on_occupied_slot_conflicts() {
        let (db, _clock, ledger) = testing::ledger().await;
        let jane = testing::customer(&db, "jane@example.com", "0712345678").await;
        let v1 = testing::vehicle(&db, jane, "KAA 001A").await;
        let v2 = testing::vehicle(&db, jane, "KAA 002A").await;
        let s101 = testing::slot(&db, "S101").await;

        ledger.start_session(Some(v1), Some(s101)).await.unwrap();
        let before = db.sessions().count_all().await.unwrap();

        let err = ledger.start_session(Some(v2), Some(s101)).await.unwrap_err();
        assert_eq!(err.start_cause(), Some(StartFailure::SlotUnavailable));
        assert!(err.to_string().contains("S101"));

        assert_eq!(db.sessions().count_all().await.unwrap(), before);
        assert!(slot_occupied(&db, s101).await);
        assert_consistent(&ledger).await;
    }

    #[tokio::test]
    async fn test_parked_vehicle_rolls_back_slot_claim() {
        let (db, _clock, ledger) = testing::ledger().await;
        let jane = testing::customer(&db, "jane@example.com", "0712345678").await;
        let v1 = testing::vehicle(&db, jane, "KAA 001A").await;
        let s1 = testing::slot(&db, "S101").await;
        let s2 = testing::slot(&db, "S102").await;

        ledger.start_session(Some(v1), Some(s1)).await.unwrap();

        let err = ledger.start_session(Some(v1), Some(s2)).await.unwrap_err();
        assert_eq!(err.start_cause(), Some(StartFailure::VehicleUnavailable));

        // The CAS on S102 happened inside the rolled-back transaction.
        assert!(!slot_occupied(&db, s2).await);
        assert_eq!(db.sessions().count_all().await.unwrap(), 1);
        assert_consistent(&ledger).await;
    }

    #[tokio::test]
    async fn test_unknown_references() {
        let (db, _clock, ledger) = testing::ledger().await;
        let jane = testing::customer(&db, "jane@example.com", "0712345678").await;
        let v1 = testing::vehicle(&db, jane, "KAA 001A").await;
        let s1 = testing::slot(&db, "S101").await;

        let err = ledger.start_session(Some(v1), Some(999)).await.unwrap_err();
        assert_eq!(err.start_cause(), Some(StartFailure::SlotUnavailable));

        let err = ledger.start_session(Some(999), Some(s1)).await.unwrap_err();
        assert_eq!(err.start_cause(), Some(StartFailure::VehicleUnavailable));
        assert!(!slot_occupied(&db, s1).await);
        assert_consistent(&ledger).await;
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let (db, _clock, ledger) = testing::ledger().await;

        for (vehicle, slot) in [(None, Some(1)), (Some(1), None), (None, None)] {
            let err = ledger.start_session(vehicle, slot).await.unwrap_err();
            assert_eq!(err.start_cause(), Some(StartFailure::MissingFields));
            assert_eq!(err.class(), park_core::ErrorClass::Validation);
        }
        assert_eq!(db.sessions().count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_end_twice_fails_without_recharging() {
        let (db, clock, ledger) = testing::ledger().await;
        let jane = testing::customer(&db, "jane@example.com", "0712345678").await;
        let v1 = testing::vehicle(&db, jane, "KAA 001A").await;
        let v2 = testing::vehicle(&db, jane, "KAA 002A").await;
        let s1 = testing::slot(&db, "S101").await;

        let first = ledger.start_session(Some(v1), Some(s1)).await.unwrap();
        clock.advance(Duration::minutes(30));
        let receipt = ledger.end_session(first).await.unwrap();

        // Someone else parks in the freed slot.
        ledger.start_session(Some(v2), Some(s1)).await.unwrap();
        clock.advance(Duration::hours(5));

        let err = ledger.end_session(first).await.unwrap_err();
        assert!(matches!(err, LedgerError::SessionAlreadyClosed { session_id } if session_id == first));

        let stored = db.sessions().get_by_id(first).await.unwrap().unwrap();
        assert_eq!(stored.fee(), Some(receipt.fee));
        assert_eq!(stored.exit_time(), Some(receipt.exit_time));
        // The second vehicle still holds the slot.
        assert!(slot_occupied(&db, s1).await);
        assert_consistent(&ledger).await;
    }

    #[tokio::test]
    async fn test_end_unknown_session() {
        let (_db, _clock, ledger) = testing::ledger().await;
        let err = ledger.end_session(42).await.unwrap_err();
        assert!(matches!(err, LedgerError::SessionNotFound { session_id: 42 }));
        assert_consistent(&ledger).await;
    }

    #[tokio::test]
    async fn test_clock_skew_rolls_back_end() {
        let (db, clock, ledger) = testing::ledger().await;
        let jane = testing::customer(&db, "jane@example.com", "0712345678").await;
        let v1 = testing::vehicle(&db, jane, "KAA 001A").await;
        let s1 = testing::slot(&db, "S101").await;

        let session_id = ledger.start_session(Some(v1), Some(s1)).await.unwrap();
        clock.advance(Duration::minutes(-10));

        let err = ledger.end_session(session_id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Fee(FeeError::InvalidDuration { .. })));

        let stored = db.sessions().get_by_id(session_id).await.unwrap().unwrap();
        assert!(stored.is_active());
        assert!(slot_occupied(&db, s1).await);
        assert_consistent(&ledger).await;
    }

    #[tokio::test]
    async fn test_zero_length_session_is_free() {
        let (db, _clock, ledger) = testing::ledger().await;
        let jane = testing::customer(&db, "jane@example.com", "0712345678").await;
        let v1 = testing::vehicle(&db, jane, "KAA 001A").await;
        let s1 = testing::slot(&db, "S101").await;

        let session_id = ledger.start_session(Some(v1), Some(s1)).await.unwrap();
        let receipt = ledger.end_session(session_id).await.unwrap();
        assert!(receipt.fee.is_zero());
    }

    #[tokio::test]
    async fn test_floor_policy() {
        let db = testing::database().await;
        let clock = Arc::new(ManualClock::new(testing::start_time()));
        let ledger = db.ledger(
            FeePolicy::new(Money::from_cents(5_000), Rounding::Floor),
            clock.clone(),
        );
        let jane = testing::customer(&db, "jane@example.com", "0712345678").await;
        let v1 = testing::vehicle(&db, jane, "KAA 001A").await;
        let s1 = testing::slot(&db, "S101").await;

        let session_id = ledger.start_session(Some(v1), Some(s1)).await.unwrap();
        clock.advance(Duration::minutes(179));
        let receipt = ledger.end_session(session_id).await.unwrap();
        assert_eq!(receipt.fee, Money::from_cents(10_000));
    }

    #[tokio::test]
    async fn test_unflagged_slot_fails_end_and_is_reported() {
        let (db, _clock, ledger) = testing::ledger().await;
        let jane = testing::customer(&db, "jane@example.com", "0712345678").await;
        let v1 = testing::vehicle(&db, jane, "KAA 001A").await;
        let s1 = testing::slot(&db, "S101").await;
        let session_id = ledger.start_session(Some(v1), Some(s1)).await.unwrap();

        // Corrupt the flag behind the ledger's back.
        sqlx::query("UPDATE parking_slots SET is_occupied = 0 WHERE slot_id = ?1")
            .bind(s1)
            .execute(db.pool())
            .await
            .unwrap();

        let report = ledger.check_consistency().await.unwrap();
        assert_eq!(report.slots_checked, 1);
        assert_eq!(
            report.violations,
            vec![SlotViolation {
                slot_id: s1,
                slot_number: "S101".to_string(),
                is_occupied: false,
                active_sessions: 1,
            }]
        );

        let err = ledger.end_session(session_id).await.unwrap_err();
        assert!(matches!(err, LedgerError::SessionEndFailed { .. }));

        // Nothing from the failed end was kept, and nothing was repaired.
        let stored = db.sessions().get_by_id(session_id).await.unwrap().unwrap();
        assert!(stored.is_active());
        assert!(!slot_occupied(&db, s1).await);
        assert!(!ledger.check_consistency().await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_half_closed_session_is_reported() {
        let (db, _clock, ledger) = testing::ledger().await;
        let jane = testing::customer(&db, "jane@example.com", "0712345678").await;
        let v1 = testing::vehicle(&db, jane, "KAA 001A").await;
        let s1 = testing::slot(&db, "S101").await;
        let session_id = ledger.start_session(Some(v1), Some(s1)).await.unwrap();

        sqlx::query("UPDATE parking_sessions SET total_fee_cents = 0 WHERE session_id = ?1")
            .bind(session_id)
            .execute(db.pool())
            .await
            .unwrap();

        let report = ledger.check_consistency().await.unwrap();
        assert_eq!(report.corrupt_sessions, vec![session_id]);
        assert!(report.violations.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_on_one_slot() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("race.db")).max_connections(4))
            .await
            .unwrap();
        let clock = Arc::new(ManualClock::new(testing::start_time()));
        let ledger = db.ledger(FeePolicy::default(), clock);

        let jane = testing::customer(&db, "jane@example.com", "0712345678").await;
        let v1 = testing::vehicle(&db, jane, "KAA 001A").await;
        let v2 = testing::vehicle(&db, jane, "KAA 002A").await;
        let s101 = testing::slot(&db, "S101").await;

        for _ in 0..10 {
            let a = {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.start_session(Some(v1), Some(s101)).await })
            };
            let b = {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.start_session(Some(v2), Some(s101)).await })
            };
            let results = [a.await.unwrap(), b.await.unwrap()];

            let winners: Vec<i64> = results.iter().filter_map(|r| r.as_ref().ok().copied()).collect();
            assert_eq!(winners.len(), 1, "results: {:?}", results);
            let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
            assert_eq!(loser.start_cause(), Some(StartFailure::SlotUnavailable));

            assert_consistent(&ledger).await;
            ledger.end_session(winners[0]).await.unwrap();
            assert_consistent(&ledger).await;
        }

        assert_eq!(db.sessions().count_all().await.unwrap(), 10);
    }
}
