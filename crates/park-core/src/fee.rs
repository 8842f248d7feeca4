//! # Fee Calculation
//!
//! Maps the elapsed time of a parking session to the amount owed.
//!
//! ## Billing Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  elapsed = exit - entry                                                 │
//! │                                                                         │
//! │  Rounding::Ceil  (default)        Rounding::Floor                       │
//! │  ─────────────────────────        ─────────────────────────             │
//! │    0 min   → 0 units                0 min   → 0 units                   │
//! │    1 min   → 1 unit                 1 min   → 0 units                   │
//! │   60 min   → 1 unit                60 min   → 1 unit                    │
//! │   61 min   → 2 units               61 min   → 1 unit                    │
//! │                                                                         │
//! │  fee = units × hourly_rate                                              │
//! │  exit < entry  → FeeError::InvalidDuration (never a negative fee)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::FeeError;
use crate::money::Money;
use crate::DEFAULT_HOURLY_RATE_CENTS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SECONDS_PER_HOUR: i64 = 3600;

// =============================================================================
// Rounding
// =============================================================================

/// How a partial hour is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rounding {
    /// Any started hour is billed as a full hour.
    #[default]
    Ceil,
    /// Only completed hours are billed.
    Floor,
}

impl Rounding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rounding::Ceil => "ceil",
            Rounding::Floor => "floor",
        }
    }
}

impl fmt::Display for Rounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rounding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ceil" => Ok(Rounding::Ceil),
            "floor" => Ok(Rounding::Floor),
            other => Err(format!("unknown fee rounding '{}', expected ceil or floor", other)),
        }
    }
}

// =============================================================================
// Fee Policy
// =============================================================================

/// Hourly rate plus rounding rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    pub hourly_rate: Money,
    pub rounding: Rounding,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            hourly_rate: Money::from_cents(DEFAULT_HOURLY_RATE_CENTS),
            rounding: Rounding::Ceil,
        }
    }
}

impl FeePolicy {
    pub fn new(hourly_rate: Money, rounding: Rounding) -> Self {
        Self {
            hourly_rate,
            rounding,
        }
    }

    /// Number of hour-units billed for the interval.
    pub fn billable_hours(
        &self,
        entry: DateTime<Utc>,
        exit: DateTime<Utc>,
    ) -> Result<i64, FeeError> {
        if exit < entry {
            return Err(FeeError::InvalidDuration {
                entry: entry.to_rfc3339(),
                exit: exit.to_rfc3339(),
            });
        }

        let elapsed = exit - entry;
        let secs = elapsed.num_seconds();
        let hours = match self.rounding {
            // Sub-second remainders still count as a started hour.
            Rounding::Ceil => {
                let partial = elapsed.subsec_nanos() > 0;
                let whole = secs / SECONDS_PER_HOUR;
                if secs % SECONDS_PER_HOUR != 0 || partial {
                    whole + 1
                } else {
                    whole
                }
            }
            Rounding::Floor => secs / SECONDS_PER_HOUR,
        };
        Ok(hours)
    }

    /// Computes the fee for a session that entered at `entry` and left at `exit`.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::{Duration, TimeZone, Utc};
    /// use park_core::fee::{FeePolicy, Rounding};
    /// use park_core::money::Money;
    ///
    /// let policy = FeePolicy::new(Money::from_cents(10_000), Rounding::Floor);
    /// let entry = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    ///
    /// let fee = policy.calculate(entry, entry + Duration::minutes(150)).unwrap();
    /// assert_eq!(fee.cents(), 20_000);
    /// ```
    pub fn calculate(&self, entry: DateTime<Utc>, exit: DateTime<Utc>) -> Result<Money, FeeError> {
        let hours = self.billable_hours(entry, exit)?;
        self.hourly_rate
            .checked_mul(hours)
            .ok_or(FeeError::Overflow { hours })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
