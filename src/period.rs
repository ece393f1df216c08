//! Calendar-month periods.
//!
//! A [`Period`] identifies one calendar month and is the unit of aggregation
//! for closing, the dashboard, and trend analysis. Boundaries are half-open:
//! the first instant of the month up to (excluding) the first instant of the
//! next month.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One calendar month, identified by `(year, month)`.
///
/// Ordering is chronological: first by year, then by month number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    /// Calendar year
    pub year: i32,
    /// Month number, 1-12
    pub month: u32,
}

impl Period {
    /// Returns the period containing the given instant.
    #[must_use]
    pub fn containing(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    /// Returns the period for the current wall-clock month.
    #[must_use]
    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    /// First instant of this month (inclusive boundary).
    // A Period is only built from a real date, so month is always 1-12 and
    // the conversion cannot fail.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn start(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(self.year, self.month, 1, 0, 0, 0)
            .single()
            .unwrap()
    }

    /// First instant of the following month (exclusive boundary).
    #[must_use]
    pub fn end_exclusive(&self) -> DateTime<Utc> {
        self.next().start()
    }

    /// The period immediately after this one.
    #[must_use]
    pub const fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Whether the given instant falls inside this period.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start() && instant < self.end_exclusive()
    }

    /// Human-readable label, e.g. `"March 2026"`.
    // Same invariant as start(): month is always valid.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap()
            .format("%B %Y")
            .to_string()
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
