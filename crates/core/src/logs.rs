//! Append-only audit log entries (`emp_logs` / `adm_logs`).

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// One audit row. The same shape backs both tables; only the actor column
/// name differs in storage (NAME for employee logs, USER for admin logs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub actor: String,
    pub details: String,
}

impl LogEntry {
    /// Build an entry from an explicit timestamp, truncated to seconds.
    pub fn at(when: NaiveDateTime, actor: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            date: when.date(),
            time: when.time().with_nanosecond(0).unwrap_or(when.time()),
            actor: actor.into(),
            details: details.into(),
        }
    }

    /// Storage/display form of the date column (YYYY-MM-DD).
    pub fn date_str(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Storage/display form of the time column (HH:MM:SS).
    pub fn time_str(&self) -> String {
        self.time.format("%H:%M:%S").to_string()
    }

    /// Fetch ordering: DATE desc, TIME desc.
    pub fn descending(a: &LogEntry, b: &LogEntry) -> Ordering {
        b.date.cmp(&a.date).then(b.time.cmp(&a.time))
    }
}
