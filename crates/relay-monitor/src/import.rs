//! Scheduled imports and next-run computation.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MonitorError, MonitorResult};

/// How an import schedule advances after each run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheduleType", rename_all = "camelCase")]
pub enum ScheduleKind {
    /// Fixed number of minutes between runs.
    #[serde(rename_all = "camelCase")]
    Interval { interval_minutes: i64 },
    /// Once a day.
    Daily,
    /// Once a week.
    Weekly,
    /// A cron expression evaluated in UTC.
    Cron { expression: String },
}

/// Counters produced by one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    /// Rows imported.
    pub imported: u32,
    /// Rows rejected.
    pub failed: u32,
}

/// A recurring import job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSchedule {
    /// Unique schedule identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Whether the monitor runs this schedule.
    #[serde(default)]
    pub active: bool,
    /// How the next run time is computed.
    #[serde(flatten)]
    pub kind: ScheduleKind,
    /// When the schedule last ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<Timestamp>,
    /// When the schedule is next due.
    pub next_run_at: Timestamp,
}

impl ImportSchedule {
    /// Creates an active schedule first due at the given instant.
    pub fn new(name: impl Into<String>, kind: ScheduleKind, first_run_at: Timestamp) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            active: true,
            kind,
            last_run_at: None,
            next_run_at: first_run_at,
        }
    }

    /// Returns whether the schedule is due at the given instant.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.active && self.next_run_at <= now
    }

    /// Computes the run time following a run at `now`.
    ///
    /// Interval, daily, and weekly schedules advance from `now`, not
    /// from the previous `next_run_at`, so a late tick does not cause
    /// catch-up runs. Cron schedules ask the expression for the first
    /// occurrence after `now`.
    pub fn next_run_after(&self, now: Timestamp) -> MonitorResult<Timestamp> {
        match &self.kind {
            ScheduleKind::Interval { interval_minutes } => {
                if *interval_minutes <= 0 {
                    return Err(MonitorError::InvalidConfig(format!(
                        "interval schedule '{}' has non-positive interval {interval_minutes}",
                        self.name
                    )));
                }
                Ok(now + SignedDuration::from_mins(*interval_minutes))
            }
            ScheduleKind::Daily => Ok(now + SignedDuration::from_hours(24)),
            ScheduleKind::Weekly => Ok(now + SignedDuration::from_hours(7 * 24)),
            ScheduleKind::Cron { expression } => next_cron_occurrence(expression, now),
        }
    }
}

/// Returns the first occurrence of a cron expression after `now`.
fn next_cron_occurrence(expression: &str, now: Timestamp) -> MonitorResult<Timestamp> {
    let schedule = cron::Schedule::from_str(expression).map_err(|err| {
        MonitorError::InvalidConfig(format!("invalid cron expression '{expression}': {err}"))
    })?;
    let after = to_chrono(now)?;
    let next = schedule.after(&after).next().ok_or_else(|| {
        MonitorError::InvalidConfig(format!("cron expression '{expression}' has no next occurrence"))
    })?;
    from_chrono(next)
}

// The cron crate speaks chrono; everything else here speaks jiff.
// Converting through unix seconds/nanoseconds keeps the boundary small.

fn to_chrono(at: Timestamp) -> MonitorResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(at.as_second(), at.subsec_nanosecond() as u32).ok_or_else(
        || MonitorError::InvalidConfig(format!("timestamp {at} out of cron range")),
    )
}

fn from_chrono(at: DateTime<Utc>) -> MonitorResult<Timestamp> {
    Timestamp::new(at.timestamp(), at.timestamp_subsec_nanos() as i32)
        .map_err(|err| MonitorError::InvalidConfig(format!("cron produced invalid instant: {err}")))
}
