//! Retry, escalation, and overdue policy configuration.
//!
//! These configs are embedded in workflow node data and persisted on
//! step records. They deserialize permissively: absent fields default
//! to disabled/zero so older definitions keep loading.

use serde::{Deserialize, Serialize};

use crate::recipient::Recipient;

/// How a waiting step decides that follow-up action is due.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    /// Elapsed wall-clock time since the last activity.
    #[default]
    Time,
    /// Unrecognized validator; never fires.
    #[serde(other)]
    Unknown,
}

/// Retry message sent to nudge a waiting recipient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryMessageConfig {
    /// Message body to send on each retry.
    #[serde(default)]
    pub content: String,
    /// Optional recipient override; defaults to the original recipient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Recipient>,
}

/// One-time elevated notification after a threshold is exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Who receives the escalation.
    pub recipient: Recipient,
    /// Message body to send.
    #[serde(default)]
    pub content: String,
}

/// Retry/escalation policy attached to a wait-reply node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationConfig {
    /// Whether the policy is active.
    #[serde(default)]
    pub enabled: bool,
    /// How due-ness is decided.
    #[serde(default)]
    pub validator_type: ValidatorKind,
    /// Days component of the retry interval.
    #[serde(default)]
    pub retry_interval_days: i64,
    /// Hours component of the retry interval.
    #[serde(default)]
    pub retry_interval_hours: i64,
    /// Minutes component of the retry interval.
    #[serde(default)]
    pub retry_interval_minutes: i64,
    /// Maximum number of retry messages before escalating.
    #[serde(default)]
    pub retry_limit: u32,
    /// Message sent on each retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_message: Option<RetryMessageConfig>,
    /// Escalation fired once the retry limit is exhausted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation: Option<EscalationConfig>,
}

impl ValidationConfig {
    /// Returns the total retry interval in minutes.
    ///
    /// A non-positive interval disables the policy.
    pub fn interval_minutes(&self) -> i64 {
        self.retry_interval_days * 24 * 60
            + self.retry_interval_hours * 60
            + self.retry_interval_minutes
    }

    /// Returns whether the retry check should consider this policy.
    pub fn is_active(&self) -> bool {
        self.enabled && self.validator_type == ValidatorKind::Time && self.interval_minutes() > 0
    }
}

/// Overdue policy attached to a workflow's start node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueConfig {
    /// Whether the policy is active.
    #[serde(default)]
    pub enabled: bool,
    /// Days component of the overdue threshold.
    #[serde(default)]
    pub days: i64,
    /// Hours component of the overdue threshold.
    #[serde(default)]
    pub hours: i64,
    /// Minutes component of the overdue threshold.
    #[serde(default)]
    pub minutes: i64,
    /// Escalation fired once the run crosses the threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation: Option<EscalationConfig>,
}

impl OverdueConfig {
    /// Returns the total overdue threshold in minutes.
    pub fn threshold_minutes(&self) -> i64 {
        self.days * 24 * 60 + self.hours * 60 + self.minutes
    }

    /// Returns whether the overdue check should consider this policy.
    pub fn is_active(&self) -> bool {
        self.enabled && self.threshold_minutes() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_minutes() {
        let config = ValidationConfig {
            enabled: true,
            retry_interval_days: 1,
            retry_interval_hours: 2,
            retry_interval_minutes: 3,
            ..Default::default()
        };
        assert_eq!(config.interval_minutes(), 24 * 60 + 120 + 3);
        assert!(config.is_active());
    }

    #[test]
    fn test_zero_interval_is_inactive() {
        let config = ValidationConfig {
            enabled: true,
            ..Default::default()
        };
        assert_eq!(config.interval_minutes(), 0);
        assert!(!config.is_active());
    }

    #[test]
    fn test_permissive_deserialization() {
        // Absent fields default to disabled/zero.
        let config: ValidationConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.enabled);
        assert_eq!(config.retry_limit, 0);

        let overdue: OverdueConfig = serde_json::from_str(r#"{"enabled":true}"#).unwrap();
        assert!(overdue.enabled);
        assert!(!overdue.is_active());
    }

    #[test]
    fn test_unknown_validator_kind() {
        let config: ValidationConfig =
            serde_json::from_str(r#"{"enabled":true,"validatorType":"reply_count"}"#).unwrap();
        assert_eq!(config.validator_type, ValidatorKind::Unknown);
        assert!(!config.is_active());
    }
}
