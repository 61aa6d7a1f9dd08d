use chrono::Duration;

use crate::risk::AlertThresholds;

/// Monitoring cadence and alert thresholds.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Timer period between scheduled passes.
    pub poll_interval: std::time::Duration,
    /// Minimum time between two passes for the same actor.
    pub min_pass_interval: Duration,
    /// How long a supervisor burnout alert suppresses a repeat.
    pub supervisor_freshness: Duration,
    pub thresholds: AlertThresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: std::time::Duration::from_secs(300),
            min_pass_interval: Duration::minutes(5),
            supervisor_freshness: Duration::hours(24),
            thresholds: AlertThresholds::default(),
        }
    }
}

/// Sender identity stamped on every queued email.
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub from_email: String,
    pub from_name: String,
}

impl EmailSettings {
    pub fn from_address(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            from_email: "hr-wellbeing@yourcompany.com".to_string(),
            from_name: "HR Wellbeing Team".to_string(),
        }
    }
}
