use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

impl StressLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StressLevel::Low => "low",
            StressLevel::Medium => "medium",
            StressLevel::High => "high",
        }
    }
}

impl FromStr for StressLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(StressLevel::Low),
            "medium" => Ok(StressLevel::Medium),
            "high" => Ok(StressLevel::High),
            other => Err(format!("unknown stress level '{other}'")),
        }
    }
}

impl fmt::Display for StressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully populated per-member metrics. Evaluation only ever sees this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub wellbeing_score: i32,
    pub stress_level: StressLevel,
    pub task_completion_rate: i32,
    pub is_exhausted: bool,
    pub meeting_hours: f64,
    pub overtime_count: u32,
}

/// Analytics as stored for a member; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredMetrics {
    pub wellbeing_score: Option<i32>,
    pub stress_level: Option<StressLevel>,
    pub task_completion_rate: Option<i32>,
    pub is_exhausted: Option<bool>,
    pub meeting_hours: Option<f64>,
    pub overtime_count: Option<u32>,
}

impl StoredMetrics {
    /// Returns the snapshot only when every field is present and in range.
    pub fn complete(&self) -> Option<MetricsSnapshot> {
        let wellbeing_score = self.wellbeing_score.filter(|v| (0..=100).contains(v))?;
        let task_completion_rate = self
            .task_completion_rate
            .filter(|v| (0..=100).contains(v))?;
        let meeting_hours = self.meeting_hours.filter(|v| v.is_finite() && *v >= 0.0)?;

        Some(MetricsSnapshot {
            wellbeing_score,
            stress_level: self.stress_level?,
            task_completion_rate,
            is_exhausted: self.is_exhausted?,
            meeting_hours,
            overtime_count: self.overtime_count?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == StoredMetrics::default()
    }
}

impl From<&MetricsSnapshot> for StoredMetrics {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        Self {
            wellbeing_score: Some(snapshot.wellbeing_score),
            stress_level: Some(snapshot.stress_level),
            task_completion_rate: Some(snapshot.task_completion_rate),
            is_exhausted: Some(snapshot.is_exhausted),
            meeting_hours: Some(snapshot.meeting_hours),
            overtime_count: Some(snapshot.overtime_count),
        }
    }
}

/// Where a resolved snapshot came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsSource {
    Analytics,
    Scenario(&'static str),
    /// Stored analytics with the missing fields synthesized.
    Backfilled,
    Synthesized,
}

impl fmt::Display for MetricsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsSource::Analytics => f.write_str("analytics"),
            MetricsSource::Scenario(name) => write!(f, "scenario:{name}"),
            MetricsSource::Backfilled => f.write_str("analytics+synthesized"),
            MetricsSource::Synthesized => f.write_str("synthesized"),
        }
    }
}

impl Serialize for MetricsSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Supervisor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Supervisor => "supervisor",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "supervisor" => Ok(Role::Supervisor),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RosterMember {
    /// Stable identity, normally the member's email address.
    pub id: String,
    pub name: String,
    pub role: Role,
    pub metrics: Option<StoredMetrics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub is_burnt_out: bool,
    pub burnout_risk: i32,
    pub is_eligible_helper: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    SupervisorBurnout,
    BurnoutThresholdEmail,
    OvertimeEmail,
    PeerHelp,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::SupervisorBurnout => "supervisor_burnout",
            AlertKind::BurnoutThresholdEmail => "burnout_threshold_email",
            AlertKind::OvertimeEmail => "overtime_email",
            AlertKind::PeerHelp => "peer_help",
        }
    }

    pub fn is_email(&self) -> bool {
        matches!(
            self,
            AlertKind::BurnoutThresholdEmail | AlertKind::OvertimeEmail
        )
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values a dispatched alert renders from.
#[derive(Debug, Clone)]
pub struct AlertPayload {
    pub subject_name: String,
    pub metrics: MetricsSnapshot,
    pub assessment: RiskAssessment,
    pub weekly_overtime: u32,
    pub week_start: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct AlertCandidate {
    /// The member the alert is about.
    pub subject_id: String,
    /// The member or supervisor the alert is delivered to.
    pub actor_id: String,
    pub kind: AlertKind,
    pub payload: AlertPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Pending,
    Sent,
    Failed,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Pending => "pending",
            EmailStatus::Sent => "sent",
            EmailStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub recipient_id: String,
    pub notification_type: AlertKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub related_member: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailRecord {
    pub id: Uuid,
    pub recipient_id: String,
    pub from_address: String,
    pub to_address: String,
    pub email_type: AlertKind,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    pub related_member: String,
    pub status: EmailStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupRecord {
    pub key: String,
    pub window_start: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> StoredMetrics {
        StoredMetrics {
            wellbeing_score: Some(70),
            stress_level: Some(StressLevel::Medium),
            task_completion_rate: Some(80),
            is_exhausted: Some(false),
            meeting_hours: Some(10.0),
            overtime_count: Some(1),
        }
    }

    #[test]
    fn complete_requires_every_field() {
        assert!(full().complete().is_some());

        let missing = StoredMetrics {
            stress_level: None,
            ..full()
        };
        assert!(missing.complete().is_none());
    }

    #[test]
    fn complete_rejects_out_of_range_scores() {
        let malformed = StoredMetrics {
            wellbeing_score: Some(140),
            ..full()
        };
        assert!(malformed.complete().is_none());
    }

    #[test]
    fn stress_level_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<StressLevel>(), Ok(StressLevel::High));
        assert!("extreme".parse::<StressLevel>().is_err());
    }

    #[test]
    fn metrics_source_serializes_as_label() {
        let json = serde_json::to_string(&MetricsSource::Scenario("burnt-out")).unwrap();
        assert_eq!(json, "\"scenario:burnt-out\"");
        let json = serde_json::to_string(&MetricsSource::Backfilled).unwrap();
        assert_eq!(json, "\"analytics+synthesized\"");
    }
}
