use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

use crate::models::{
    AlertCandidate, AlertKind, AlertPayload, MetricsSnapshot, MetricsSource, RiskAssessment,
    StressLevel,
};

pub const WELLBEING_FLOOR: i32 = 60;
pub const HEAVY_MEETING_HOURS: f64 = 15.0;
pub const HELPER_COMPLETION_FLOOR: i32 = 75;

/// Trigger levels for the supervisor-facing alerts.
#[derive(Debug, Clone, Copy)]
pub struct AlertThresholds {
    /// Burnout risk must be strictly above this to email.
    pub burnout_risk_email: i32,
    /// Weekly overtime count at or above this emails.
    pub weekly_overtime: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            burnout_risk_email: 70,
            weekly_overtime: 3,
        }
    }
}

pub fn is_burnt_out(metrics: &MetricsSnapshot) -> bool {
    metrics.wellbeing_score < WELLBEING_FLOOR
        || metrics.stress_level == StressLevel::High
        || metrics.is_exhausted
}

pub fn burnout_risk(metrics: &MetricsSnapshot) -> i32 {
    let meeting_load = if metrics.meeting_hours > HEAVY_MEETING_HOURS {
        20
    } else {
        0
    };
    let exhaustion = if metrics.is_exhausted { 30 } else { 0 };
    (100 - metrics.wellbeing_score + meeting_load + exhaustion).clamp(0, 100)
}

pub fn is_eligible_helper(metrics: &MetricsSnapshot) -> bool {
    !is_burnt_out(metrics) && metrics.task_completion_rate > HELPER_COMPLETION_FLOOR
}

pub fn assess(metrics: &MetricsSnapshot) -> RiskAssessment {
    RiskAssessment {
        is_burnt_out: is_burnt_out(metrics),
        burnout_risk: burnout_risk(metrics),
        is_eligible_helper: is_eligible_helper(metrics),
    }
}

/// Monday of the week containing `today`.
pub fn week_start(today: NaiveDate) -> NaiveDate {
    let back = match today.weekday() {
        Weekday::Sun => 6,
        other => i64::from(other.number_from_monday()) - 1,
    };
    today - Duration::days(back)
}

/// Sunday closing the week that starts at `start`.
pub fn week_end(start: NaiveDate) -> NaiveDate {
    start + Duration::days(6)
}

/// Occurrences falling in `[start, start + 7 days)`.
pub fn count_in_week(occurrences: &[NaiveDate], start: NaiveDate) -> u32 {
    let end = start + Duration::days(7);
    occurrences
        .iter()
        .filter(|day| **day >= start && **day < end)
        .count() as u32
}

/// One member's evaluation for a single pass.
#[derive(Debug, Clone, Serialize)]
pub struct MemberEvaluation {
    pub member_id: String,
    pub member_name: String,
    pub metrics: MetricsSnapshot,
    pub source: MetricsSource,
    pub assessment: RiskAssessment,
    pub weekly_overtime: u32,
    pub week_start: NaiveDate,
}

impl MemberEvaluation {
    fn candidate(&self, actor_id: &str, kind: AlertKind) -> AlertCandidate {
        AlertCandidate {
            subject_id: self.member_id.clone(),
            actor_id: actor_id.to_string(),
            kind,
            payload: AlertPayload {
                subject_name: self.member_name.clone(),
                metrics: self.metrics.clone(),
                assessment: self.assessment,
                weekly_overtime: self.weekly_overtime,
                week_start: self.week_start,
            },
        }
    }
}

/// Alerts a supervisor receives about one member. Never about themselves.
pub fn supervisor_candidates(
    supervisor_id: &str,
    evaluation: &MemberEvaluation,
    thresholds: &AlertThresholds,
) -> Vec<AlertCandidate> {
    let mut candidates = Vec::new();
    if evaluation.member_id == supervisor_id {
        return candidates;
    }

    if evaluation.assessment.is_burnt_out {
        candidates.push(evaluation.candidate(supervisor_id, AlertKind::SupervisorBurnout));
    }
    if evaluation.assessment.burnout_risk > thresholds.burnout_risk_email {
        candidates.push(evaluation.candidate(supervisor_id, AlertKind::BurnoutThresholdEmail));
    }
    if evaluation.weekly_overtime >= thresholds.weekly_overtime {
        candidates.push(evaluation.candidate(supervisor_id, AlertKind::OvertimeEmail));
    }

    candidates
}

/// Peer-help alerts: every eligible helper hears about every other burnt-out member.
pub fn peer_help_candidates(evaluations: &[MemberEvaluation]) -> Vec<AlertCandidate> {
    let mut candidates = Vec::new();

    for helper in evaluations
        .iter()
        .filter(|e| e.assessment.is_eligible_helper)
    {
        for struggling in evaluations.iter().filter(|e| e.assessment.is_burnt_out) {
            if struggling.member_id == helper.member_id {
                continue;
            }
            candidates.push(struggling.candidate(&helper.member_id, AlertKind::PeerHelp));
        }
    }

    candidates
}
