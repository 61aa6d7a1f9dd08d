//! Message text for notifications and emails.
//!
//! Everything here is a pure function of the alert candidate, so the same
//! alert always renders the same words.

use std::fmt::Write;

use crate::models::{AlertCandidate, AlertKind};
use crate::risk::{self, AlertThresholds};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InAppMessage {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

const BURNOUT_ACTIONS: &[&str] = &[
    "Schedule a confidential one-on-one meeting within 24 hours",
    "Review their current workload and task assignments",
    "Consider redistributing tasks to other team members",
    "Encourage time off or flexible working hours",
    "Share employee wellbeing and mental health resources",
];

const OVERTIME_ACTIONS: &[&str] = &[
    "Meet within 24 hours to discuss their workload",
    "Delegate high-priority tasks to other team members",
    "Review project timelines and deadlines",
    "Make sure they take proper breaks and their time off",
    "Watch their wellbeing score and stress indicators closely",
];

pub fn in_app_message(candidate: &AlertCandidate) -> InAppMessage {
    let payload = &candidate.payload;
    let name = &payload.subject_name;
    let metrics = &payload.metrics;

    match candidate.kind {
        AlertKind::PeerHelp => InAppMessage {
            title: format!("{name} could use a hand"),
            body: format!(
                "{name} is under heavy strain right now (burnout risk {}%). \
                 Consider checking in or offering help with their tasks.",
                payload.assessment.burnout_risk
            ),
        },
        _ => {
            let mut body = format!(
                "{name} shows signs of burnout: wellbeing {}/100, stress {}, burnout risk {}%",
                metrics.wellbeing_score, metrics.stress_level, payload.assessment.burnout_risk
            );
            if metrics.is_exhausted {
                body.push_str(", reported exhaustion");
            }
            body.push_str(". Recommended: ");
            body.push_str(&BURNOUT_ACTIONS[..2].join("; ").to_lowercase());
            body.push('.');

            InAppMessage {
                title: format!("Burnout alert: {name}"),
                body,
            }
        }
    }
}

pub fn email_message(candidate: &AlertCandidate, thresholds: &AlertThresholds) -> EmailMessage {
    match candidate.kind {
        AlertKind::OvertimeEmail => overtime_email(candidate, thresholds),
        _ => burnout_email(candidate, thresholds),
    }
}

fn burnout_email(candidate: &AlertCandidate, thresholds: &AlertThresholds) -> EmailMessage {
    let payload = &candidate.payload;
    let name = &payload.subject_name;
    let limit = thresholds.burnout_risk_email;
    let facts = [
        ("Member", format!("{name} ({})", candidate.subject_id)),
        ("Burnout risk", format!("{}%", payload.assessment.burnout_risk)),
        ("Wellbeing score", format!("{}/100", payload.metrics.wellbeing_score)),
        ("Stress level", payload.metrics.stress_level.to_string()),
    ];
    let footer = format!("This alert is sent when burnout risk exceeds {limit}%.");

    EmailMessage {
        subject: format!("Burnout Alert: {name} has exceeded {limit}% burnout threshold"),
        text_body: text_body("BURNOUT THRESHOLD ALERT", &facts, BURNOUT_ACTIONS, &footer),
        html_body: html_body("Burnout Threshold Alert", &facts, BURNOUT_ACTIONS, &footer),
    }
}

fn overtime_email(candidate: &AlertCandidate, thresholds: &AlertThresholds) -> EmailMessage {
    let payload = &candidate.payload;
    let name = &payload.subject_name;
    let count = payload.weekly_overtime;
    let week_end = risk::week_end(payload.week_start);
    let facts = [
        ("Member", format!("{name} ({})", candidate.subject_id)),
        ("Overtime count", format!("{count} times")),
        ("Week", format!("{} to {week_end}", payload.week_start)),
    ];
    let footer = format!(
        "This alert triggers at {}+ overtimes per week. Overtime is tracked Monday to Sunday.",
        thresholds.weekly_overtime
    );

    EmailMessage {
        subject: format!("Overtime Alert: {name} has worked overtime {count} times this week"),
        text_body: text_body("OVERTIME ALERT", &facts, OVERTIME_ACTIONS, &footer),
        html_body: html_body("Excessive Overtime Alert", &facts, OVERTIME_ACTIONS, &footer),
    }
}

fn text_body(heading: &str, facts: &[(&str, String)], actions: &[&str], footer: &str) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "{heading}");
    let _ = writeln!(output);
    for (label, value) in facts {
        let _ = writeln!(output, "{label}: {value}");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "RECOMMENDED ACTIONS:");
    for action in actions {
        let _ = writeln!(output, "- {action}");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "{footer}");

    output
}

fn html_body(heading: &str, facts: &[(&str, String)], actions: &[&str], footer: &str) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "<!DOCTYPE html>");
    let _ = writeln!(output, "<html><body style=\"font-family: Arial, sans-serif;\">");
    let _ = writeln!(output, "<h1>{}</h1>", escape_html(heading));
    let _ = writeln!(output, "<p>Dear Supervisor,</p>");
    let _ = writeln!(output, "<table>");
    for (label, value) in facts {
        let _ = writeln!(
            output,
            "<tr><th align=\"left\">{}</th><td>{}</td></tr>",
            escape_html(label),
            escape_html(value)
        );
    }
    let _ = writeln!(output, "</table>");
    let _ = writeln!(output, "<h3>Recommended Immediate Actions</h3>");
    let _ = writeln!(output, "<ul>");
    for action in actions {
        let _ = writeln!(output, "<li>{}</li>", escape_html(action));
    }
    let _ = writeln!(output, "</ul>");
    let _ = writeln!(output, "<p><small>{}</small></p>", escape_html(footer));
    let _ = writeln!(
        output,
        "<p><small>This email was sent from an automated system. Please do not reply directly.</small></p>"
    );
    let _ = writeln!(output, "</body></html>");

    output
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertPayload, MetricsSnapshot, RiskAssessment, StressLevel};
    use chrono::NaiveDate;

    fn candidate(kind: AlertKind, name: &str) -> AlertCandidate {
        AlertCandidate {
            subject_id: "avery@corp.io".to_string(),
            actor_id: "boss@corp.io".to_string(),
            kind,
            payload: AlertPayload {
                subject_name: name.to_string(),
                metrics: MetricsSnapshot {
                    wellbeing_score: 45,
                    stress_level: StressLevel::High,
                    task_completion_rate: 55,
                    is_exhausted: true,
                    meeting_hours: 12.0,
                    overtime_count: 3,
                },
                assessment: RiskAssessment {
                    is_burnt_out: true,
                    burnout_risk: 85,
                    is_eligible_helper: false,
                },
                weekly_overtime: 4,
                week_start: NaiveDate::from_ymd_opt(2026, 10, 12).unwrap(),
            },
        }
    }

    #[test]
    fn burnout_email_carries_key_metrics() {
        let email = email_message(
            &candidate(AlertKind::BurnoutThresholdEmail, "Avery Lee"),
            &AlertThresholds::default(),
        );
        assert_eq!(
            email.subject,
            "Burnout Alert: Avery Lee has exceeded 70% burnout threshold"
        );
        assert!(email.text_body.contains("Burnout risk: 85%"));
        assert!(email.text_body.contains("Wellbeing score: 45/100"));
        assert!(email.html_body.contains("Recommended Immediate Actions"));
    }

    #[test]
    fn overtime_email_spans_monday_to_sunday() {
        let email = email_message(
            &candidate(AlertKind::OvertimeEmail, "Avery Lee"),
            &AlertThresholds::default(),
        );
        assert!(email.subject.contains("overtime 4 times this week"));
        assert!(email.text_body.contains("Week: 2026-10-12 to 2026-10-18"));
    }

    #[test]
    fn html_escapes_member_names() {
        let email = email_message(
            &candidate(AlertKind::BurnoutThresholdEmail, "<b>Eve</b>"),
            &AlertThresholds::default(),
        );
        assert!(email.html_body.contains("&lt;b&gt;Eve&lt;/b&gt;"));
        assert!(!email.html_body.contains("<b>Eve</b>"));
    }

    #[test]
    fn messages_are_deterministic() {
        let alert = candidate(AlertKind::SupervisorBurnout, "Avery Lee");
        assert_eq!(in_app_message(&alert), in_app_message(&alert));
        assert!(in_app_message(&alert).body.contains("reported exhaustion"));

        let peer = in_app_message(&candidate(AlertKind::PeerHelp, "Avery Lee"));
        assert_eq!(peer.title, "Avery Lee could use a hand");
    }
}
