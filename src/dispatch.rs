//! Turns surviving alert candidates into persisted records.
//!
//! The alert record is written first and the dedup record second. A crash in
//! between repeats the alert on the next pass instead of losing it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::compose;
use crate::config::EmailSettings;
use crate::error::MonitorError;
use crate::ledger::{DedupLedger, DedupSlot};
use crate::models::{
    AlertCandidate, AlertKind, EmailRecord, EmailStatus, NotificationRecord, Severity,
};
use crate::risk::AlertThresholds;
use crate::store::OutputStore;

/// What a dispatch produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "channel", content = "record", rename_all = "snake_case")]
pub enum Dispatched {
    Notification(NotificationRecord),
    Email(EmailRecord),
}

pub struct Dispatcher {
    output: Arc<dyn OutputStore>,
    ledger: DedupLedger,
    email: EmailSettings,
    thresholds: AlertThresholds,
}

impl Dispatcher {
    pub fn new(
        output: Arc<dyn OutputStore>,
        ledger: DedupLedger,
        email: EmailSettings,
        thresholds: AlertThresholds,
    ) -> Self {
        Self {
            output,
            ledger,
            email,
            thresholds,
        }
    }

    pub fn notification_for(
        &self,
        candidate: &AlertCandidate,
        now: DateTime<Utc>,
    ) -> NotificationRecord {
        let message = compose::in_app_message(candidate);
        let severity = match candidate.kind {
            AlertKind::PeerHelp => Severity::Info,
            _ if candidate.payload.assessment.burnout_risk > self.thresholds.burnout_risk_email => {
                Severity::Critical
            }
            _ => Severity::High,
        };

        NotificationRecord {
            id: Uuid::new_v4(),
            recipient_id: candidate.actor_id.clone(),
            notification_type: candidate.kind,
            severity,
            title: message.title,
            message: message.body,
            related_member: candidate.subject_id.clone(),
            created_at: now,
            read: false,
        }
    }

    pub fn email_for(&self, candidate: &AlertCandidate, now: DateTime<Utc>) -> EmailRecord {
        let message = compose::email_message(candidate, &self.thresholds);

        EmailRecord {
            id: Uuid::new_v4(),
            recipient_id: candidate.actor_id.clone(),
            from_address: self.email.from_address(),
            to_address: candidate.actor_id.clone(),
            email_type: candidate.kind,
            subject: message.subject,
            text_body: message.text_body,
            html_body: message.html_body,
            related_member: candidate.subject_id.clone(),
            status: EmailStatus::Pending,
            created_at: now,
        }
    }

    /// Persists the alert, then marks its dedup slot as fired.
    pub async fn dispatch(
        &self,
        candidate: &AlertCandidate,
        slot: &DedupSlot,
        now: DateTime<Utc>,
    ) -> Result<Dispatched, MonitorError> {
        let dispatched = if candidate.kind.is_email() {
            let email = self.email_for(candidate, now);
            self.output
                .write_email(&email)
                .await
                .map_err(MonitorError::Output)?;
            Dispatched::Email(email)
        } else {
            let notification = self.notification_for(candidate, now);
            self.output
                .write_notification(&notification)
                .await
                .map_err(MonitorError::Output)?;
            Dispatched::Notification(notification)
        };

        self.ledger
            .record(slot, now)
            .await
            .map_err(|source| MonitorError::Dedup {
                key: slot.key.clone(),
                source,
            })?;

        tracing::info!(
            kind = %candidate.kind,
            recipient = %candidate.actor_id,
            member = %candidate.subject_id,
            key = %slot.key,
            "alert dispatched"
        );

        Ok(dispatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::ledger::{DedupStore, MemoryDedupStore};
    use crate::models::{AlertPayload, MetricsSnapshot, RiskAssessment, StressLevel};
    use crate::store::MemoryOutput;
    use chrono::{Duration, NaiveDate, TimeZone};

    struct FailingOutput;

    #[async_trait::async_trait]
    impl OutputStore for FailingOutput {
        async fn write_notification(&self, _: &NotificationRecord) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("mock failure".to_string()))
        }

        async fn write_email(&self, _: &EmailRecord) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("mock failure".to_string()))
        }
    }

    fn candidate(kind: AlertKind, risk: i32) -> AlertCandidate {
        AlertCandidate {
            subject_id: "avery@corp.io".to_string(),
            actor_id: "boss@corp.io".to_string(),
            kind,
            payload: AlertPayload {
                subject_name: "Avery Lee".to_string(),
                metrics: MetricsSnapshot {
                    wellbeing_score: 100 - risk,
                    stress_level: StressLevel::High,
                    task_completion_rate: 55,
                    is_exhausted: false,
                    meeting_hours: 12.0,
                    overtime_count: 3,
                },
                assessment: RiskAssessment {
                    is_burnt_out: true,
                    burnout_risk: risk,
                    is_eligible_helper: false,
                },
                weekly_overtime: 3,
                week_start: NaiveDate::from_ymd_opt(2026, 10, 12).unwrap(),
            },
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 9, 0, 0).unwrap()
    }

    fn setup(output: Arc<dyn OutputStore>) -> (Dispatcher, DedupLedger, Arc<MemoryDedupStore>) {
        let store = Arc::new(MemoryDedupStore::new());
        let ledger = DedupLedger::new(store.clone(), Duration::hours(24));
        let dispatcher = Dispatcher::new(
            output,
            ledger.clone(),
            EmailSettings::default(),
            AlertThresholds::default(),
        );
        (dispatcher, ledger, store)
    }

    #[tokio::test]
    async fn email_is_queued_pending_and_slot_recorded() {
        let output = Arc::new(MemoryOutput::new());
        let (dispatcher, ledger, store) = setup(output.clone());
        let alert = candidate(AlertKind::BurnoutThresholdEmail, 85);
        let slot = ledger.slot_for(&alert, now());

        dispatcher.dispatch(&alert, &slot, now()).await.unwrap();

        let emails = output.emails();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].status, EmailStatus::Pending);
        assert_eq!(emails[0].to_address, "boss@corp.io");
        assert_eq!(
            emails[0].from_address,
            "HR Wellbeing Team <hr-wellbeing@yourcompany.com>"
        );
        assert!(store.get(&slot.key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn notification_severity_follows_risk() {
        let output = Arc::new(MemoryOutput::new());
        let (dispatcher, _, _) = setup(output);

        let severe = dispatcher.notification_for(&candidate(AlertKind::SupervisorBurnout, 85), now());
        assert_eq!(severe.severity, Severity::Critical);

        let moderate = dispatcher.notification_for(&candidate(AlertKind::SupervisorBurnout, 50), now());
        assert_eq!(moderate.severity, Severity::High);

        let peer = dispatcher.notification_for(&candidate(AlertKind::PeerHelp, 85), now());
        assert_eq!(peer.severity, Severity::Info);
        assert!(!peer.read);
    }

    #[tokio::test]
    async fn failed_write_leaves_no_dedup_record() {
        let (dispatcher, ledger, store) = setup(Arc::new(FailingOutput));
        let alert = candidate(AlertKind::SupervisorBurnout, 85);
        let slot = ledger.slot_for(&alert, now());

        let result = dispatcher.dispatch(&alert, &slot, now()).await;
        assert!(matches!(result, Err(MonitorError::Output(_))));
        assert!(store.is_empty());
    }
}
