//! At-most-once-per-window bookkeeping for dispatched alerts.
//!
//! The ledger decides whether a candidate has already fired in its window and
//! records the fire afterwards. Storage is pluggable through [`DedupStore`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;

use crate::error::StoreError;
use crate::models::{AlertCandidate, AlertKind, DedupRecord};
use crate::risk;

#[async_trait::async_trait]
pub trait DedupStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Inserts the record, replacing any older record under the same key.
    async fn set(&self, record: &DedupRecord) -> Result<(), StoreError>;
}

/// Process-local store. Markers vanish on restart.
#[derive(Debug, Default)]
pub struct MemoryDedupStore {
    records: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .records
            .lock()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait::async_trait]
impl DedupStore for MemoryDedupStore {
    async fn get(&self, key: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("lock error: {e}")))?;
        Ok(records.get(key).copied())
    }

    async fn set(&self, record: &DedupRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("lock error: {e}")))?;
        records.insert(record.key.clone(), record.window_start);
        Ok(())
    }
}

/// Granularity within which an alert kind fires at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupWindow {
    /// Suppressed while the previous record is younger than the duration.
    Rolling(Duration),
    Day(NaiveDate),
    Week(NaiveDate),
    Forever,
}

impl DedupWindow {
    fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            DedupWindow::Day(day) | DedupWindow::Week(day) => {
                day.and_hms_opt(0, 0, 0).map_or(now, |t| t.and_utc())
            }
            DedupWindow::Rolling(_) | DedupWindow::Forever => now,
        }
    }
}

/// A candidate's resolved dedup key and window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupSlot {
    pub key: String,
    pub window: DedupWindow,
}

#[derive(Clone)]
pub struct DedupLedger {
    store: Arc<dyn DedupStore>,
    supervisor_freshness: Duration,
}

impl DedupLedger {
    pub fn new(store: Arc<dyn DedupStore>, supervisor_freshness: Duration) -> Self {
        Self {
            store,
            supervisor_freshness,
        }
    }

    pub fn store(&self) -> &Arc<dyn DedupStore> {
        &self.store
    }

    pub fn slot_for(&self, candidate: &AlertCandidate, now: DateTime<Utc>) -> DedupSlot {
        let kind = candidate.kind.as_str();
        let subject = &candidate.subject_id;
        let actor = &candidate.actor_id;

        match candidate.kind {
            AlertKind::SupervisorBurnout => DedupSlot {
                key: format!("{kind}:{actor}:{subject}"),
                window: DedupWindow::Rolling(self.supervisor_freshness),
            },
            AlertKind::BurnoutThresholdEmail => {
                let day = now.date_naive();
                DedupSlot {
                    key: format!("{kind}:{subject}:day:{day}"),
                    window: DedupWindow::Day(day),
                }
            }
            AlertKind::OvertimeEmail => {
                let week = risk::week_start(now.date_naive());
                DedupSlot {
                    key: format!("{kind}:{subject}:week:{week}"),
                    window: DedupWindow::Week(week),
                }
            }
            AlertKind::PeerHelp => DedupSlot {
                key: format!("{kind}:{actor}:{subject}"),
                window: DedupWindow::Forever,
            },
        }
    }

    pub async fn is_suppressed(
        &self,
        slot: &DedupSlot,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let Some(fired_at) = self.store.get(&slot.key).await? else {
            return Ok(false);
        };

        let suppressed = match slot.window {
            DedupWindow::Rolling(freshness) => now.signed_duration_since(fired_at) < freshness,
            DedupWindow::Day(_) | DedupWindow::Week(_) | DedupWindow::Forever => true,
        };

        if suppressed {
            debug!(key = %slot.key, %fired_at, "alert already fired in window");
        }
        Ok(suppressed)
    }

    pub async fn record(&self, slot: &DedupSlot, now: DateTime<Utc>) -> Result<(), StoreError> {
        let record = DedupRecord {
            key: slot.key.clone(),
            window_start: slot.window.start(now),
        };
        self.store.set(&record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertPayload, MetricsSnapshot, RiskAssessment, StressLevel};
    use chrono::TimeZone;

    fn candidate(kind: AlertKind, actor: &str, subject: &str) -> AlertCandidate {
        AlertCandidate {
            subject_id: subject.to_string(),
            actor_id: actor.to_string(),
            kind,
            payload: AlertPayload {
                subject_name: "Avery Lee".to_string(),
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
                weekly_overtime: 3,
                week_start: NaiveDate::from_ymd_opt(2026, 10, 12).unwrap(),
            },
        }
    }

    fn ledger() -> DedupLedger {
        DedupLedger::new(Arc::new(MemoryDedupStore::new()), Duration::hours(24))
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn keys_follow_kind_granularity() {
        let ledger = ledger();
        let now = at(14, 9);

        let slot = ledger.slot_for(&candidate(AlertKind::BurnoutThresholdEmail, "boss", "avery"), now);
        assert_eq!(slot.key, "burnout_threshold_email:avery:day:2026-10-14");

        let slot = ledger.slot_for(&candidate(AlertKind::OvertimeEmail, "boss", "avery"), now);
        assert_eq!(slot.key, "overtime_email:avery:week:2026-10-12");

        let slot = ledger.slot_for(&candidate(AlertKind::PeerHelp, "jules", "avery"), now);
        assert_eq!(slot.key, "peer_help:jules:avery");
        assert_eq!(slot.window, DedupWindow::Forever);
    }

    #[tokio::test]
    async fn supervisor_alert_refires_after_freshness_window() {
        let ledger = ledger();
        let alert = candidate(AlertKind::SupervisorBurnout, "boss", "avery");
        let slot = ledger.slot_for(&alert, at(14, 9));

        assert!(!ledger.is_suppressed(&slot, at(14, 9)).await.unwrap());
        ledger.record(&slot, at(14, 9)).await.unwrap();

        assert!(ledger.is_suppressed(&slot, at(15, 8)).await.unwrap());
        assert!(!ledger.is_suppressed(&slot, at(15, 9)).await.unwrap());
    }

    #[tokio::test]
    async fn daily_email_resets_next_day() {
        let ledger = ledger();
        let alert = candidate(AlertKind::BurnoutThresholdEmail, "boss", "avery");

        let today = ledger.slot_for(&alert, at(14, 9));
        ledger.record(&today, at(14, 9)).await.unwrap();
        assert!(ledger.is_suppressed(&today, at(14, 23)).await.unwrap());

        let tomorrow = ledger.slot_for(&alert, at(15, 1));
        assert!(!ledger.is_suppressed(&tomorrow, at(15, 1)).await.unwrap());
    }

    #[tokio::test]
    async fn peer_help_fires_once_ever() {
        let ledger = ledger();
        let alert = candidate(AlertKind::PeerHelp, "jules", "avery");
        let slot = ledger.slot_for(&alert, at(1, 9));
        ledger.record(&slot, at(1, 9)).await.unwrap();

        let later = ledger.slot_for(&alert, at(28, 9));
        assert!(ledger.is_suppressed(&later, at(28, 9)).await.unwrap());
    }

    #[tokio::test]
    async fn week_window_records_monday_midnight() {
        let store = Arc::new(MemoryDedupStore::new());
        let ledger = DedupLedger::new(store.clone(), Duration::hours(24));
        let alert = candidate(AlertKind::OvertimeEmail, "boss", "avery");
        let slot = ledger.slot_for(&alert, at(16, 15));
        ledger.record(&slot, at(16, 15)).await.unwrap();

        let stored = store.get(&slot.key).await.unwrap();
        assert_eq!(stored, Some(at(12, 0)));
    }
}
