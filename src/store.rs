//! Collaborator interfaces consumed by the monitor, with in-memory versions.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;

use crate::error::StoreError;
use crate::models::{EmailRecord, NotificationRecord, Role, RosterMember};
use crate::risk;

#[async_trait::async_trait]
pub trait RosterSource: Send + Sync {
    /// Members of `team_id`, optionally restricted to one role.
    async fn fetch_roster(
        &self,
        team_id: &str,
        role: Option<Role>,
    ) -> Result<Vec<RosterMember>, StoreError>;
}

#[async_trait::async_trait]
pub trait OvertimeSource: Send + Sync {
    /// Authoritative overtime count for the week starting at `week_start`.
    async fn weekly_overtime(
        &self,
        member_id: &str,
        week_start: NaiveDate,
    ) -> Result<u32, StoreError>;
}

/// Append-only sink for produced alerts.
#[async_trait::async_trait]
pub trait OutputStore: Send + Sync {
    async fn write_notification(&self, record: &NotificationRecord) -> Result<(), StoreError>;

    async fn write_email(&self, record: &EmailRecord) -> Result<(), StoreError>;
}

fn lock_error<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable(format!("lock error: {e}"))
}

#[derive(Debug, Default)]
pub struct MemoryRoster {
    teams: Mutex<HashMap<String, Vec<RosterMember>>>,
}

impl MemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_team(team_id: &str, members: Vec<RosterMember>) -> Self {
        let roster = Self::new();
        roster.insert_team(team_id, members);
        roster
    }

    pub fn insert_team(&self, team_id: &str, members: Vec<RosterMember>) {
        if let Ok(mut teams) = self.teams.lock() {
            teams.insert(team_id.to_string(), members);
        }
    }
}

#[async_trait::async_trait]
impl RosterSource for MemoryRoster {
    async fn fetch_roster(
        &self,
        team_id: &str,
        role: Option<Role>,
    ) -> Result<Vec<RosterMember>, StoreError> {
        let teams = self.teams.lock().map_err(lock_error)?;
        let members = teams
            .get(team_id)
            .ok_or_else(|| StoreError::NotFound(format!("team {team_id}")))?;

        Ok(members
            .iter()
            .filter(|m| role.map_or(true, |r| m.role == r))
            .cloned()
            .collect())
    }
}

/// Overtime dates keyed by member identity.
#[derive(Debug, Default)]
pub struct MemoryOvertime {
    events: Mutex<HashMap<String, Vec<NaiveDate>>>,
}

impl MemoryOvertime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, member_id: &str, day: NaiveDate) {
        if let Ok(mut events) = self.events.lock() {
            events.entry(member_id.to_string()).or_default().push(day);
        }
    }
}

#[async_trait::async_trait]
impl OvertimeSource for MemoryOvertime {
    async fn weekly_overtime(
        &self,
        member_id: &str,
        week_start: NaiveDate,
    ) -> Result<u32, StoreError> {
        let events = self.events.lock().map_err(lock_error)?;
        let days = events
            .get(member_id)
            .ok_or_else(|| StoreError::NotFound(format!("overtime for {member_id}")))?;
        Ok(risk::count_in_week(days, week_start))
    }
}

#[derive(Debug, Default)]
pub struct MemoryOutput {
    notifications: Mutex<Vec<NotificationRecord>>,
    emails: Mutex<Vec<EmailRecord>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn emails(&self) -> Vec<EmailRecord> {
        self.emails.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl OutputStore for MemoryOutput {
    async fn write_notification(&self, record: &NotificationRecord) -> Result<(), StoreError> {
        self.notifications
            .lock()
            .map_err(lock_error)?
            .push(record.clone());
        Ok(())
    }

    async fn write_email(&self, record: &EmailRecord) -> Result<(), StoreError> {
        self.emails.lock().map_err(lock_error)?.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, role: Role) -> RosterMember {
        RosterMember {
            id: id.to_string(),
            name: id.to_string(),
            role,
            metrics: None,
        }
    }

    #[tokio::test]
    async fn roster_filters_by_role() {
        let roster = MemoryRoster::with_team(
            "core",
            vec![
                member("boss@corp.io", Role::Supervisor),
                member("avery@corp.io", Role::Member),
            ],
        );

        let members = roster.fetch_roster("core", Some(Role::Member)).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, "avery@corp.io");

        let everyone = roster.fetch_roster("core", None).await.unwrap();
        assert_eq!(everyone.len(), 2);
        assert!(roster.fetch_roster("other", None).await.is_err());
    }

    #[tokio::test]
    async fn overtime_is_not_found_without_records() {
        let overtime = MemoryOvertime::new();
        let monday = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        assert!(matches!(
            overtime.weekly_overtime("avery@corp.io", monday).await,
            Err(StoreError::NotFound(_))
        ));

        overtime.record("avery@corp.io", monday);
        overtime.record("avery@corp.io", monday - chrono::Duration::days(2));
        assert_eq!(overtime.weekly_overtime("avery@corp.io", monday).await.unwrap(), 1);
    }
}
