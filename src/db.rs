use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::ledger::DedupStore;
use crate::models::{
    DedupRecord, EmailRecord, NotificationRecord, Role, RosterMember, StoredMetrics, StressLevel,
};
use crate::risk;
use crate::store::{OutputStore, OvertimeSource, RosterSource};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn upsert_member(
    pool: &PgPool,
    team_id: &str,
    email: &str,
    full_name: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO burnout_watch.members (id, team_id, email, full_name, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE
        SET team_id = EXCLUDED.team_id, full_name = EXCLUDED.full_name, role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(team_id)
    .bind(email)
    .bind(full_name)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?
    .try_get("id")?;

    Ok(id)
}

async fn upsert_metrics(
    pool: &PgPool,
    member_id: Uuid,
    metrics: &StoredMetrics,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO burnout_watch.member_metrics
        (member_id, wellbeing_score, stress_level, task_completion_rate,
         is_exhausted, meeting_hours, overtime_count, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        ON CONFLICT (member_id) DO UPDATE
        SET wellbeing_score = EXCLUDED.wellbeing_score,
            stress_level = EXCLUDED.stress_level,
            task_completion_rate = EXCLUDED.task_completion_rate,
            is_exhausted = EXCLUDED.is_exhausted,
            meeting_hours = EXCLUDED.meeting_hours,
            overtime_count = EXCLUDED.overtime_count,
            updated_at = now()
        "#,
    )
    .bind(member_id)
    .bind(metrics.wellbeing_score)
    .bind(metrics.stress_level.map(|s| s.as_str()))
    .bind(metrics.task_completion_rate)
    .bind(metrics.is_exhausted)
    .bind(metrics.meeting_hours)
    .bind(metrics.overtime_count.map(|c| c as i32))
    .execute(pool)
    .await?;

    Ok(())
}

async fn insert_overtime(
    pool: &PgPool,
    email: &str,
    occurred_on: NaiveDate,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO burnout_watch.overtime_events (id, member_email, occurred_on, source_key)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(occurred_on)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Loads a demo team: a supervisor, the scenario personas, and one member
/// with partial analytics.
pub async fn seed(pool: &PgPool, team_id: &str) -> anyhow::Result<()> {
    let members = vec![
        ("supervisor@corp.io", "Kiara Patel", Role::Supervisor),
        ("member1@corp.io", "Avery Lee", Role::Member),
        ("member2@corp.io", "Jules Moreno", Role::Member),
        ("member3@corp.io", "Sam Okafor", Role::Member),
    ];

    for (email, name, role) in members {
        upsert_member(pool, team_id, email, name, role).await?;
    }

    let rin = upsert_member(pool, team_id, "rin.takeda@corp.io", "Rin Takeda", Role::Member)
        .await
        .context("failed to seed partial analytics member")?;
    let partial = StoredMetrics {
        wellbeing_score: Some(58),
        stress_level: Some(StressLevel::Medium),
        meeting_hours: Some(17.5),
        ..Default::default()
    };
    upsert_metrics(pool, rin, &partial).await?;

    let week_start = risk::week_start(Utc::now().date_naive());
    for offset in 0..3 {
        let day = week_start + Duration::days(offset);
        let source_key = format!("seed-member3-{day}");
        insert_overtime(pool, "member3@corp.io", day, &source_key).await?;
    }

    Ok(())
}

/// Imports roster members from CSV; metric columns may be left blank.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        team_id: String,
        email: String,
        full_name: String,
        role: String,
        wellbeing_score: Option<i32>,
        stress_level: Option<String>,
        task_completion_rate: Option<i32>,
        is_exhausted: Option<bool>,
        meeting_hours: Option<f64>,
        overtime_count: Option<u32>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut imported = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let role: Role = row
            .role
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .with_context(|| format!("invalid role for {}", row.email))?;
        let stress_level = match row.stress_level.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => Some(
                raw.parse::<StressLevel>()
                    .map_err(|e| anyhow::anyhow!(e))
                    .with_context(|| format!("invalid stress level for {}", row.email))?,
            ),
            None => None,
        };

        let member_id = upsert_member(pool, &row.team_id, &row.email, &row.full_name, role).await?;

        let metrics = StoredMetrics {
            wellbeing_score: row.wellbeing_score,
            stress_level,
            task_completion_rate: row.task_completion_rate,
            is_exhausted: row.is_exhausted,
            meeting_hours: row.meeting_hours,
            overtime_count: row.overtime_count,
        };
        if !metrics.is_empty() {
            upsert_metrics(pool, member_id, &metrics).await?;
        }

        imported += 1;
    }

    Ok(imported)
}

/// Postgres-backed implementation of every collaborator store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RosterSource for PgStore {
    async fn fetch_roster(
        &self,
        team_id: &str,
        role: Option<Role>,
    ) -> Result<Vec<RosterMember>, StoreError> {
        let mut query = String::from(
            "SELECT m.email, m.full_name, m.role, mm.member_id AS metrics_id, \
             mm.wellbeing_score, mm.stress_level, mm.task_completion_rate, \
             mm.is_exhausted, mm.meeting_hours, mm.overtime_count \
             FROM burnout_watch.members m \
             LEFT JOIN burnout_watch.member_metrics mm ON mm.member_id = m.id \
             WHERE m.team_id = $1",
        );
        if role.is_some() {
            query.push_str(" AND m.role = $2");
        }
        query.push_str(" ORDER BY m.email");

        let mut rows = sqlx::query(&query).bind(team_id);
        if let Some(value) = role {
            rows = rows.bind(value.as_str());
        }

        let records = rows.fetch_all(&self.pool).await?;
        let mut members = Vec::with_capacity(records.len());

        for row in records {
            let email: String = row.try_get("email")?;
            let role_raw: String = row.try_get("role")?;
            let role = role_raw
                .parse::<Role>()
                .map_err(|e| StoreError::Malformed(format!("{email}: {e}")))?;

            let metrics_id: Option<Uuid> = row.try_get("metrics_id")?;
            let metrics = match metrics_id {
                Some(_) => {
                    let stress: Option<String> = row.try_get("stress_level")?;
                    let overtime: Option<i32> = row.try_get("overtime_count")?;
                    Some(StoredMetrics {
                        wellbeing_score: row.try_get("wellbeing_score")?,
                        stress_level: stress.and_then(|s| s.parse().ok()),
                        task_completion_rate: row.try_get("task_completion_rate")?,
                        is_exhausted: row.try_get("is_exhausted")?,
                        meeting_hours: row.try_get("meeting_hours")?,
                        overtime_count: overtime.and_then(|c| u32::try_from(c).ok()),
                    })
                }
                None => None,
            };

            members.push(RosterMember {
                id: email,
                name: row.try_get("full_name")?,
                role,
                metrics,
            });
        }

        Ok(members)
    }
}

#[async_trait::async_trait]
impl OvertimeSource for PgStore {
    async fn weekly_overtime(
        &self,
        member_id: &str,
        week_start: NaiveDate,
    ) -> Result<u32, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE occurred_on >= $2 AND occurred_on < $3) AS in_week
            FROM burnout_watch.overtime_events
            WHERE member_email = $1
            "#,
        )
        .bind(member_id)
        .bind(week_start)
        .bind(week_start + Duration::days(7))
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = row.try_get("total")?;
        if total == 0 {
            return Err(StoreError::NotFound(format!("overtime for {member_id}")));
        }
        let in_week: i64 = row.try_get("in_week")?;
        Ok(in_week as u32)
    }
}

#[async_trait::async_trait]
impl OutputStore for PgStore {
    async fn write_notification(&self, record: &NotificationRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO burnout_watch.notifications
            (id, recipient_id, notification_type, severity, title, message,
             related_member, created_at, read)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(&record.recipient_id)
        .bind(record.notification_type.as_str())
        .bind(record.severity.as_str())
        .bind(&record.title)
        .bind(&record.message)
        .bind(&record.related_member)
        .bind(record.created_at)
        .bind(record.read)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn write_email(&self, record: &EmailRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO burnout_watch.emails
            (id, recipient_id, from_address, to_address, email_type, subject,
             text_body, html_body, related_member, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id)
        .bind(&record.recipient_id)
        .bind(&record.from_address)
        .bind(&record.to_address)
        .bind(record.email_type.as_str())
        .bind(&record.subject)
        .bind(&record.text_body)
        .bind(&record.html_body)
        .bind(&record.related_member)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl DedupStore for PgStore {
    async fn get(&self, key: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row = sqlx::query("SELECT window_start FROM burnout_watch.dedup_records WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("window_start")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, record: &DedupRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO burnout_watch.dedup_records (key, window_start)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET window_start = EXCLUDED.window_start
            "#,
        )
        .bind(&record.key)
        .bind(record.window_start)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
