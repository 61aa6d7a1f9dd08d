//! Monitoring passes and the timer loop that drives them.
//!
//! A pass fetches the team roster, resolves and evaluates every member, and
//! dispatches whatever alerts survive the dedup ledger. Passes for one actor
//! run one at a time. Two sessions of the same actor may still race on a
//! dedup key; the worst case is a duplicate alert.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::config::{EmailSettings, MonitorConfig};
use crate::dispatch::{Dispatched, Dispatcher};
use crate::error::MonitorError;
use crate::ledger::{DedupLedger, DedupStore};
use crate::models::{DedupRecord, Role, RosterMember};
use crate::risk::{self, MemberEvaluation};
use crate::store::{OutputStore, OvertimeSource, RosterSource};
use crate::synth::{self, ScenarioRule, SCENARIOS};

/// Enforces a minimum elapsed time between passes per actor.
#[derive(Debug)]
pub struct PassGate {
    min_interval: Duration,
    last_run: HashMap<String, DateTime<Utc>>,
}

impl PassGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_run: HashMap::new(),
        }
    }

    pub fn allows(&self, actor: &str, now: DateTime<Utc>) -> bool {
        match self.last_run.get(actor) {
            Some(last) => now.signed_duration_since(*last) >= self.min_interval,
            None => true,
        }
    }

    pub fn mark(&mut self, actor: &str, now: DateTime<Utc>) {
        self.last_run.insert(actor.to_string(), now);
    }
}

/// Key of the once-per-day marker gating email checks for an actor.
pub fn email_check_key(actor: &str, day: NaiveDate) -> String {
    format!("last_check:{actor}:emails:{day}")
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PassSummary {
    pub actor: String,
    pub team: String,
    /// Whether the actor supervises the team and receives its supervisor alerts.
    pub supervising: bool,
    /// Set when the pass was skipped by the elapsed-time gate.
    pub skipped: bool,
    /// Whether the daily email kinds were evaluated this pass.
    pub emails_checked: bool,
    pub members: usize,
    pub candidates: usize,
    pub suppressed: usize,
    pub dispatched: Vec<Dispatched>,
}

pub struct Monitor {
    roster: Arc<dyn RosterSource>,
    overtime: Arc<dyn OvertimeSource>,
    ledger: DedupLedger,
    dispatcher: Dispatcher,
    config: MonitorConfig,
    scenarios: &'static [ScenarioRule],
    gate: Mutex<PassGate>,
}

impl Monitor {
    pub fn new(
        roster: Arc<dyn RosterSource>,
        overtime: Arc<dyn OvertimeSource>,
        output: Arc<dyn OutputStore>,
        dedup: Arc<dyn DedupStore>,
        config: MonitorConfig,
        email: EmailSettings,
    ) -> Self {
        let ledger = DedupLedger::new(dedup, config.supervisor_freshness);
        let dispatcher = Dispatcher::new(output, ledger.clone(), email, config.thresholds);
        let gate = Mutex::new(PassGate::new(config.min_pass_interval));

        Self {
            roster,
            overtime,
            ledger,
            dispatcher,
            config,
            scenarios: SCENARIOS,
            gate,
        }
    }

    /// Replaces the scenario table consulted before synthesis.
    pub fn with_scenarios(mut self, scenarios: &'static [ScenarioRule]) -> Self {
        self.scenarios = scenarios;
        self
    }

    fn gate_allows(&self, actor: &str, now: DateTime<Utc>) -> bool {
        self.gate.lock().map(|g| g.allows(actor, now)).unwrap_or(true)
    }

    fn gate_mark(&self, actor: &str, now: DateTime<Utc>) {
        if let Ok(mut gate) = self.gate.lock() {
            gate.mark(actor, now);
        }
    }

    /// Resolves metrics and evaluates one roster member.
    pub async fn evaluate_member(
        &self,
        member: &RosterMember,
        today: NaiveDate,
    ) -> MemberEvaluation {
        let (metrics, source) =
            synth::resolve_metrics(&member.id, member.metrics.as_ref(), self.scenarios);
        let week_start = risk::week_start(today);

        let weekly_overtime = match self.overtime.weekly_overtime(&member.id, week_start).await {
            Ok(count) => count,
            Err(e) => {
                debug!(member = %member.id, error = %e, "overtime unavailable, synthesizing");
                synth::synthesize_weekly_overtime(&member.id)
            }
        };

        MemberEvaluation {
            member_id: member.id.clone(),
            member_name: member.name.clone(),
            assessment: risk::assess(&metrics),
            metrics,
            source,
            weekly_overtime,
            week_start,
        }
    }

    /// Evaluates every member of a team without dispatching anything.
    pub async fn evaluate_team(
        &self,
        team: &str,
        today: NaiveDate,
    ) -> Result<Vec<MemberEvaluation>, MonitorError> {
        let members = self
            .roster
            .fetch_roster(team, Some(Role::Member))
            .await
            .map_err(|source| MonitorError::Roster {
                team: team.to_string(),
                source,
            })?;

        let mut evaluations = Vec::with_capacity(members.len());
        for member in &members {
            evaluations.push(self.evaluate_member(member, today).await);
        }
        Ok(evaluations)
    }

    /// Whether `actor` is listed as a supervisor on the team roster.
    pub async fn supervises(&self, actor: &str, team: &str) -> Result<bool, MonitorError> {
        let supervisors = self
            .roster
            .fetch_roster(team, Some(Role::Supervisor))
            .await
            .map_err(|source| MonitorError::Roster {
                team: team.to_string(),
                source,
            })?;
        Ok(supervisors.iter().any(|s| s.id == actor))
    }

    /// Runs one monitoring pass for `actor` over `team`.
    ///
    /// Supervisor alerts and emails go only to supervisors of the team; other
    /// actors still trigger peer-help evaluation.
    pub async fn run_pass(
        &self,
        actor: &str,
        team: &str,
        now: DateTime<Utc>,
    ) -> Result<PassSummary, MonitorError> {
        self.pass(actor, team, now, true).await
    }

    /// Runs a timer-driven pass. The timer period already respects the
    /// minimum interval, so tick jitter must not skip the pass.
    pub async fn run_scheduled_pass(
        &self,
        actor: &str,
        team: &str,
        now: DateTime<Utc>,
    ) -> Result<PassSummary, MonitorError> {
        self.pass(actor, team, now, false).await
    }

    /// Timer period for `watch`: the poll interval, never shorter than the
    /// minimum pass interval.
    pub fn watch_period(&self) -> std::time::Duration {
        let floor = self.config.min_pass_interval.to_std().unwrap_or_default();
        self.config.poll_interval.max(floor)
    }

    async fn pass(
        &self,
        actor: &str,
        team: &str,
        now: DateTime<Utc>,
        gated: bool,
    ) -> Result<PassSummary, MonitorError> {
        let mut summary = PassSummary {
            actor: actor.to_string(),
            team: team.to_string(),
            ..Default::default()
        };

        if gated && !self.gate_allows(actor, now) {
            debug!(actor, team, "pass skipped, ran too recently");
            summary.skipped = true;
            return Ok(summary);
        }

        let today = now.date_naive();
        let evaluations = self.evaluate_team(team, today).await.inspect_err(|e| {
            error!(actor, team, error = %e, "roster unavailable, aborting pass");
        })?;
        summary.members = evaluations.len();
        summary.supervising = self.supervises(actor, team).await.inspect_err(|e| {
            error!(actor, team, error = %e, "roster unavailable, aborting pass");
        })?;

        let marker = email_check_key(actor, today);
        let store = self.ledger.store();
        summary.emails_checked = store
            .get(&marker)
            .await
            .map_err(|source| MonitorError::Dedup {
                key: marker.clone(),
                source,
            })?
            .is_none();

        let emails_checked = summary.emails_checked;
        let mut candidates = Vec::new();
        if summary.supervising {
            for evaluation in &evaluations {
                candidates.extend(
                    risk::supervisor_candidates(actor, evaluation, &self.config.thresholds)
                        .into_iter()
                        .filter(|c| emails_checked || !c.kind.is_email()),
                );
            }
        } else {
            debug!(actor, team, "actor does not supervise team, skipping supervisor alerts");
        }
        candidates.extend(risk::peer_help_candidates(&evaluations));
        summary.candidates = candidates.len();

        for candidate in &candidates {
            let slot = self.ledger.slot_for(candidate, now);
            let suppressed = self
                .ledger
                .is_suppressed(&slot, now)
                .await
                .map_err(|source| MonitorError::Dedup {
                    key: slot.key.clone(),
                    source,
                })?;
            if suppressed {
                summary.suppressed += 1;
                continue;
            }

            let dispatched = self
                .dispatcher
                .dispatch(candidate, &slot, now)
                .await
                .inspect_err(|e| {
                    error!(actor, team, error = %e, "dispatch failed, aborting pass");
                })?;
            summary.dispatched.push(dispatched);
        }

        if summary.emails_checked {
            let record = DedupRecord {
                key: marker.clone(),
                window_start: now,
            };
            store
                .set(&record)
                .await
                .map_err(|source| MonitorError::Dedup {
                    key: marker,
                    source,
                })?;
        }
        self.gate_mark(actor, now);

        info!(
            actor,
            team,
            supervising = summary.supervising,
            members = summary.members,
            candidates = summary.candidates,
            suppressed = summary.suppressed,
            dispatched = summary.dispatched.len(),
            "monitoring pass complete"
        );

        Ok(summary)
    }

    /// Runs a pass immediately, then on every timer tick until `shutdown` fires.
    pub async fn watch(&self, actor: &str, team: &str, shutdown: Arc<Notify>) {
        let period = self.watch_period();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            actor,
            team,
            interval_secs = period.as_secs(),
            "monitor started"
        );

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    info!(actor, team, "monitor stopped");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_scheduled_pass(actor, team, Utc::now()).await {
                        warn!(actor, team, error = %e, "pass failed, retrying next tick");
                    }
                }
            }
        }
    }
}
