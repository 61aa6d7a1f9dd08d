use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::Notify;

use burnout_watch::config::{EmailSettings, MonitorConfig};
use burnout_watch::db::{self, PgStore};
use burnout_watch::dispatch::Dispatched;
use burnout_watch::ledger::MemoryDedupStore;
use burnout_watch::models::{Role, RosterMember};
use burnout_watch::store::{MemoryOutput, MemoryOvertime, MemoryRoster};
use burnout_watch::{report, risk, Monitor, PassSummary};

#[derive(Parser)]
#[command(name = "burnout-watch")]
#[command(about = "Burnout risk monitoring and deduplicated alerting for teams", long_about = None)]
struct Cli {
    /// Sender address stamped on queued emails
    #[arg(long, env = "FROM_EMAIL", default_value = "hr-wellbeing@yourcompany.com", global = true)]
    from_email: String,
    /// Sender display name stamped on queued emails
    #[arg(long, env = "FROM_NAME", default_value = "HR Wellbeing Team", global = true)]
    from_name: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo team with scenario members
    Seed {
        #[arg(long, default_value = "core")]
        team: String,
    },
    /// Import roster members and their analytics from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Evaluate every member of a team without sending alerts
    Assess {
        #[arg(long)]
        team: String,
        /// Write a markdown report instead of printing a table
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the evaluations as JSON
        #[arg(long, conflicts_with = "out")]
        json: bool,
    },
    /// Run a single monitoring pass
    RunPass {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        team: String,
        /// Print the pass summary and dispatched records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run monitoring passes on a timer until interrupted
    Watch {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        team: String,
        #[arg(long, env = "BURNOUT_POLL_SECS", default_value_t = 300)]
        poll_secs: u64,
        #[arg(long, env = "BURNOUT_MIN_INTERVAL_SECS", default_value_t = 300)]
        min_interval_secs: i64,
    },
    /// Run two passes over an in-memory demo team
    Demo,
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn pg_monitor(pool: PgPool, config: MonitorConfig, email: EmailSettings) -> Monitor {
    let store = Arc::new(PgStore::new(pool));
    Monitor::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store,
        config,
        email,
    )
}

fn print_summary(summary: &PassSummary) {
    if summary.skipped {
        println!(
            "Pass for {} on team {} skipped: ran too recently.",
            summary.actor, summary.team
        );
        return;
    }

    println!(
        "Pass for {} on team {}{}: {} members, {} candidates, {} suppressed, {} dispatched.",
        summary.actor,
        summary.team,
        if summary.supervising { " as supervisor" } else { "" },
        summary.members,
        summary.candidates,
        summary.suppressed,
        summary.dispatched.len()
    );
    for dispatched in &summary.dispatched {
        match dispatched {
            Dispatched::Notification(n) => println!(
                "- [{}] {} -> {}: {}",
                n.severity.as_str(),
                n.notification_type,
                n.recipient_id,
                n.title
            ),
            Dispatched::Email(e) => {
                println!("- [email] {} -> {}: {}", e.email_type, e.to_address, e.subject)
            }
        }
    }
}

async fn run_demo(email: EmailSettings) -> anyhow::Result<()> {
    let member = |id: &str, name: &str, role: Role| RosterMember {
        id: id.to_string(),
        name: name.to_string(),
        role,
        metrics: None,
    };
    let roster = Arc::new(MemoryRoster::with_team(
        "demo",
        vec![
            member("supervisor@corp.io", "Kiara Patel", Role::Supervisor),
            member("member1@corp.io", "Avery Lee", Role::Member),
            member("member2@corp.io", "Jules Moreno", Role::Member),
            member("member3@corp.io", "Sam Okafor", Role::Member),
        ],
    ));

    let now = Utc::now();
    let overtime = Arc::new(MemoryOvertime::new());
    let week_start = risk::week_start(now.date_naive());
    for offset in 0..3 {
        overtime.record("member3@corp.io", week_start + Duration::days(offset));
    }

    let output = Arc::new(MemoryOutput::new());
    let monitor = Monitor::new(
        roster,
        overtime,
        output.clone(),
        Arc::new(MemoryDedupStore::new()),
        MonitorConfig::default(),
        email,
    );

    let first = monitor.run_pass("supervisor@corp.io", "demo", now).await?;
    print_summary(&first);
    let second = monitor
        .run_pass("supervisor@corp.io", "demo", now + Duration::minutes(10))
        .await?;
    print_summary(&second);

    println!(
        "Output store holds {} notifications and {} emails.",
        output.notifications().len(),
        output.emails().len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let email = EmailSettings {
        from_email: cli.from_email,
        from_name: cli.from_name,
    };

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { team } => {
            let pool = connect().await?;
            db::seed(&pool, &team).await?;
            println!("Seed data inserted for team {team}.");
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let imported = db::import_csv(&pool, &csv).await?;
            println!("Imported {imported} members from {}.", csv.display());
        }
        Commands::Assess { team, out, json } => {
            let pool = connect().await?;
            let monitor = pg_monitor(pool, MonitorConfig::default(), email);
            let today = Utc::now().date_naive();
            let evaluations = monitor.evaluate_team(&team, today).await?;

            match out {
                None if json => {
                    println!("{}", serde_json::to_string_pretty(&evaluations)?);
                }
                Some(path) => {
                    std::fs::write(&path, report::build_report(&team, today, &evaluations))?;
                    println!("Report written to {}.", path.display());
                }
                None if evaluations.is_empty() => {
                    println!("No members found for team {team}.");
                }
                None => {
                    println!("Members by burnout risk:");
                    for evaluation in report::rank_by_risk(&evaluations) {
                        println!(
                            "- {} ({}) risk {}%{}{} [{}]",
                            evaluation.member_name,
                            evaluation.member_id,
                            evaluation.assessment.burnout_risk,
                            if evaluation.assessment.is_burnt_out {
                                ", burnt out"
                            } else {
                                ""
                            },
                            if evaluation.assessment.is_eligible_helper {
                                ", can help"
                            } else {
                                ""
                            },
                            evaluation.source
                        );
                    }
                }
            }
        }
        Commands::RunPass { actor, team, json } => {
            let pool = connect().await?;
            let monitor = pg_monitor(pool, MonitorConfig::default(), email);
            let summary = monitor.run_pass(&actor, &team, Utc::now()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Commands::Watch {
            actor,
            team,
            poll_secs,
            min_interval_secs,
        } => {
            let pool = connect().await?;
            let config = MonitorConfig {
                poll_interval: std::time::Duration::from_secs(poll_secs.max(1)),
                min_pass_interval: Duration::seconds(min_interval_secs.max(0)),
                ..MonitorConfig::default()
            };
            let monitor = pg_monitor(pool, config, email);

            let shutdown = Arc::new(Notify::new());
            let signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    signal.notify_one();
                }
            });

            monitor.watch(&actor, &team, shutdown).await;
        }
        Commands::Demo => {
            run_demo(email).await?;
        }
    }

    Ok(())
}
