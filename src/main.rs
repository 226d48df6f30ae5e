use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod clock;
mod config;
mod db;
mod error;
#[cfg(test)]
mod memory;
mod models;
mod report;
mod stats;
mod store;
mod views;

use clock::{Clock, FixedClock, SystemClock};
use config::Settings;
use models::{AttendanceStatus, NewHealthReport, SlipStatus, SlipTransition};
use views::Views;

#[derive(Parser)]
#[command(name = "roster-insights")]
#[command(about = "Roster, attendance and health-report dashboard for scouting teams", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import attendance rows from a CSV file
    ImportAttendance {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Headline dashboard numbers
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Monthly attendance rates for the last six months
    Trend {
        #[arg(long)]
        json: bool,
    },
    /// Next scheduled activities
    Upcoming {
        #[arg(long)]
        json: bool,
    },
    /// Teams with member counts
    Teams {
        #[arg(long)]
        json: bool,
    },
    /// Full team bundle: roster, medical records, slips, archived reports
    Team {
        team_id: Uuid,
        #[arg(long)]
        json: bool,
    },
    /// Decide or reset a permission slip
    Slip { slip_id: Uuid, status: SlipStatus },
    /// Register a member for an activity
    Register { activity_id: Uuid, member_id: Uuid },
    /// Set the attendance status of a participation row
    Attendance {
        participant_id: Uuid,
        status: AttendanceStatus,
    },
    /// Write the dashboard markdown report
    Report {
        #[arg(long, default_value = "dashboard.md")]
        out: PathBuf,
    },
    /// Write a team health report and archive its metadata
    Archive {
        team_id: Uuid,
        #[arg(long, default_value = "reports")]
        dir: PathBuf,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.default_log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings;
    init_logging(&settings);

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let clock: Box<dyn Clock> = match settings.as_of {
        Some(date) => Box::new(FixedClock(date)),
        None => Box::new(SystemClock),
    };
    let store = db::PgStore::new(pool.clone());
    let views = Views::new(&store, clock.as_ref(), settings.read_timeout());

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool, views.today()).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportAttendance { csv } => {
            let inserted = db::import_attendance_csv(&pool, &csv).await?;
            println!("Inserted {inserted} attendance rows from {}.", csv.display());
        }
        Commands::Stats { json } => {
            let stats = views.dashboard_stats().await;
            if json {
                return print_json(&stats);
            }
            println!("Total scouts: {}", stats.total_scouts);
            println!("Active teams: {}", stats.active_teams);
            println!("Median attendance: {}%", stats.attendance_rate);
            println!("Archived health reports: {}", stats.health_reports_count);
        }
        Commands::Trend { json } => {
            let trend = views
                .attendance_trend()
                .await
                .context("failed to load attendance trend")?;
            if json {
                return print_json(&trend);
            }
            if trend.is_empty() {
                println!("No resolved attendance recorded yet.");
            }
            for bucket in &trend {
                println!("{}: {}% ({} records)", bucket.label(), bucket.rate, bucket.records);
            }
        }
        Commands::Upcoming { json } => {
            let events = views
                .upcoming_events()
                .await
                .context("failed to load upcoming events")?;
            if json {
                return print_json(&events);
            }
            if events.is_empty() {
                println!("Nothing scheduled.");
            }
            for event in &events {
                println!("- {} {} ({})", event.activity_date, event.title, event.id);
            }
        }
        Commands::Teams { json } => {
            let teams = views
                .teams_with_member_counts()
                .await
                .context("failed to load teams")?;
            if json {
                return print_json(&teams);
            }
            for entry in &teams {
                println!(
                    "- {} ({} members) {}",
                    entry.team.name, entry.member_count, entry.team.id
                );
            }
        }
        Commands::Team { team_id, json } => {
            let data = match views.team_full_data(team_id).await {
                Ok(data) => data,
                Err(err) if err.is_not_found() => {
                    println!("{err}.");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };
            if json {
                return print_json(&data);
            }
            print!("{}", report::build_team_report(&data));
        }
        Commands::Slip { slip_id, status } => {
            match views.set_permission_slip_status(slip_id, status).await? {
                SlipTransition::Changed => println!("Permission slip {slip_id} is now {status}."),
                SlipTransition::Unchanged => {
                    println!("Permission slip {slip_id} was already {status}.")
                }
            }
        }
        Commands::Register {
            activity_id,
            member_id,
        } => {
            let participant_id = views.register_participant(activity_id, member_id).await?;
            println!("Registered participant {participant_id}.");
        }
        Commands::Attendance {
            participant_id,
            status,
        } => {
            views.record_attendance(participant_id, status).await?;
            println!("Participant {participant_id} marked {status}.");
        }
        Commands::Report { out } => {
            let (stats, trend, upcoming) = tokio::join!(
                views.dashboard_stats(),
                views.attendance_trend(),
                views.upcoming_events(),
            );
            let trend = trend.unwrap_or_else(|err| {
                warn!("attendance trend left out of report: {}", err);
                Vec::new()
            });
            let upcoming = upcoming.unwrap_or_else(|err| {
                warn!("upcoming events left out of report: {}", err);
                Vec::new()
            });
            let report = report::build_dashboard_report(views.today(), &stats, &trend, &upcoming);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Archive { team_id, dir } => {
            let data = match views.team_full_data(team_id).await {
                Ok(data) => data,
                Err(err) if err.is_not_found() => {
                    println!("{err}.");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };
            let file_name = report::archive_file_name(&data.team.name, Utc::now(), Uuid::new_v4());
            let team_dir = dir.join(team_id.to_string());
            std::fs::create_dir_all(&team_dir)
                .with_context(|| format!("failed to create {}", team_dir.display()))?;
            let path = team_dir.join(&file_name);
            report::write_new_file(&path, &report::build_team_report(&data))
                .with_context(|| format!("failed to write {}", path.display()))?;

            let saved = views
                .archive_health_report(NewHealthReport {
                    team_id,
                    file_name,
                    file_path: path.display().to_string(),
                    summary: report::health_summary(&data),
                })
                .await?;
            info!("archived report {}", saved.id);
            println!("Report archived at {}.", path.display());
        }
    }

    Ok(())
}
