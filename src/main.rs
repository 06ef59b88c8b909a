use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

mod config;
mod db;
mod export;
mod grades;
mod models;
mod report;
mod scoring;
mod stats;
mod telemetry;

use crate::db::Scope;
use crate::models::{EvaluationCycle, GradeBand, Goal, Subject};

#[derive(Parser)]
#[command(name = "perf-review")]
#[command(about = "Weighted goal scoring and team performance reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("scope")
        .args(["manager", "organization"])
        .required(true)
        .multiple(false)
))]
struct ScopeArgs {
    /// Score the active direct reports of this manager profile
    #[arg(long)]
    manager: Option<Uuid>,
    /// Score every active profile of this organization
    #[arg(long)]
    organization: Option<Uuid>,
    /// Evaluation cycle to score (defaults to the latest active cycle)
    #[arg(long)]
    cycle: Option<Uuid>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Show the grade bands in effect for an organization
    Grades {
        #[arg(long)]
        organization: Option<Uuid>,
    },
    /// Summarize team scores, grade distribution and top/low performers
    Score {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value_t = stats::DEFAULT_PERFORMER_LIMIT)]
        limit: usize,
        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Break one employee's score down goal by goal
    Subject {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        cycle: Option<Uuid>,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value_t = stats::DEFAULT_PERFORMER_LIMIT)]
        limit: usize,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export per-employee scores as CSV
    Export {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value = "scores.csv")]
        out: PathBuf,
    },
}

struct TeamSnapshot {
    scope: Scope,
    cycle: EvaluationCycle,
    subjects: Vec<Subject>,
    goals: Vec<Goal>,
    bands: Vec<GradeBand>,
}

async fn load_bands(pool: &PgPool, organization_id: Option<Uuid>) -> anyhow::Result<Vec<GradeBand>> {
    match db::fetch_grades(pool, organization_id).await? {
        Some(bands) => Ok(bands),
        None => {
            info!(?organization_id, "using default grade bands");
            Ok(grades::default_bands())
        }
    }
}

async fn load_team(pool: &PgPool, args: &ScopeArgs) -> anyhow::Result<TeamSnapshot> {
    let scope = Scope::from_args(args.manager, args.organization)?;
    let organization_id = db::organization_of(pool, scope).await?;
    let cycle = db::fetch_cycle(pool, args.cycle, organization_id).await?;
    let subjects = db::fetch_subjects(pool, scope).await?;
    let subject_ids: Vec<Uuid> = subjects.iter().map(|subject| subject.id).collect();
    let goals = db::fetch_goals(pool, cycle.id, &subject_ids).await?;
    let bands = load_bands(pool, organization_id).await?;

    info!(
        scope = %scope.label(),
        cycle = %cycle.name,
        subjects = subjects.len(),
        goals = goals.len(),
        "loaded team snapshot"
    );

    Ok(TeamSnapshot {
        scope,
        cycle,
        subjects,
        goals,
        bands,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::AppConfig::load()?;
    telemetry::init(&config.log_level)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Grades { organization } => {
            let bands = load_bands(&pool, organization).await?;
            println!("Grade bands:");
            for band in &bands {
                println!(
                    "- {:>3}..={:<3} {} (level {})",
                    band.min_score, band.max_score, band.grade_text, band.grade_level
                );
            }
            for issue in grades::coverage_issues(&bands) {
                println!("! {issue}");
            }
        }
        Commands::Score { scope, limit, json } => {
            let team = load_team(&pool, &scope).await?;
            let team_stats =
                stats::compute_team_stats(&team.subjects, &team.goals, &team.bands, limit);

            if json {
                println!("{}", serde_json::to_string_pretty(&team_stats)?);
                return Ok(());
            }

            if team.subjects.is_empty() {
                println!("No team members found for {}.", team.scope.label());
                return Ok(());
            }

            let summary = &team_stats.summary;
            println!("{} in {}:", team.scope.label(), team.cycle.name);
            println!(
                "- {} members, {} completed, {} pending, average score {}%",
                summary.total_subjects,
                summary.completed_count,
                summary.pending_count,
                summary.average_score
            );
            println!("Grade distribution:");
            for bucket in team_stats.grade_distribution.values().rev() {
                println!(
                    "- {} ({}): {}",
                    bucket.grade_text,
                    bucket.count,
                    bucket.members.join(", ")
                );
            }
            println!("Top performers:");
            for performer in &team_stats.top_performers {
                println!("- {} ({}) score {}%", performer.full_name, performer.email, performer.score);
            }
            println!("Needs improvement:");
            for performer in &team_stats.low_performers {
                println!("- {} ({}) score {}%", performer.full_name, performer.email, performer.score);
            }
        }
        Commands::Subject { id, cycle } => {
            let (subject, organization_id) = db::fetch_subject(&pool, id).await?;
            let cycle = db::fetch_cycle(&pool, cycle, organization_id).await?;
            let goals = db::fetch_goals(&pool, cycle.id, &[subject.id]).await?;
            let bands = load_bands(&pool, organization_id).await?;

            let refs: Vec<&Goal> = goals.iter().collect();
            let detail = scoring::breakdown(&refs);
            let grade = grades::classify(detail.score, &bands);

            println!("{} in {}:", subject.display_name(), cycle.name);
            println!("- score {}%, grade {}, status {}", detail.score, grade, detail.status);
            if !grade.is_rated() && !goals.is_empty() {
                warn!(subject = %subject.id, score = detail.score, "score falls outside every grade band");
            }
            if detail.weight_warning {
                warn!(subject = %subject.id, total_weight = detail.total_weight, "goal weights do not add up to 100");
                println!("- goal weights add up to {}%, not 100%", detail.total_weight);
            }
            for goal in &detail.goals {
                println!(
                    "- {} weight {}% score {}/5 contributes {:.1}",
                    goal.title, goal.weight, goal.raw_score, goal.contribution
                );
            }
        }
        Commands::Report { scope, limit, out } => {
            let team = load_team(&pool, &scope).await?;
            let report = report::build_report(
                &team.scope.label(),
                &team.cycle,
                &team.subjects,
                &team.goals,
                &team.bands,
                limit,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { scope, out } => {
            let team = load_team(&pool, &scope).await?;
            let rows = export::score_rows(&team.subjects, &team.goals, &team.bands);
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let written = export::write_scores(file, &rows)?;
            println!("Exported {written} employees to {}.", out.display());
        }
    }

    Ok(())
}
