use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::grades;
use crate::models::{EvaluationCycle, EvaluationStatus, Goal, GradeBand, Subject};

/// Which subjects a query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Active direct reports of one manager.
    Manager(Uuid),
    /// Every active profile in an organization.
    Organization(Uuid),
}

impl Scope {
    pub fn from_args(manager: Option<Uuid>, organization: Option<Uuid>) -> anyhow::Result<Self> {
        match (manager, organization) {
            (Some(id), None) => Ok(Scope::Manager(id)),
            (None, Some(id)) => Ok(Scope::Organization(id)),
            _ => anyhow::bail!("exactly one of --manager or --organization is required"),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Scope::Manager(id) => format!("reports of manager {id}"),
            Scope::Organization(id) => format!("organization {id}"),
        }
    }
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let organization_id = Uuid::parse_str("6b1f9a4e-5d0c-4c7e-9a61-2f0e3c8b7d15")?;
    let manager_id = Uuid::parse_str("a4c2e8f1-3b7d-4e59-8c06-91d2f5b3a7e0")?;
    let cycle_id = Uuid::parse_str("f0d3b6a9-7c2e-4a18-b5e4-3c9d1e7f2a86")?;

    sqlx::query(
        r#"
        INSERT INTO performance_review.organizations (id, name)
        VALUES ($1, $2)
        ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
        "#,
    )
    .bind(organization_id)
    .bind("Northwind Analytics")
    .execute(pool)
    .await?;

    let profiles = vec![
        (
            manager_id,
            None,
            "Morgan Reyes",
            "morgan.reyes@northwind.example",
            "Engineering",
            "Engineering Manager",
            "manager",
        ),
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            Some(manager_id),
            "Avery Lee",
            "avery.lee@northwind.example",
            "Engineering",
            "Backend Engineer",
            "employee",
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            Some(manager_id),
            "Jules Moreno",
            "jules.moreno@northwind.example",
            "Engineering",
            "Frontend Engineer",
            "employee",
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            Some(manager_id),
            "Kiara Patel",
            "kiara.patel@northwind.example",
            "Data",
            "Analyst",
            "employee",
        ),
        (
            Uuid::parse_str("8e4b2c71-6f0a-4d93-a2c8-5b1e7d9f3064")?,
            Some(manager_id),
            "Noah Fischer",
            "noah.fischer@northwind.example",
            "Engineering",
            "QA Engineer",
            "employee",
        ),
    ];

    for (id, manager, name, email, department, job_name, role) in profiles {
        sqlx::query(
            r#"
            INSERT INTO performance_review.profiles
            (id, organization_id, manager_id, full_name, email, department, job_name, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                department = EXCLUDED.department,
                job_name = EXCLUDED.job_name
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(manager)
        .bind(name)
        .bind(email)
        .bind(department)
        .bind(job_name)
        .bind(role)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO performance_review.evaluation_cycles
        (id, organization_id, name, start_date, end_date, status)
        VALUES ($1, $2, $3, $4, $5, 'active')
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(cycle_id)
    .bind(organization_id)
    .bind("2026 H1 review")
    .bind(NaiveDate::from_ymd_opt(2026, 1, 1).context("invalid date")?)
    .bind(NaiveDate::from_ymd_opt(2026, 6, 30).context("invalid date")?)
    .execute(pool)
    .await?;

    // Noah has no goals yet, so the seed exercises the zero-goal path.
    let goals = vec![
        ("seed-001", "avery.lee@northwind.example", "Cut API p99 latency", 60, Some(5), "finalized"),
        ("seed-002", "avery.lee@northwind.example", "Mentor two juniors", 40, Some(4), "finalized"),
        ("seed-003", "jules.moreno@northwind.example", "Ship design system v2", 50, Some(3), "awaiting_approval"),
        ("seed-004", "jules.moreno@northwind.example", "Accessibility audit", 30, None, "awaiting_evaluation"),
        ("seed-005", "kiara.patel@northwind.example", "Churn model refresh", 100, Some(2), "awaiting_approval"),
    ];

    for (source_key, email, title, weight, score, status) in goals {
        let user_id: Uuid = sqlx::query(
            "SELECT id FROM performance_review.profiles WHERE email = $1",
        )
        .bind(email)
        .fetch_one(pool)
        .await?
        .get("id");

        sqlx::query(
            r#"
            INSERT INTO performance_review.goals
            (id, user_id, cycle_id, title, weight, evaluation_score, evaluation_status, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(cycle_id)
        .bind(title)
        .bind(weight)
        .bind(score)
        .bind(status)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    info!(%organization_id, %manager_id, %cycle_id, "seed data loaded");
    Ok(())
}

pub async fn organization_of(pool: &PgPool, scope: Scope) -> anyhow::Result<Option<Uuid>> {
    match scope {
        Scope::Organization(id) => Ok(Some(id)),
        Scope::Manager(id) => {
            let row = sqlx::query(
                "SELECT organization_id FROM performance_review.profiles WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(pool)
            .await?
            .with_context(|| format!("no profile found for manager {id}"))?;
            Ok(row.get("organization_id"))
        }
    }
}

fn cycle_from_row(row: &PgRow) -> EvaluationCycle {
    EvaluationCycle {
        id: row.get("id"),
        organization_id: row.get("organization_id"),
        name: row.get("name"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        status: row.get("status"),
    }
}

/// Loads the requested cycle, or the most recently started active cycle of the organization.
pub async fn fetch_cycle(
    pool: &PgPool,
    cycle_id: Option<Uuid>,
    organization_id: Option<Uuid>,
) -> anyhow::Result<EvaluationCycle> {
    let query = "SELECT id, organization_id, name, start_date, end_date, status \
                 FROM performance_review.evaluation_cycles";

    let row = match cycle_id {
        Some(id) => sqlx::query(&format!("{query} WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .with_context(|| format!("evaluation cycle {id} does not exist"))?,
        None => sqlx::query(&format!(
            "{query} WHERE status = 'active' AND organization_id IS NOT DISTINCT FROM $1 \
             ORDER BY start_date DESC LIMIT 1"
        ))
        .bind(organization_id)
        .fetch_optional(pool)
        .await?
        .context("no active evaluation cycle found; pass --cycle explicitly")?,
    };

    let cycle = cycle_from_row(&row);
    debug!(cycle = %cycle.name, id = %cycle.id, "resolved evaluation cycle");
    Ok(cycle)
}

fn subject_from_row(row: &PgRow) -> Subject {
    Subject {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        department: row.get("department"),
        job_name: row.get("job_name"),
    }
}

pub async fn fetch_subjects(pool: &PgPool, scope: Scope) -> anyhow::Result<Vec<Subject>> {
    let (filter, id) = match scope {
        Scope::Manager(id) => ("manager_id = $1", id),
        Scope::Organization(id) => ("organization_id = $1", id),
    };

    let rows = sqlx::query(&format!(
        "SELECT id, full_name, email, department, job_name \
         FROM performance_review.profiles \
         WHERE status = 'active' AND {filter} \
         ORDER BY full_name NULLS LAST, id"
    ))
    .bind(id)
    .fetch_all(pool)
    .await?;

    let subjects: Vec<Subject> = rows.iter().map(subject_from_row).collect();
    debug!(count = subjects.len(), scope = %scope.label(), "fetched subjects");
    Ok(subjects)
}

pub async fn fetch_subject(pool: &PgPool, id: Uuid) -> anyhow::Result<(Subject, Option<Uuid>)> {
    let row = sqlx::query(
        "SELECT id, full_name, email, department, job_name, organization_id \
         FROM performance_review.profiles WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no profile found for {id}"))?;

    Ok((subject_from_row(&row), row.get("organization_id")))
}

pub async fn fetch_goals(
    pool: &PgPool,
    cycle_id: Uuid,
    subject_ids: &[Uuid],
) -> anyhow::Result<Vec<Goal>> {
    if subject_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query(
        r#"
        SELECT id, user_id, cycle_id, title, weight, evaluation_score, evaluation_status
        FROM performance_review.goals
        WHERE cycle_id = $1 AND user_id = ANY($2)
        ORDER BY created_at, id
        "#,
    )
    .bind(cycle_id)
    .bind(subject_ids)
    .fetch_all(pool)
    .await?;

    let mut goals = Vec::with_capacity(rows.len());
    for row in rows {
        let status: String = row.get("evaluation_status");
        goals.push(Goal {
            id: row.get("id"),
            user_id: row.get("user_id"),
            cycle_id: row.get("cycle_id"),
            title: row.get("title"),
            weight: row.get("weight"),
            evaluation_score: row.get("evaluation_score"),
            evaluation_status: status.parse::<EvaluationStatus>()?,
        });
    }

    Ok(goals)
}

/// Organization bands first, then the shared bands stored without an organization.
/// `None` means nothing is configured and the caller must supply its fallback.
pub async fn fetch_grades(
    pool: &PgPool,
    organization_id: Option<Uuid>,
) -> anyhow::Result<Option<Vec<GradeBand>>> {
    let query = "SELECT min_score, max_score, grade_text, grade_level \
                 FROM performance_review.performance_grades";

    let mut rows = Vec::new();
    if let Some(id) = organization_id {
        rows = sqlx::query(&format!(
            "{query} WHERE organization_id = $1 ORDER BY min_score, grade_level"
        ))
        .bind(id)
        .fetch_all(pool)
        .await?;
    }
    if rows.is_empty() {
        rows = sqlx::query(&format!(
            "{query} WHERE organization_id IS NULL ORDER BY min_score, grade_level"
        ))
        .fetch_all(pool)
        .await?;
    }

    if rows.is_empty() {
        debug!(?organization_id, "no grade bands configured");
        return Ok(None);
    }

    let bands: Vec<GradeBand> = rows
        .iter()
        .map(|row| GradeBand {
            min_score: row.get("min_score"),
            max_score: row.get("max_score"),
            grade_text: row.get("grade_text"),
            grade_level: row.get("grade_level"),
        })
        .collect();

    grades::validate_bands(&bands).context("configured grade bands are invalid")?;
    for issue in grades::coverage_issues(&bands) {
        warn!(?organization_id, %issue, "grade band coverage");
    }

    Ok(Some(bands))
}
