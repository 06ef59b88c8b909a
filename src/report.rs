use std::fmt::Write;

use crate::grades;
use crate::models::{EvaluationCycle, GradeBand, Goal, Subject, SubjectPerformance, TeamStats};
use crate::scoring;
use crate::stats::{self, GoalIndex};

fn share_of(count: usize, total: usize) -> i32 {
    if total == 0 {
        0
    } else {
        (count as f64 / total as f64 * 100.0).round() as i32
    }
}

fn performer_line(performer: &SubjectPerformance) -> String {
    let mut line = format!("- {} score {}%", performer.full_name, performer.score);
    match (&performer.department, &performer.job_name) {
        (Some(department), Some(job)) => {
            let _ = write!(line, " ({department}, {job})");
        }
        (Some(single), None) | (None, Some(single)) => {
            let _ = write!(line, " ({single})");
        }
        (None, None) => {}
    }
    line
}

pub fn build_report(
    scope_label: &str,
    cycle: &EvaluationCycle,
    subjects: &[Subject],
    goals: &[Goal],
    bands: &[GradeBand],
    limit: usize,
) -> String {
    let team: TeamStats = stats::compute_team_stats(subjects, goals, bands, limit);
    let summary = &team.summary;
    let index = GoalIndex::new(goals);

    let mut output = String::new();

    let _ = writeln!(output, "# Team Performance Report");
    let _ = writeln!(
        output,
        "Generated for {} in cycle \"{}\" ({} to {})",
        scope_label, cycle.name, cycle.start_date, cycle.end_date
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Metrics");
    let _ = writeln!(output, "- Team members: {}", summary.total_subjects);
    let _ = writeln!(output, "- Pending evaluations: {}", summary.pending_count);
    let _ = writeln!(output, "- Completed evaluations: {}", summary.completed_count);
    let _ = writeln!(output, "- Average score: {}%", summary.average_score);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Distribution");

    if team.grade_distribution.is_empty() {
        let _ = writeln!(output, "No goals recorded for this cycle.");
    } else {
        for bucket in team.grade_distribution.values().rev() {
            let noun = if bucket.count == 1 { "employee" } else { "employees" };
            let _ = writeln!(
                output,
                "- {} (level {}): {} {} ({}%) - {}",
                bucket.grade_text,
                bucket.grade_level,
                bucket.count,
                noun,
                share_of(bucket.count, summary.total_subjects),
                bucket.members.join(", ")
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Performers");
    if team.top_performers.is_empty() {
        let _ = writeln!(output, "No data available.");
    } else {
        for performer in &team.top_performers {
            let _ = writeln!(output, "{}", performer_line(performer));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Needs Improvement");
    if team.low_performers.is_empty() {
        let _ = writeln!(output, "No data available.");
    } else {
        for performer in &team.low_performers {
            let _ = writeln!(output, "{}", performer_line(performer));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Evaluation Status");

    if subjects.is_empty() {
        let _ = writeln!(output, "No team members in scope.");
    } else {
        let _ = writeln!(output, "| Employee | Score | Grade | Status | Total weight |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for subject in subjects {
            let subject_goals = index.goals_for(subject.id);
            let detail = scoring::breakdown(subject_goals);
            let grade = if subject_goals.is_empty() {
                grades::UNRATED_TEXT
            } else {
                grades::classify(detail.score, bands).text()
            };
            let weight = if detail.weight_warning {
                format!("{}% (should be 100%)", detail.total_weight)
            } else {
                format!("{}%", detail.total_weight)
            };
            let _ = writeln!(
                output,
                "| {} | {}% | {} | {} | {} |",
                subject.display_name(),
                detail.score,
                grade,
                detail.status,
                weight
            );
        }
    }

    output
}
