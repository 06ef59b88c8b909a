use std::collections::{BTreeMap, HashMap};

use tracing::debug;
use uuid::Uuid;

use crate::grades;
use crate::models::{
    GradeBand, GradeBucket, Goal, Subject, SubjectPerformance, TeamStats, TeamSummary,
};
use crate::scoring;

pub const DEFAULT_PERFORMER_LIMIT: usize = 3;

/// Goals grouped per subject, preserving the order they were supplied in.
pub struct GoalIndex<'a> {
    by_subject: HashMap<Uuid, Vec<&'a Goal>>,
}

impl<'a> GoalIndex<'a> {
    pub fn new(goals: &'a [Goal]) -> Self {
        let mut by_subject: HashMap<Uuid, Vec<&'a Goal>> = HashMap::new();
        for goal in goals {
            by_subject.entry(goal.user_id).or_default().push(goal);
        }
        Self { by_subject }
    }

    pub fn goals_for(&self, subject_id: Uuid) -> &[&'a Goal] {
        self.by_subject
            .get(&subject_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Every goal carries a score, and there is at least one goal.
pub fn is_completed(goals: &[&Goal]) -> bool {
    !goals.is_empty() && goals.iter().all(|goal| scoring::is_scored(goal))
}

pub fn team_summary(subjects: &[Subject], index: &GoalIndex<'_>) -> TeamSummary {
    let mut completed_count = 0usize;
    let mut score_total: i64 = 0;

    for subject in subjects {
        let goals = index.goals_for(subject.id);
        if is_completed(goals) {
            completed_count += 1;
            score_total += scoring::aggregate(goals.iter().copied()) as i64;
        }
    }

    let average_score = if completed_count == 0 {
        0
    } else {
        (score_total as f64 / completed_count as f64).round() as i32
    };

    TeamSummary {
        total_subjects: subjects.len(),
        pending_count: subjects.len() - completed_count,
        completed_count,
        average_score,
    }
}

pub fn grade_distribution(
    subjects: &[Subject],
    index: &GoalIndex<'_>,
    bands: &[GradeBand],
) -> BTreeMap<i32, GradeBucket> {
    let mut distribution: BTreeMap<i32, GradeBucket> = BTreeMap::new();

    for subject in subjects {
        let goals = index.goals_for(subject.id);
        if goals.is_empty() {
            continue;
        }

        let score = scoring::aggregate(goals.iter().copied());
        let grade = grades::classify(score, bands);
        let bucket = distribution
            .entry(grade.level())
            .or_insert_with(|| GradeBucket {
                grade_level: grade.level(),
                grade_text: grade.text().to_string(),
                count: 0,
                members: Vec::new(),
            });
        bucket.count += 1;
        bucket.members.push(subject.display_name().to_string());
    }

    distribution
}

/// Per-subject scores in input order. Subjects without goals score 0.
pub fn subject_performances(
    subjects: &[Subject],
    index: &GoalIndex<'_>,
) -> Vec<SubjectPerformance> {
    subjects
        .iter()
        .map(|subject| {
            let goals = index.goals_for(subject.id);
            SubjectPerformance {
                id: subject.id,
                full_name: subject.display_name().to_string(),
                email: subject.email.clone().unwrap_or_default(),
                department: subject.department.clone(),
                job_name: subject.job_name.clone(),
                score: scoring::aggregate(goals.iter().copied()),
                goal_count: goals.len(),
                evaluated: is_completed(goals),
            }
        })
        .collect()
}

pub fn top_performers(
    subjects: &[Subject],
    index: &GoalIndex<'_>,
    limit: usize,
) -> Vec<SubjectPerformance> {
    let mut ranked = subject_performances(subjects, index);
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(limit);
    ranked
}

pub fn low_performers(
    subjects: &[Subject],
    index: &GoalIndex<'_>,
    limit: usize,
) -> Vec<SubjectPerformance> {
    let mut ranked = subject_performances(subjects, index);
    ranked.sort_by(|a, b| a.score.cmp(&b.score));
    ranked.truncate(limit);
    ranked
}

pub fn compute_team_stats(
    subjects: &[Subject],
    goals: &[Goal],
    bands: &[GradeBand],
    limit: usize,
) -> TeamStats {
    let index = GoalIndex::new(goals);
    let summary = team_summary(subjects, &index);
    debug!(
        subjects = summary.total_subjects,
        completed = summary.completed_count,
        goals = goals.len(),
        "computed team summary"
    );

    TeamStats {
        summary,
        grade_distribution: grade_distribution(subjects, &index, bands),
        top_performers: top_performers(subjects, &index, limit),
        low_performers: low_performers(subjects, &index, limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grades::default_bands;
    use crate::models::EvaluationStatus;

    fn subject(name: &str) -> Subject {
        Subject {
            id: Uuid::new_v4(),
            full_name: Some(name.to_string()),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            department: Some("Engineering".to_string()),
            job_name: None,
        }
    }

    fn goal_for(subject: &Subject, weight: i32, score: Option<i32>) -> Goal {
        Goal {
            id: Uuid::new_v4(),
            user_id: subject.id,
            cycle_id: Uuid::nil(),
            title: "Reduce support backlog".to_string(),
            weight: Some(weight),
            evaluation_score: score,
            evaluation_status: EvaluationStatus::AwaitingEvaluation,
        }
    }

    fn three_person_team() -> (Vec<Subject>, Vec<Goal>) {
        let avery = subject("Avery");
        let jules = subject("Jules");
        let kiara = subject("Kiara");
        let goals = vec![
            goal_for(&avery, 100, Some(5)),
            goal_for(&jules, 100, None),
        ];
        (vec![avery, jules, kiara], goals)
    }

    #[test]
    fn counts_completed_and_pending_subjects() {
        let (subjects, goals) = three_person_team();
        let stats = compute_team_stats(&subjects, &goals, &default_bands(), 3);

        assert_eq!(stats.summary.total_subjects, 3);
        assert_eq!(stats.summary.completed_count, 1);
        assert_eq!(stats.summary.pending_count, 2);
        assert_eq!(stats.summary.average_score, 100);
    }

    #[test]
    fn one_missing_score_keeps_subject_pending() {
        let avery = subject("Avery");
        let goals = vec![
            goal_for(&avery, 50, Some(5)),
            goal_for(&avery, 50, None),
        ];
        let subjects = vec![avery];
        let index = GoalIndex::new(&goals);
        let summary = team_summary(&subjects, &index);
        assert_eq!(summary.completed_count, 0);
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.average_score, 0);
    }

    #[test]
    fn average_is_rounded_mean_of_completed() {
        let avery = subject("Avery");
        let jules = subject("Jules");
        let goals = vec![
            goal_for(&avery, 100, Some(4)),
            goal_for(&jules, 50, Some(3)),
            goal_for(&jules, 50, Some(4)),
        ];
        let subjects = vec![avery, jules];
        let stats = compute_team_stats(&subjects, &goals, &default_bands(), 3);
        // (80 + 70) / 2
        assert_eq!(stats.summary.average_score, 75);
    }

    #[test]
    fn distribution_includes_pending_subjects_with_goals() {
        let (subjects, goals) = three_person_team();
        let stats = compute_team_stats(&subjects, &goals, &default_bands(), 3);

        assert_eq!(stats.grade_distribution.len(), 2);
        let excellent = &stats.grade_distribution[&5];
        assert_eq!(excellent.count, 1);
        assert_eq!(excellent.members, vec!["Avery".to_string()]);
        assert_eq!(excellent.grade_text, "Excellent");

        // an unscored goal counts as 1, i.e. 20%
        let unsatisfactory = &stats.grade_distribution[&1];
        assert_eq!(unsatisfactory.members, vec!["Jules".to_string()]);
    }

    #[test]
    fn distribution_keeps_subject_order_and_unrated_bucket() {
        let avery = subject("Avery");
        let jules = subject("Jules");
        let mut unnamed = subject("Ghost");
        unnamed.full_name = None;
        let goals = vec![
            goal_for(&jules, 100, Some(3)),
            goal_for(&avery, 100, Some(3)),
            goal_for(&unnamed, 100, Some(5)),
        ];
        let subjects = vec![avery, jules, unnamed];
        let bands = vec![GradeBand::new(0, 80, "Meets", 1)];
        let index = GoalIndex::new(&goals);

        let distribution = grade_distribution(&subjects, &index, &bands);
        assert_eq!(distribution[&1].members, vec!["Avery", "Jules"]);
        let unrated = &distribution[&0];
        assert_eq!(unrated.grade_text, "Not Rated");
        assert_eq!(unrated.members, vec!["Unnamed Employee"]);
    }

    #[test]
    fn ranks_top_and_low_performers() {
        let avery = subject("Avery");
        let jules = subject("Jules");
        let kiara = subject("Kiara");
        let goals = vec![goal_for(&avery, 100, Some(4)), goal_for(&jules, 100, Some(2))];
        let subjects = vec![avery.clone(), jules, kiara.clone()];
        let index = GoalIndex::new(&goals);

        let top = top_performers(&subjects, &index, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, avery.id);
        assert_eq!(top[0].score, 80);

        let low = low_performers(&subjects, &index, 1);
        assert_eq!(low[0].id, kiara.id);
        assert_eq!(low[0].score, 0);
        assert_eq!(low[0].goal_count, 0);
        assert!(!low[0].evaluated);
    }

    #[test]
    fn ties_keep_input_order() {
        let first = subject("First");
        let second = subject("Second");
        let third = subject("Third");
        let goals = vec![
            goal_for(&first, 100, Some(3)),
            goal_for(&second, 100, Some(3)),
            goal_for(&third, 100, Some(3)),
        ];
        let subjects = vec![first, second, third];
        let index = GoalIndex::new(&goals);

        let names = |list: Vec<SubjectPerformance>| -> Vec<String> {
            list.into_iter().map(|p| p.full_name).collect()
        };
        assert_eq!(
            names(top_performers(&subjects, &index, 3)),
            vec!["First", "Second", "Third"]
        );
        assert_eq!(
            names(low_performers(&subjects, &index, 2)),
            vec!["First", "Second"]
        );
    }

    #[test]
    fn goals_of_unknown_subjects_are_ignored() {
        let avery = subject("Avery");
        let stranger = subject("Stranger");
        let goals = vec![goal_for(&stranger, 100, Some(5))];
        let subjects = vec![avery];
        let stats = compute_team_stats(&subjects, &goals, &default_bands(), 3);
        assert_eq!(stats.summary.completed_count, 0);
        assert!(stats.grade_distribution.is_empty());
        assert_eq!(stats.top_performers[0].score, 0);
    }

    #[test]
    fn empty_team_is_all_zero() {
        let stats = compute_team_stats(&[], &[], &default_bands(), DEFAULT_PERFORMER_LIMIT);
        assert_eq!(stats.summary.total_subjects, 0);
        assert_eq!(stats.summary.average_score, 0);
        assert!(stats.top_performers.is_empty());
        assert!(stats.low_performers.is_empty());
    }

    #[test]
    fn repeated_runs_serialize_identically() {
        let (subjects, goals) = three_person_team();
        let bands = default_bands();
        let first = compute_team_stats(&subjects, &goals, &bands, 3);
        let second = compute_team_stats(&subjects, &goals, &bands, 3);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
