use crate::models::{EvaluationStatus, Goal, GoalBreakdown, GoalContribution};

pub const MAX_SCORE: i32 = 5;
pub const FULL_WEIGHT: i64 = 100;

/// Converts a 1-5 evaluation score to a percentage. An unscored goal counts as 1.
pub fn normalize(raw_score: Option<i32>) -> f64 {
    let score = match raw_score {
        Some(value) if value != 0 => value,
        _ => 1,
    };
    score as f64 / MAX_SCORE as f64 * 100.0
}

pub fn is_scored(goal: &Goal) -> bool {
    matches!(goal.evaluation_score, Some(value) if value != 0)
}

pub fn total_weight<'a, I>(goals: I) -> i64
where
    I: IntoIterator<Item = &'a Goal>,
{
    goals
        .into_iter()
        .map(|goal| goal.weight.unwrap_or(0) as i64)
        .sum()
}

/// Weighted mean of the normalized goal scores, rounded once at the end.
///
/// Returns 0 when the goals carry no weight at all.
pub fn aggregate<'a, I>(goals: I) -> i32
where
    I: IntoIterator<Item = &'a Goal>,
{
    let mut weight_sum: i64 = 0;
    let mut weighted: f64 = 0.0;

    for goal in goals {
        let weight = goal.weight.unwrap_or(0);
        weight_sum += weight as i64;
        weighted += normalize(goal.evaluation_score) * weight as f64;
    }

    if weight_sum == 0 {
        return 0;
    }

    (weighted / weight_sum as f64).round() as i32
}

/// Most frequent status across the goals; ties go to the status first seen later.
pub fn dominant_status(goals: &[&Goal]) -> EvaluationStatus {
    let mut counts: Vec<(EvaluationStatus, usize)> = Vec::new();

    for goal in goals {
        match counts
            .iter_mut()
            .find(|(status, _)| *status == goal.evaluation_status)
        {
            Some(entry) => entry.1 += 1,
            None => counts.push((goal.evaluation_status, 1)),
        }
    }

    let mut best: Option<(EvaluationStatus, usize)> = None;
    for (status, count) in counts {
        match best {
            Some((_, best_count)) if best_count > count => {}
            _ => best = Some((status, count)),
        }
    }

    best.map(|(status, _)| status)
        .unwrap_or(EvaluationStatus::AwaitingGoalSetting)
}

pub fn breakdown(goals: &[&Goal]) -> GoalBreakdown {
    let total = total_weight(goals.iter().copied());

    let mut contributions: Vec<GoalContribution> = goals
        .iter()
        .map(|goal| {
            let weight = goal.weight.unwrap_or(0);
            let normalized = normalize(goal.evaluation_score);
            let contribution = if total == 0 {
                0.0
            } else {
                normalized * weight as f64 / total as f64
            };
            GoalContribution {
                title: goal.title.clone(),
                weight,
                raw_score: goal.evaluation_score.unwrap_or(0),
                normalized,
                contribution,
            }
        })
        .collect();
    contributions.sort_by(|a, b| b.weight.cmp(&a.weight));

    GoalBreakdown {
        total_weight: total,
        weight_warning: total != FULL_WEIGHT,
        score: aggregate(goals.iter().copied()),
        status: dominant_status(goals),
        goals: contributions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn goal(weight: Option<i32>, score: Option<i32>) -> Goal {
        Goal {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            cycle_id: Uuid::nil(),
            title: "Ship quarterly roadmap".to_string(),
            weight,
            evaluation_score: score,
            evaluation_status: EvaluationStatus::AwaitingEvaluation,
        }
    }

    fn with_status(status: EvaluationStatus) -> Goal {
        Goal {
            evaluation_status: status,
            ..goal(Some(10), Some(3))
        }
    }

    #[test]
    fn normalizes_each_score_exactly() {
        assert_eq!(normalize(Some(1)), 20.0);
        assert_eq!(normalize(Some(2)), 40.0);
        assert_eq!(normalize(Some(3)), 60.0);
        assert_eq!(normalize(Some(4)), 80.0);
        assert_eq!(normalize(Some(5)), 100.0);
    }

    #[test]
    fn missing_score_counts_as_lowest() {
        assert_eq!(normalize(None), 20.0);
        let goals = vec![goal(Some(100), None)];
        assert_eq!(aggregate(&goals), 20);
    }

    #[test]
    fn zero_total_weight_yields_zero() {
        let empty: Vec<Goal> = Vec::new();
        assert_eq!(aggregate(&empty), 0);
        assert_eq!(aggregate(&[goal(Some(0), Some(5))]), 0);
        assert_eq!(aggregate(&[goal(None, Some(5))]), 0);
    }

    #[test]
    fn weighted_mean_rounds_once() {
        let goals = vec![goal(Some(50), Some(5)), goal(Some(50), Some(1))];
        assert_eq!(aggregate(&goals), 60);

        // (100 * 1 + 80 * 1 + 60 * 1) / 3 = 80
        let goals = vec![
            goal(Some(1), Some(5)),
            goal(Some(1), Some(4)),
            goal(Some(1), Some(3)),
        ];
        assert_eq!(aggregate(&goals), 80);

        // 100 * 2/3 + 20 * 1/3 = 73.33
        let goals = vec![goal(Some(2), Some(5)), goal(Some(1), Some(1))];
        assert_eq!(aggregate(&goals), 73);
    }

    #[test]
    fn weights_need_not_sum_to_hundred() {
        let goals = vec![goal(Some(30), Some(4)), goal(Some(10), Some(2))];
        // (80 * 30 + 40 * 10) / 40 = 70
        assert_eq!(aggregate(&goals), 70);
    }

    #[test]
    fn aggregate_ignores_uniform_weight_scaling() {
        let base = vec![
            goal(Some(35), Some(4)),
            goal(Some(25), Some(2)),
            goal(Some(40), None),
        ];
        let expected = aggregate(&base);

        for k in [2, 3, 7, 10] {
            let scaled: Vec<Goal> = base
                .iter()
                .map(|g| goal(g.weight.map(|w| w * k), g.evaluation_score))
                .collect();
            assert_eq!(aggregate(&scaled), expected, "scale factor {k}");
        }
    }

    #[test]
    fn dominant_status_defaults_and_counts() {
        assert_eq!(dominant_status(&[]), EvaluationStatus::AwaitingGoalSetting);

        let goals = vec![
            with_status(EvaluationStatus::Finalized),
            with_status(EvaluationStatus::AwaitingApproval),
            with_status(EvaluationStatus::AwaitingApproval),
        ];
        let refs: Vec<&Goal> = goals.iter().collect();
        assert_eq!(dominant_status(&refs), EvaluationStatus::AwaitingApproval);
    }

    #[test]
    fn dominant_status_tie_prefers_later_status() {
        let goals = vec![
            with_status(EvaluationStatus::AwaitingEvaluation),
            with_status(EvaluationStatus::Finalized),
            with_status(EvaluationStatus::AwaitingEvaluation),
            with_status(EvaluationStatus::Finalized),
        ];
        let refs: Vec<&Goal> = goals.iter().collect();
        assert_eq!(dominant_status(&refs), EvaluationStatus::Finalized);
    }

    #[test]
    fn breakdown_orders_by_weight_and_flags_totals() {
        let mut light = goal(Some(20), Some(5));
        light.title = "Mentor new hires".to_string();
        let mut heavy = goal(Some(60), None);
        heavy.title = "Migrate billing".to_string();
        let goals = vec![light, heavy];
        let refs: Vec<&Goal> = goals.iter().collect();

        let detail = breakdown(&refs);
        assert_eq!(detail.total_weight, 80);
        assert!(detail.weight_warning);
        assert_eq!(detail.goals[0].title, "Migrate billing");
        assert_eq!(detail.goals[0].raw_score, 0);
        assert_eq!(detail.goals[0].normalized, 20.0);
        assert!((detail.goals[0].contribution - 15.0).abs() < 1e-9);
        assert!((detail.goals[1].contribution - 25.0).abs() < 1e-9);
        // (20 * 60 + 100 * 20) / 80 = 40
        assert_eq!(detail.score, 40);
    }

    #[test]
    fn breakdown_accepts_full_weight() {
        let goals = vec![goal(Some(70), Some(4)), goal(Some(30), Some(3))];
        let refs: Vec<&Goal> = goals.iter().collect();
        let detail = breakdown(&refs);
        assert!(!detail.weight_warning);
        assert_eq!(detail.score, 74);
    }
}
