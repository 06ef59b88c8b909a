use std::io;

use serde::Serialize;
use uuid::Uuid;

use crate::grades;
use crate::models::{GradeBand, Goal, Subject};
use crate::stats::{self, GoalIndex};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRow {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub department: Option<String>,
    pub job_name: Option<String>,
    pub score: i32,
    pub grade_level: i32,
    pub grade_text: String,
    pub evaluated: bool,
    pub goal_count: usize,
}

pub fn score_rows(subjects: &[Subject], goals: &[Goal], bands: &[GradeBand]) -> Vec<ScoreRow> {
    let index = GoalIndex::new(goals);

    stats::subject_performances(subjects, &index)
        .into_iter()
        .map(|performance| {
            let grade = if performance.goal_count == 0 {
                grades::Grade::Unrated
            } else {
                grades::classify(performance.score, bands)
            };
            ScoreRow {
                id: performance.id,
                full_name: performance.full_name,
                email: performance.email,
                department: performance.department,
                job_name: performance.job_name,
                score: performance.score,
                grade_level: grade.level(),
                grade_text: grade.text().to_string(),
                evaluated: performance.evaluated,
                goal_count: performance.goal_count,
            }
        })
        .collect()
}

pub fn write_scores<W: io::Write>(writer: W, rows: &[ScoreRow]) -> anyhow::Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grades::default_bands;
    use crate::models::EvaluationStatus;

    #[test]
    fn writes_header_and_one_row_per_subject() {
        let kiara = Subject {
            id: Uuid::nil(),
            full_name: Some("Kiara Patel".to_string()),
            email: Some("kiara.patel@northwind.example".to_string()),
            department: Some("Data".to_string()),
            job_name: None,
        };
        let noah = Subject {
            id: Uuid::from_u128(1),
            full_name: None,
            email: None,
            department: None,
            job_name: None,
        };
        let goals = vec![Goal {
            id: Uuid::new_v4(),
            user_id: kiara.id,
            cycle_id: Uuid::nil(),
            title: "Churn model refresh".to_string(),
            weight: Some(100),
            evaluation_score: Some(2),
            evaluation_status: EvaluationStatus::AwaitingApproval,
        }];

        let rows = score_rows(&[kiara, noah], &goals, &default_bands());
        assert_eq!(rows[0].grade_text, "Weak");
        assert_eq!(rows[1].grade_level, 0);

        let mut buffer = Vec::new();
        let written = write_scores(&mut buffer, &rows).expect("csv written");
        assert_eq!(written, 2);

        let text = String::from_utf8(buffer).expect("utf8 output");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "id,full_name,email,department,job_name,score,grade_level,grade_text,evaluated,goal_count"
        );
        assert_eq!(
            lines[1],
            "00000000-0000-0000-0000-000000000000,Kiara Patel,kiara.patel@northwind.example,Data,,40,2,Weak,true,1"
        );
        assert_eq!(
            lines[2],
            "00000000-0000-0000-0000-000000000001,Unnamed Employee,,,,0,0,Not Rated,false,0"
        );
    }
}
