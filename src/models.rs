use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const UNNAMED_SUBJECT: &str = "Unnamed Employee";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    AwaitingGoalSetting,
    AwaitingEvaluation,
    AwaitingApproval,
    Finalized,
}

impl EvaluationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStatus::AwaitingGoalSetting => "awaiting_goal_setting",
            EvaluationStatus::AwaitingEvaluation => "awaiting_evaluation",
            EvaluationStatus::AwaitingApproval => "awaiting_approval",
            EvaluationStatus::Finalized => "finalized",
        }
    }
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluationStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "awaiting_goal_setting" => Ok(EvaluationStatus::AwaitingGoalSetting),
            "awaiting_evaluation" => Ok(EvaluationStatus::AwaitingEvaluation),
            "awaiting_approval" => Ok(EvaluationStatus::AwaitingApproval),
            "finalized" => Ok(EvaluationStatus::Finalized),
            other => Err(anyhow::anyhow!("unknown evaluation status '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cycle_id: Uuid,
    pub title: String,
    pub weight: Option<i32>,
    pub evaluation_score: Option<i32>,
    pub evaluation_status: EvaluationStatus,
}

#[derive(Debug, Clone)]
pub struct Subject {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub job_name: Option<String>,
}

impl Subject {
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => UNNAMED_SUBJECT,
        }
    }
}

/// A contiguous, inclusive score range mapped to a grade label and ordinal level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeBand {
    pub min_score: i32,
    pub max_score: i32,
    pub grade_text: String,
    pub grade_level: i32,
}

impl GradeBand {
    pub fn new(min_score: i32, max_score: i32, grade_text: &str, grade_level: i32) -> Self {
        Self {
            min_score,
            max_score,
            grade_text: grade_text.to_string(),
            grade_level,
        }
    }

    pub fn contains(&self, score: i32) -> bool {
        self.min_score <= score && score <= self.max_score
    }
}

#[derive(Debug, Clone)]
pub struct EvaluationCycle {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectPerformance {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub department: Option<String>,
    pub job_name: Option<String>,
    pub score: i32,
    pub goal_count: usize,
    pub evaluated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeBucket {
    pub grade_level: i32,
    pub grade_text: String,
    pub count: usize,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    pub total_subjects: usize,
    pub pending_count: usize,
    pub completed_count: usize,
    pub average_score: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamStats {
    #[serde(flatten)]
    pub summary: TeamSummary,
    pub grade_distribution: BTreeMap<i32, GradeBucket>,
    pub top_performers: Vec<SubjectPerformance>,
    pub low_performers: Vec<SubjectPerformance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalContribution {
    pub title: String,
    pub weight: i32,
    pub raw_score: i32,
    pub normalized: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalBreakdown {
    pub total_weight: i64,
    pub weight_warning: bool,
    pub score: i32,
    pub status: EvaluationStatus,
    pub goals: Vec<GoalContribution>,
}
