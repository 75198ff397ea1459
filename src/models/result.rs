// src/models/result.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::scoring;

/// Whether a result was produced by explicit user action or by the time
/// box expiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionType {
    Manual,
    Auto,
}

impl SubmissionType {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionType::Manual => "manual",
            SubmissionType::Auto => "auto",
        }
    }
}

/// Per-question outcome snapshot stored inside a result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: i64,
    /// `None` when the question was left unanswered.
    pub selected_answer: Option<i32>,
    pub correct_answer: i32,
    pub is_correct: bool,
}

/// Represents the 'results' table in the database.
/// A row is written once at submission and never mutated afterwards.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: i64,
    pub user_id: i64,
    pub exam_id: String,

    /// Per-question outcomes in snapshot order, stored as JSON.
    pub questions: Json<Vec<QuestionOutcome>>,

    pub total_questions: i32,
    pub correct_answers: i32,
    pub score: i32,

    /// Stored with two decimals; dashboards display one.
    pub percentage: f64,

    /// Seconds between exam start and submission.
    pub time_spent: i32,

    /// The attempt's time box, in minutes.
    pub exam_duration: i32,

    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: chrono::DateTime<chrono::Utc>,
    pub is_completed: bool,

    /// 'manual' or 'auto'.
    pub submission_type: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ExamResult {
    /// Letter grade derived from the stored percentage.
    pub fn grade(&self) -> &'static str {
        scoring::grade(self.percentage)
    }
}

/// Result row plus the derived grade, for the result view.
#[derive(Debug, Serialize)]
pub struct ResultResponse {
    #[serde(flatten)]
    pub result: ExamResult,
    pub grade: &'static str,
}

impl From<ExamResult> for ResultResponse {
    fn from(result: ExamResult) -> Self {
        let grade = result.grade();
        Self { result, grade }
    }
}

/// Compact row for a student's own exam history.
#[derive(Debug, Serialize, FromRow)]
pub struct ResultSummary {
    pub id: i64,
    pub percentage: f64,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub submission_type: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Recent-result row for the admin dashboard, joined with the taker.
#[derive(Debug, Serialize, FromRow)]
pub struct RecentResultEntry {
    pub id: i64,
    pub username: String,
    pub percentage: f64,
    pub submission_type: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Aggregate percentage statistics over all results.
#[derive(Debug, Serialize, Default)]
pub struct ResultStats {
    pub average_score: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_follows_stored_percentage() {
        let result = ExamResult {
            id: 1,
            user_id: 1,
            exam_id: "general-exam".to_string(),
            questions: Json(vec![]),
            total_questions: 10,
            correct_answers: 9,
            score: 9,
            percentage: 90.0,
            time_spent: 600,
            exam_duration: 60,
            start_time: chrono::Utc::now(),
            end_time: chrono::Utc::now(),
            is_completed: true,
            submission_type: "manual".to_string(),
            created_at: None,
        };
        assert_eq!(result.grade(), "A+");
    }

    #[test]
    fn submission_type_round_trips_through_str() {
        assert_eq!(SubmissionType::Manual.as_str(), "manual");
        assert_eq!(SubmissionType::Auto.as_str(), "auto");
    }
}
