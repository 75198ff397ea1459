// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The text of the question.
    pub question: String,

    /// Exactly four options, stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Index of the correct option (0-3).
    pub correct_answer: i32,

    /// 'easy', 'medium' or 'hard'.
    pub difficulty: String,

    pub subject: String,

    pub category: Option<String>,

    /// Soft-delete flag. Inactive questions never enter new exams, but an
    /// attempt that snapshotted the id keeps using it.
    pub is_active: bool,

    pub created_by: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for presenting a question to an exam taker.
/// Excludes the correct answer and authoring metadata.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub question: String,
    pub options: Json<Vec<String>>,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            question: q.question,
            options: q.options,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 500, message = "Question cannot be more than 500 characters"))]
    pub question: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(range(min = 0, max = 3, message = "Correct answer must be between 0 and 3"))]
    pub correct_answer: i32,
    #[validate(custom(function = validate_difficulty))]
    pub difficulty: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(max = 50, message = "Category cannot be more than 50 characters"))]
    pub category: Option<String>,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 500, message = "Question cannot be more than 500 characters"))]
    pub question: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<String>>,
    #[validate(range(min = 0, max = 3, message = "Correct answer must be between 0 and 3"))]
    pub correct_answer: Option<i32>,
    #[validate(custom(function = validate_difficulty))]
    pub difficulty: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub subject: Option<String>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != 4 {
        return Err(validator::ValidationError::new(
            "question_must_have_exactly_4_options",
        ));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

fn validate_difficulty(difficulty: &str) -> Result<(), validator::ValidationError> {
    match difficulty {
        "easy" | "medium" | "hard" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_difficulty")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_options() -> Vec<String> {
        vec!["A".into(), "B".into(), "C".into(), "D".into()]
    }

    #[test]
    fn create_request_accepts_four_options() {
        let req = CreateQuestionRequest {
            question: "What is 2 + 2?".to_string(),
            options: four_options(),
            correct_answer: 1,
            difficulty: Some("easy".to_string()),
            subject: "math".to_string(),
            category: None,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn create_request_rejects_wrong_option_count() {
        let req = CreateQuestionRequest {
            question: "What is 2 + 2?".to_string(),
            options: vec!["A".into(), "B".into()],
            correct_answer: 0,
            difficulty: None,
            subject: "math".to_string(),
            category: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_request_rejects_out_of_range_answer() {
        let req = CreateQuestionRequest {
            question: "What is 2 + 2?".to_string(),
            options: four_options(),
            correct_answer: 4,
            difficulty: None,
            subject: "math".to_string(),
            category: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_request_rejects_unknown_difficulty() {
        let req = CreateQuestionRequest {
            question: "What is 2 + 2?".to_string(),
            options: four_options(),
            correct_answer: 0,
            difficulty: Some("brutal".to_string()),
            subject: "math".to_string(),
            category: None,
        };
        assert!(req.validate().is_err());
    }
}
