// src/scoring.rs

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::models::question::Question;
use crate::models::result::{QuestionOutcome, SubmissionType};
use crate::session::ExamSession;

/// Everything the submit flow needs to persist a result row.
#[derive(Debug, Clone)]
pub struct ScoredExam {
    pub outcomes: Vec<QuestionOutcome>,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub percentage: f64,
    pub time_spent: i64,
    pub submission_type: SubmissionType,
}

/// Scores a finished attempt against the question records fetched for its
/// snapshot.
///
/// An unanswered question is incorrect, never an error, and so is any
/// stored answer that does not equal the correct index (including values
/// the save path accepted permissively). Outcomes follow the snapshot
/// order; ids whose rows no longer exist are left out of both the count
/// and the outcomes. The submission is `auto` when the measured time
/// exceeds the time box, regardless of which action triggered it.
pub fn score_exam(
    session: &ExamSession,
    questions: &[Question],
    end_time: DateTime<Utc>,
) -> ScoredExam {
    let by_id: HashMap<i64, &Question> = questions.iter().map(|q| (q.id, q)).collect();

    let mut outcomes = Vec::with_capacity(questions.len());
    let mut correct_answers = 0;

    for question_id in &session.question_ids {
        let Some(question) = by_id.get(question_id) else {
            continue;
        };
        let selected_answer = session.answers.get(question_id).copied();
        let is_correct = selected_answer == Some(question.correct_answer);

        if is_correct {
            correct_answers += 1;
        }

        outcomes.push(QuestionOutcome {
            question_id: question.id,
            selected_answer,
            correct_answer: question.correct_answer,
            is_correct,
        });
    }

    let total_questions = outcomes.len() as i32;
    let percentage = if total_questions > 0 {
        round2(100.0 * f64::from(correct_answers) / f64::from(total_questions))
    } else {
        0.0
    };

    let time_spent = session.elapsed_seconds(end_time);
    let submission_type = if time_spent > session.duration_minutes * 60 {
        SubmissionType::Auto
    } else {
        SubmissionType::Manual
    };

    ScoredExam {
        outcomes,
        total_questions,
        correct_answers,
        percentage,
        time_spent,
        submission_type,
    }
}

/// Letter grade for a percentage. Presentation only, recomputed on read.
pub fn grade(percentage: f64) -> &'static str {
    if percentage >= 90.0 {
        "A+"
    } else if percentage >= 80.0 {
        "A"
    } else if percentage >= 70.0 {
        "B"
    } else if percentage >= 60.0 {
        "C"
    } else if percentage >= 50.0 {
        "D"
    } else {
        "F"
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
