// src/handlers/exam.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::{PgPool, Postgres};

use crate::{
    config::{Config, RECENT_RESULTS_LIMIT},
    error::AppError,
    models::{
        question::{PublicQuestion, Question},
        result::{ExamResult, ResultResponse, ResultSummary},
    },
    scoring::score_exam,
    session::{ExamSession, NavAction, NavTarget, SessionStore},
    utils::jwt::Claims,
};

/// Student dashboard: recent exam history, catalog size and best score.
pub async fn dashboard(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let exam_history = sqlx::query_as::<_, ResultSummary>(
        r#"
        SELECT id, percentage, correct_answers, total_questions, submission_type, created_at
        FROM results
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(RECENT_RESULTS_LIMIT)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load exam history: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let total_questions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE is_active = TRUE")
            .fetch_one(&pool)
            .await?;

    let best_score = exam_history
        .iter()
        .map(|r| r.percentage)
        .fold(0.0_f64, f64::max);

    Ok(Json(json!({
        "exam_history": exam_history,
        "total_questions": total_questions,
        // Dashboards show one decimal even though two are stored.
        "best_score": (best_score * 10.0).round() / 10.0,
        "has_exam_history": !exam_history.is_empty(),
    })))
}

/// Starts an exam attempt, or resumes the one already in progress.
///
/// Starting is idempotent: an existing session is never replaced by a new
/// snapshot, the client is just sent back to its current question. An
/// expired resumed session gets funneled to submit by the question view.
pub async fn start_exam(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
) -> Result<Redirect, AppError> {
    let user_id = claims.user_id();

    if let Some(session) = sessions.get(user_id).await {
        return Ok(Redirect::to(&format!(
            "/exam/question/{}",
            session.current_index
        )));
    }

    // Snapshot the active catalog in stable order. Later edits or
    // soft-deletes will not touch this attempt.
    let question_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM questions WHERE is_active = TRUE ORDER BY created_at ASC, id ASC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to snapshot questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if question_ids.is_empty() {
        return Err(AppError::NoQuestionsAvailable);
    }

    let now = Utc::now();
    let session = ExamSession::new(user_id, question_ids, now, config.exam_duration_minutes);
    sessions.insert(session, now).await;

    Ok(Redirect::to("/exam/question/0"))
}

/// Serves one question of the running attempt.
///
/// A missing or foreign session, an out-of-range index or a vanished
/// question row all resolve to the dashboard. Discovering that the time
/// box has passed resolves to submit instead of rendering.
pub async fn view_question(
    State(pool): State<PgPool>,
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Path(index): Path<i64>,
) -> Result<Response, AppError> {
    let session = sessions
        .get(claims.user_id())
        .await
        .ok_or(AppError::InvalidSession)?;

    if index < 0 || index as usize >= session.question_ids.len() {
        return Err(AppError::InvalidSession);
    }
    let index = index as usize;

    let now = Utc::now();
    if session.is_expired(now) {
        return Ok(Redirect::to("/exam/submit").into_response());
    }

    let question_id = session.question_ids[index];
    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, options, correct_answer, difficulty, subject,
               category, is_active, created_by, created_at
        FROM questions
        WHERE id = $1
        "#,
    )
    .bind(question_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::InvalidSession)?;

    Ok(Json(json!({
        "question": PublicQuestion::from(question),
        "current_index": index,
        "total_questions": session.question_ids.len(),
        "time_remaining": session.remaining_minutes(now),
        "selected_answer": session.answers.get(&question_id),
        "is_last_question": index == session.question_ids.len() - 1,
    }))
    .into_response())
}

/// Body of the save-answer call: the question being answered, the chosen
/// option (absent when the student just navigates) and where to go next.
#[derive(Debug, Deserialize)]
pub struct SaveAnswerRequest {
    pub question_id: i64,
    pub answer: Option<i32>,
    pub action: NavAction,
}

/// Persists an answer and moves the current-question pointer.
///
/// Answers are stored as given; range checking is deliberately left to the
/// scorer, whose equality test scores a bad value as incorrect. An expired
/// session stops accepting answers and is steered to submit.
pub async fn save_answer(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SaveAnswerRequest>,
) -> impl IntoResponse {
    let now = Utc::now();

    let target = sessions
        .update(claims.user_id(), |session| {
            if session.is_expired(now) {
                return NavTarget::Submit;
            }
            if let Some(answer) = payload.answer {
                session.record_answer(payload.question_id, answer);
            }
            session.navigate(payload.question_id, payload.action)
        })
        .await;

    match target {
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "Invalid exam session",
                "redirect": "/exam/dashboard",
            })),
        ),
        Some(NavTarget::Submit) => (
            StatusCode::OK,
            Json(json!({ "success": true, "redirect": "/exam/submit" })),
        ),
        Some(NavTarget::Question(index)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "redirect": format!("/exam/question/{}", index),
            })),
        ),
    }
}

/// Scores the running attempt and persists an immutable result row.
///
/// The session is cleared only after the insert succeeds; a persistence
/// failure surfaces as a 500 with the session left intact, so the student
/// can retry and no partial result is ever visible.
pub async fn submit_exam(
    State(pool): State<PgPool>,
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
) -> Result<Redirect, AppError> {
    let user_id = claims.user_id();
    let session = sessions
        .get(user_id)
        .await
        .ok_or(AppError::InvalidSession)?;

    let end_time = Utc::now();

    // Fetch by snapshot id, never by active status: questions deactivated
    // mid-attempt still count.
    let questions = fetch_questions_by_ids(&pool, &session.question_ids).await?;
    let scored = score_exam(&session, &questions, end_time);

    let result_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO results
            (user_id, exam_id, questions, total_questions, correct_answers, score,
             percentage, time_spent, exam_duration, start_time, end_time, submission_type)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind("general-exam")
    .bind(sqlx::types::Json(&scored.outcomes))
    .bind(scored.total_questions)
    .bind(scored.correct_answers)
    .bind(scored.correct_answers)
    .bind(scored.percentage)
    .bind(scored.time_spent as i32)
    .bind(session.duration_minutes as i32)
    .bind(session.started_at)
    .bind(end_time)
    .bind(scored.submission_type.as_str())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to persist exam result: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    sessions.remove(user_id).await;

    Ok(Redirect::to(&format!("/exam/result/{}", result_id)))
}

/// Shows one finished result, owner only.
/// A foreign result is indistinguishable from a missing one.
pub async fn view_result(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(result_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query_as::<_, ExamResult>(
        r#"
        SELECT id, user_id, exam_id, questions, total_questions, correct_answers,
               score, percentage, time_spent, exam_duration, start_time, end_time,
               is_completed, submission_type, created_at
        FROM results
        WHERE id = $1
        "#,
    )
    .bind(result_id)
    .fetch_optional(&pool)
    .await?;

    match result {
        Some(result) if result.user_id == claims.user_id() => {
            Ok(Json(ResultResponse::from(result)))
        }
        _ => Err(AppError::NotFound(
            "Exam result not found or access denied.".to_string(),
        )),
    }
}

/// Timer poll for the exam page. Never mutates the session and never
/// submits by itself; submission always comes from an explicit request.
pub async fn exam_status(
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let now = Utc::now();

    match sessions.get(claims.user_id()).await {
        Some(session) => Json(json!({
            "success": true,
            "timeRemaining": session.remaining_minutes(now),
            "isExpired": session.is_expired(now),
        })),
        None => Json(json!({
            "success": false,
            "message": "No active exam",
        })),
    }
}

/// Fetches question rows for a snapshot with a dynamic IN clause.
/// Rows hard-deleted since the snapshot are simply absent.
async fn fetch_questions_by_ids(
    pool: &PgPool,
    ids: &[i64],
) -> Result<Vec<Question>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query_builder = sqlx::QueryBuilder::<Postgres>::new(
        "SELECT id, question, options, correct_answer, difficulty, subject, \
         category, is_active, created_by, created_at FROM questions WHERE id IN (",
    );

    let mut separated = query_builder.separated(",");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let questions = query_builder
        .build_query_as::<Question>()
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(questions)
}
