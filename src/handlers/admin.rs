// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    config::{ADMIN_PAGE_SIZE, RECENT_RESULTS_LIMIT},
    error::AppError,
    models::{
        question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
        result::{RecentResultEntry, ResultStats},
    },
    utils::{html::clean_html, jwt::Claims},
};

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
}

/// Admin dashboard: catalog and population totals plus recent results.
pub async fn dashboard(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let total_questions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE is_active = TRUE")
            .fetch_one(&pool)
            .await?;

    let total_students: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE role = 'student' AND is_active = TRUE",
    )
    .fetch_one(&pool)
    .await?;

    let total_exams: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM results")
        .fetch_one(&pool)
        .await?;

    let recent_results = sqlx::query_as::<_, RecentResultEntry>(
        r#"
        SELECT r.id, u.username, r.percentage, r.submission_type, r.created_at
        FROM results r
        JOIN users u ON r.user_id = u.id
        ORDER BY r.created_at DESC
        LIMIT $1
        "#,
    )
    .bind(RECENT_RESULTS_LIMIT)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load recent results: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(serde_json::json!({
        "stats": {
            "total_questions": total_questions,
            "total_students": total_students,
            "total_exams": total_exams,
        },
        "recent_results": recent_results,
    })))
}

/// Lists active questions, newest first, paginated.
pub async fn list_questions(
    State(pool): State<PgPool>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let offset = (page - 1) * ADMIN_PAGE_SIZE;

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, options, correct_answer, difficulty, subject,
               category, is_active, created_by, created_at
        FROM questions
        WHERE is_active = TRUE
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(ADMIN_PAGE_SIZE)
    .bind(offset)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let total_questions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE is_active = TRUE")
            .fetch_one(&pool)
            .await?;

    let total_pages = (total_questions + ADMIN_PAGE_SIZE - 1) / ADMIN_PAGE_SIZE;

    Ok(Json(serde_json::json!({
        "questions": questions,
        "current_page": page,
        "total_pages": total_pages,
        "has_next": page < total_pages,
        "has_prev": page > 1,
    })))
}

/// Fetches a single question, 404 when missing or soft-deleted.
pub async fn get_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, options, correct_answer, difficulty, subject,
               category, is_active, created_by, created_at
        FROM questions
        WHERE id = $1 AND is_active = TRUE
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

/// Creates a new quiz question.
/// Question text passes through the HTML sanitizer before storage.
pub async fn create_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let question_text = clean_html(payload.question.trim());
    let options: Vec<String> = payload
        .options
        .iter()
        .map(|opt| opt.trim().to_string())
        .collect();
    let options_json = serde_json::to_value(options).unwrap_or_default();
    let difficulty = payload.difficulty.unwrap_or_else(|| "medium".to_string());

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO questions
            (question, options, correct_answer, difficulty, subject, category, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(&question_text)
    .bind(options_json)
    .bind(payload.correct_answer)
    .bind(&difficulty)
    .bind(payload.subject.trim())
    .bind(payload.category.as_deref().map(str::trim))
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Updates a question by ID. Fields are optional; absent fields are left
/// untouched. Attempts already holding the id in their snapshot are not
/// affected either way.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if payload.question.is_none()
        && payload.options.is_none()
        && payload.correct_answer.is_none()
        && payload.difficulty.is_none()
        && payload.subject.is_none()
        && payload.category.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    if let Some(question) = payload.question {
        separated.push("question = ");
        separated.push_bind_unseparated(clean_html(question.trim()));
    }

    if let Some(options) = payload.options {
        separated.push("options = ");
        separated.push_bind_unseparated(serde_json::to_value(options).unwrap_or_default());
    }

    if let Some(correct_answer) = payload.correct_answer {
        separated.push("correct_answer = ");
        separated.push_bind_unseparated(correct_answer);
    }

    if let Some(difficulty) = payload.difficulty {
        separated.push("difficulty = ");
        separated.push_bind_unseparated(difficulty);
    }

    if let Some(subject) = payload.subject {
        separated.push("subject = ");
        separated.push_bind_unseparated(subject);
    }

    if let Some(category) = payload.category {
        separated.push("category = ");
        separated.push_bind_unseparated(category);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Soft-deletes a question: it leaves the active catalog but stays
/// resolvable by id for attempts that snapshotted it.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("UPDATE questions SET is_active = FALSE WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Result row for the admin listing, joined with the taker.
#[derive(Debug, Serialize, FromRow)]
struct AdminResultRow {
    id: i64,
    username: String,
    percentage: f64,
    correct_answers: i32,
    total_questions: i32,
    submission_type: String,
    time_spent: i32,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Lists all results, newest first, paginated, with aggregate statistics.
pub async fn list_results(
    State(pool): State<PgPool>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let offset = (page - 1) * ADMIN_PAGE_SIZE;

    let results = sqlx::query_as::<_, AdminResultRow>(
        r#"
        SELECT r.id, u.username, r.percentage, r.correct_answers, r.total_questions,
               r.submission_type, r.time_spent, r.created_at
        FROM results r
        JOIN users u ON r.user_id = u.id
        ORDER BY r.created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(ADMIN_PAGE_SIZE)
    .bind(offset)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list results: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let total_results: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM results")
        .fetch_one(&pool)
        .await?;

    let (average, highest, lowest): (Option<f64>, Option<f64>, Option<f64>) = sqlx::query_as(
        "SELECT AVG(percentage), MAX(percentage), MIN(percentage) FROM results",
    )
    .fetch_one(&pool)
    .await?;

    let stats = ResultStats {
        average_score: average.unwrap_or(0.0),
        highest_score: highest.unwrap_or(0.0),
        lowest_score: lowest.unwrap_or(0.0),
    };

    let total_pages = (total_results + ADMIN_PAGE_SIZE - 1) / ADMIN_PAGE_SIZE;

    Ok(Json(serde_json::json!({
        "results": results,
        "current_page": page,
        "total_pages": total_pages,
        "has_next": page < total_pages,
        "has_prev": page > 1,
        "stats": stats,
    })))
}
