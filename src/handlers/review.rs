use axum::extract::{Json, State};
use tower_sessions::Session;

use crate::{
    app::AppState,
    data::models::{
        AnswerRequest, AnswerResponse, ApiError, ReviewSessionRequest, ReviewSessionResponse,
        ReviewStats,
    },
    utils::require_user,
};

pub async fn review_session(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<ReviewSessionRequest>,
) -> Result<Json<ReviewSessionResponse>, ApiError> {
    let user_id = require_user(&session).await?;

    let questions = state
        .review
        .select_due_questions(user_id, payload.difficulty, payload.limit)?;
    let all_caught_up = questions.is_empty();

    Ok(Json(ReviewSessionResponse {
        questions,
        all_caught_up,
    }))
}

pub async fn submit_answer(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let user_id = require_user(&session).await?;

    let answer = state.review.submit_answer(
        user_id,
        payload.question_id,
        payload.is_correct,
        payload.response_time_secs,
    )?;

    Ok(Json(answer))
}

pub async fn review_stats(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ReviewStats>, ApiError> {
    let user_id = require_user(&session).await?;
    Ok(Json(state.review.stats(user_id)?))
}
