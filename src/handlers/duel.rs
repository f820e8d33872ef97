use axum::extract::{Json, State};
use tower_sessions::Session;

use crate::{
    app::AppState,
    data::models::{ApiError, ApiResponse, MatchResponse, StartMatchRequest},
    utils::require_user,
};

/// Starts a search, or polls it when the body carries the ticket from an earlier call.
pub async fn start_match(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<StartMatchRequest>,
) -> Result<Json<MatchResponse>, ApiError> {
    let user_id = require_user(&session).await?;

    let response = match payload.ticket_id {
        Some(ticket_id) => {
            let outcome = state.matchmaking.poll_ticket(user_id, ticket_id)?;
            MatchResponse::from_outcome(&outcome, user_id, ticket_id)
        }
        None => {
            let attempt = state.matchmaking.request_match(user_id, payload.bet_amount)?;
            MatchResponse::from_attempt(&attempt, user_id)
        }
    };

    Ok(Json(response))
}

pub async fn cancel_match(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ApiResponse>, ApiError> {
    let user_id = require_user(&session).await?;

    let cancelled = state.matchmaking.cancel_match(user_id)?;
    let message = if cancelled > 0 {
        "Search cancelled"
    } else {
        "No active search"
    };

    Ok(Json(ApiResponse {
        success: true,
        message: message.to_string(),
    }))
}
