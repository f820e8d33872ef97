use axum::extract::{Json, State};
use tower_sessions::Session;

use crate::{
    app::AppState,
    data::models::{ApiError, ProfileResponse},
    data::repositories::UserRepository,
    utils::require_user,
};

pub async fn me(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user_id = require_user(&session).await?;

    let mut conn = state.pool.get()?;
    let user = UserRepository::find_by_id(&mut conn, user_id)?.ok_or(ApiError::NotFound("user"))?;

    Ok(Json(ProfileResponse {
        user_id: user.user_id,
        email: user.email,
        btz_balance: user.btz_balance,
    }))
}
