use axum::extract::{Json, State};
use tower_sessions::Session;

use crate::{
    app::AppState,
    data::models::{ApiResponse, AuthError, LoginForm, ProfileResponse},
    data::repositories::UserRepository,
    utils::set_user_session,
};

#[axum::debug_handler]
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<ProfileResponse>, AuthError> {
    let mut conn = state.pool.get()?;

    let user = UserRepository::find_by_email(&mut conn, &form.email)?
        .ok_or(AuthError::InvalidCredentials)?;

    if !UserRepository::verify_password(&user.password, &form.password)? {
        return Err(AuthError::InvalidCredentials);
    }

    set_user_session(&session, user.user_id, &user.email).await?;

    Ok(Json(ProfileResponse {
        user_id: user.user_id,
        email: user.email,
        btz_balance: user.btz_balance,
    }))
}

pub async fn handle_logout(session: Session) -> Result<Json<ApiResponse>, AuthError> {
    session.delete().await.map_err(|e| {
        log::error!("Failed to delete session: {}", e);
        AuthError::SessionError("Failed to logout".into())
    })?;

    Ok(Json(ApiResponse {
        success: true,
        message: "Logged out".to_string(),
    }))
}
