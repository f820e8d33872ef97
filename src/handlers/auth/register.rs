use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use tower_sessions::Session;
use validator::Validate;

use crate::{
    app::AppState,
    data::models::{AuthError, ProfileResponse, RegisterForm},
    data::repositories::UserRepository,
    utils::set_user_session,
};

#[axum::debug_handler]
pub async fn handle_register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<RegisterForm>,
) -> Result<(StatusCode, Json<ProfileResponse>), AuthError> {
    form.validate()?;

    let mut conn = state.pool.get()?;

    if UserRepository::email_exists(&mut conn, &form.email)? {
        return Err(AuthError::EmailTaken);
    }

    let hashed_password = UserRepository::hash_password(&form.password, state.bcrypt_cost)?;
    let user = UserRepository::create_user(
        &mut conn,
        &form.email,
        &hashed_password,
        state.starting_balance,
        state.clock.now().naive_utc(),
    )?;

    set_user_session(&session, user.user_id, &user.email).await?;
    log::info!("registered user {}", user.user_id);

    Ok((
        StatusCode::CREATED,
        Json(ProfileResponse {
            user_id: user.user_id,
            email: user.email,
            btz_balance: user.btz_balance,
        }),
    ))
}
