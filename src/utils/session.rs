use tower_sessions::Session;

use crate::data::models::{ApiError, AuthError};

pub async fn set_user_session(
    session: &Session,
    user_id: i32,
    email: &str,
) -> Result<(), AuthError> {
    session.insert("logged_in", true).await?;
    session.insert("user_id", user_id).await?;
    session.insert("user_email", email).await?;
    Ok(())
}

async fn is_logged_in(session: &Session) -> bool {
    session.get::<bool>("logged_in").await.unwrap_or(None).unwrap_or(false)
}

async fn get_current_user_id(session: &Session) -> Option<i32> {
    if !is_logged_in(session).await {
        return None;
    }

    match session.get::<i32>("user_id").await {
        Ok(Some(user_id)) => Some(user_id),
        Ok(None) => {
            log::warn!("Session has logged_in=true but no user_id");
            None
        }
        Err(e) => {
            log::error!("Failed to get user_id from session: {}", e);
            None
        }
    }
}

/// The signed-in user, or `ApiError::Unauthorized`.
pub async fn require_user(session: &Session) -> Result<i32, ApiError> {
    get_current_user_id(session)
        .await
        .ok_or(ApiError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    fn fresh_session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn anonymous_session_is_unauthorized() {
        let session = fresh_session();
        assert!(!is_logged_in(&session).await);
        assert!(matches!(
            require_user(&session).await,
            Err(ApiError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn signed_in_session_yields_the_user() {
        let session = fresh_session();
        set_user_session(&session, 42, "learner@example.com")
            .await
            .unwrap();
        assert!(is_logged_in(&session).await);
        assert_eq!(require_user(&session).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn logged_in_flag_without_user_id_is_rejected() {
        let session = fresh_session();
        session.insert("logged_in", true).await.unwrap();
        assert!(matches!(
            require_user(&session).await,
            Err(ApiError::Unauthorized)
        ));
    }
}
