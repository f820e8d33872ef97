use bcrypt::BcryptError;
use diesel::result::Error as DieselError;
use tower_sessions::session::Error as SessionError;
use validator::ValidationErrors;

use crate::data::models::{ApiError, AuthError, StoreError};

impl From<DieselError> for AuthError {
    fn from(err: DieselError) -> Self {
        AuthError::DatabaseError(StoreError::Query(err))
    }
}

impl From<r2d2::Error> for AuthError {
    fn from(err: r2d2::Error) -> Self {
        AuthError::DatabaseError(StoreError::Pool(err))
    }
}

impl From<BcryptError> for AuthError {
    fn from(err: BcryptError) -> Self {
        AuthError::HashingError(err)
    }
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        AuthError::SessionError(err.to_string())
    }
}

impl From<ValidationErrors> for AuthError {
    fn from(err: ValidationErrors) -> Self {
        AuthError::ValidationError(err.to_string())
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        ApiError::Session(err.to_string())
    }
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> Self {
        ApiError::Store(StoreError::Query(err))
    }
}

impl From<r2d2::Error> for ApiError {
    fn from(err: r2d2::Error) -> Self {
        ApiError::Store(StoreError::Pool(err))
    }
}
