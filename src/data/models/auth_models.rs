use bcrypt::BcryptError;
use serde::Deserialize;
use thiserror::Error;
use validator::Validate;

use super::StoreError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email already registered")]
    EmailTaken,
    #[error("{0}")]
    ValidationError(String),
    #[error("Database error")]
    DatabaseError(#[from] StoreError),
    #[error("Hashing error")]
    HashingError(BcryptError),
    #[error("Session error: {0}")]
    SessionError(String),
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}
