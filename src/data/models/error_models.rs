use diesel::result::Error as DieselError;
use thiserror::Error;

/// Failures coming out of the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("query failed: {0}")]
    Query(#[from] DieselError),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Errors surfaced by the `/api` handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not logged in")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error("Insufficient funds: balance {balance} BTZ, bet {bet} BTZ")]
    InsufficientFunds { balance: i64, bet: i64 },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Session error: {0}")]
    Session(String),
}
