pub mod auth;
pub mod catalog;
pub mod matchmaking;
pub mod review;
