pub mod auth;
pub mod duel;
pub mod profile;
pub mod review;
