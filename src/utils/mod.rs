pub mod session;

pub use session::{require_user, set_user_session};
