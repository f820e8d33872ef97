pub mod matchmaking;
pub mod question;
pub mod review;
pub mod user;

pub use matchmaking::{SqliteTicketRepository, TicketRepository};
pub use question::QuestionRepository;
pub use review::{ReviewRepository, SqliteReviewRepository};
pub use user::UserRepository;
