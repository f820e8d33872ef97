pub mod api_models;
pub mod auth_models;
pub mod error_models;
pub mod match_models;
pub mod question_models;
pub mod review_models;
pub mod user_models;

pub use api_models::{
    AnswerRequest, AnswerResponse, ApiResponse, MatchResponse, ProfileResponse, ReviewSessionRequest,
    ReviewSessionResponse, ReviewStats, SessionQuestion, StartMatchRequest,
};
pub use auth_models::{AuthError, LoginForm, RegisterForm};
pub use error_models::{ApiError, StoreError};
pub use match_models::{
    DuelPair, MatchAttempt, MatchmakingTicket, NewPair, NewTicket, PairRecord, TicketOutcome,
    TicketRecord, TicketStatus,
};
pub use question_models::{CatalogEntry, Difficulty, NewQuestionRecord, QuestionRecord, QuizQuestion};
pub use review_models::{
    NewReviewRecord, Quality, ReviewRecord, ReviewState, DEFAULT_EASINESS, MAX_INTERVAL_DAYS, MIN_EASINESS,
};
pub use user_models::{NewUser, User};
