mod selection;
mod service;
pub mod sm2;

pub use selection::{MAX_SESSION_LIMIT, assemble_batch};
pub use service::ReviewService;
pub use sm2::{quality_from_answer, update_review_state};
