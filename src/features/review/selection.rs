use std::collections::HashSet;

use crate::data::models::{QuizQuestion, SessionQuestion};

pub const MAX_SESSION_LIMIT: u32 = 50;

/// Builds one practice batch: due reviews first in the order given, then
/// fresh questions, skipping any id already taken, capped at `limit`.
pub fn assemble_batch(
    due: Vec<QuizQuestion>,
    fresh: Vec<QuizQuestion>,
    limit: usize,
) -> Vec<SessionQuestion> {
    let mut seen = HashSet::new();
    let reviews = due.into_iter().map(|question| (question, true));
    let new_items = fresh.into_iter().map(|question| (question, false));

    reviews
        .chain(new_items)
        .filter(|(question, _)| seen.insert(question.id))
        .take(limit)
        .map(|(question, is_review)| SessionQuestion {
            question,
            is_review,
        })
        .collect()
}
