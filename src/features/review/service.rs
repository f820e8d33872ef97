use std::sync::Arc;

use super::selection::{MAX_SESSION_LIMIT, assemble_batch};
use super::sm2::{quality_from_answer, update_review_state};
use crate::clock::Clock;
use crate::config::QualityThresholds;
use crate::data::models::{
    AnswerResponse, ApiError, Difficulty, Quality, ReviewState, ReviewStats, SessionQuestion,
};
use crate::data::repositories::ReviewRepository;

/// Decides what a learner practises next and records how each answer went.
pub struct ReviewService<R> {
    repo: R,
    clock: Arc<dyn Clock>,
    thresholds: QualityThresholds,
}

impl<R: ReviewRepository> ReviewService<R> {
    pub fn new(repo: R, clock: Arc<dyn Clock>, thresholds: QualityThresholds) -> Self {
        Self {
            repo,
            clock,
            thresholds,
        }
    }

    /// Due reviews first (oldest due first, any difficulty), then questions of
    /// `difficulty` never seen before. An empty batch means "all caught up".
    pub fn select_due_questions(
        &self,
        user_id: i32,
        difficulty: Difficulty,
        limit: u32,
    ) -> Result<Vec<SessionQuestion>, ApiError> {
        if limit == 0 || limit > MAX_SESSION_LIMIT {
            return Err(ApiError::Validation(format!(
                "limit must be between 1 and {MAX_SESSION_LIMIT}"
            )));
        }

        let now = self.clock.now();
        let wanted = i64::from(limit);
        let due = self.repo.due_questions(user_id, now, wanted)?;
        let missing = wanted - due.len() as i64;
        let fresh = if missing > 0 {
            self.repo.unseen_questions(user_id, difficulty, missing)?
        } else {
            Vec::new()
        };

        Ok(assemble_batch(due, fresh, limit as usize))
    }

    /// Scores an answer from correctness and latency, then reschedules the question.
    pub fn submit_answer(
        &self,
        user_id: i32,
        question_id: i32,
        is_correct: bool,
        response_time_secs: f64,
    ) -> Result<AnswerResponse, ApiError> {
        if !response_time_secs.is_finite() || response_time_secs < 0.0 {
            return Err(ApiError::Validation(
                "response_time_secs must be a non-negative number".into(),
            ));
        }

        let quality = quality_from_answer(is_correct, response_time_secs, &self.thresholds);
        let state = self.record_quality(user_id, question_id, quality)?;
        Ok(AnswerResponse {
            question_id,
            quality: quality.value(),
            state,
        })
    }

    pub fn record_quality(
        &self,
        user_id: i32,
        question_id: i32,
        quality: Quality,
    ) -> Result<ReviewState, ApiError> {
        if !self.repo.question_exists(question_id)? {
            return Err(ApiError::NotFound("question"));
        }

        let now = self.clock.now();
        let state = self.repo.update_state(user_id, question_id, now, |current| {
            let current = current.unwrap_or_else(|| ReviewState::new_at(now));
            update_review_state(quality, &current, now)
        })?;

        log::debug!(
            "user {} question {} quality {} -> next review in {} day(s)",
            user_id,
            question_id,
            quality.value(),
            state.interval_days
        );
        Ok(state)
    }

    pub fn state(&self, user_id: i32, question_id: i32) -> Result<Option<ReviewState>, ApiError> {
        Ok(self.repo.load_state(user_id, question_id)?)
    }

    pub fn stats(&self, user_id: i32) -> Result<ReviewStats, ApiError> {
        Ok(self.repo.stats(user_id, self.clock.now())?)
    }
}
