use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::QuestionRepository;
use crate::data::models::{
    Difficulty, NewReviewRecord, QuestionRecord, QuizQuestion, ReviewRecord, ReviewState,
    ReviewStats, StoreError,
};
use crate::db::DbPool;
use crate::schema::{quiz_questions, review_states};

/// Persistence needed by the review scheduler.
pub trait ReviewRepository: Send + Sync {
    fn question_exists(&self, question_id: i32) -> Result<bool, StoreError>;

    fn load_state(&self, user_id: i32, question_id: i32) -> Result<Option<ReviewState>, StoreError>;

    /// Reads the current state, applies `update` and writes the result back as
    /// one unit. `None` is passed for a question the user never answered.
    fn update_state<F>(
        &self,
        user_id: i32,
        question_id: i32,
        reviewed_at: DateTime<Utc>,
        update: F,
    ) -> Result<ReviewState, StoreError>
    where
        F: FnOnce(Option<ReviewState>) -> ReviewState;

    /// Questions due at `now`, oldest due first.
    fn due_questions(
        &self,
        user_id: i32,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<QuizQuestion>, StoreError>;

    /// Questions of `difficulty` the user has no review record for.
    fn unseen_questions(
        &self,
        user_id: i32,
        difficulty: Difficulty,
        limit: i64,
    ) -> Result<Vec<QuizQuestion>, StoreError>;

    fn stats(&self, user_id: i32, now: DateTime<Utc>) -> Result<ReviewStats, StoreError>;
}

#[derive(Clone)]
pub struct SqliteReviewRepository {
    pool: DbPool,
}

impl SqliteReviewRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn find_state(
    conn: &mut SqliteConnection,
    user_id: i32,
    question_id: i32,
) -> Result<Option<ReviewState>, StoreError> {
    review_states::table
        .find((user_id, question_id))
        .select(ReviewRecord::as_select())
        .first(conn)
        .optional()?
        .map(ReviewState::try_from)
        .transpose()
}

fn into_questions(rows: Vec<QuestionRecord>) -> Result<Vec<QuizQuestion>, StoreError> {
    rows.into_iter().map(QuizQuestion::try_from).collect()
}

impl ReviewRepository for SqliteReviewRepository {
    fn question_exists(&self, question_id: i32) -> Result<bool, StoreError> {
        let mut conn = self.pool.get()?;
        QuestionRepository::exists(&mut conn, question_id)
    }

    fn load_state(&self, user_id: i32, question_id: i32) -> Result<Option<ReviewState>, StoreError> {
        let mut conn = self.pool.get()?;
        find_state(&mut conn, user_id, question_id)
    }

    fn update_state<F>(
        &self,
        user_id: i32,
        question_id: i32,
        reviewed_at: DateTime<Utc>,
        update: F,
    ) -> Result<ReviewState, StoreError>
    where
        F: FnOnce(Option<ReviewState>) -> ReviewState,
    {
        let mut conn = self.pool.get()?;
        conn.immediate_transaction::<_, StoreError, _>(|conn| {
            let current = find_state(conn, user_id, question_id)?;
            let next = update(current);
            let record = NewReviewRecord::from_state(user_id, question_id, &next, reviewed_at)?;

            diesel::insert_into(review_states::table)
                .values(&record)
                .on_conflict((review_states::user_id, review_states::question_id))
                .do_update()
                .set((
                    review_states::easiness_factor.eq(record.easiness_factor),
                    review_states::repetition_count.eq(record.repetition_count),
                    review_states::interval_days.eq(record.interval_days),
                    review_states::next_review_date.eq(record.next_review_date),
                    review_states::quality_history.eq(&record.quality_history),
                    review_states::total_reviews.eq(record.total_reviews),
                    review_states::last_reviewed_at.eq(record.last_reviewed_at),
                ))
                .execute(conn)?;

            Ok(next)
        })
    }

    fn due_questions(
        &self,
        user_id: i32,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<QuizQuestion>, StoreError> {
        let mut conn = self.pool.get()?;
        let rows = review_states::table
            .inner_join(quiz_questions::table)
            .filter(review_states::user_id.eq(user_id))
            .filter(review_states::next_review_date.le(now.naive_utc()))
            .order((
                review_states::next_review_date.asc(),
                review_states::question_id.asc(),
            ))
            .limit(limit)
            .select(QuestionRecord::as_select())
            .load(&mut conn)?;
        into_questions(rows)
    }

    fn unseen_questions(
        &self,
        user_id: i32,
        difficulty: Difficulty,
        limit: i64,
    ) -> Result<Vec<QuizQuestion>, StoreError> {
        let mut conn = self.pool.get()?;
        let answered = review_states::table
            .filter(review_states::user_id.eq(user_id))
            .select(review_states::question_id);

        let rows = quiz_questions::table
            .filter(quiz_questions::difficulty.eq(difficulty.as_str()))
            .filter(quiz_questions::question_id.ne_all(answered))
            .order(quiz_questions::question_id.asc())
            .limit(limit)
            .select(QuestionRecord::as_select())
            .load(&mut conn)?;
        into_questions(rows)
    }

    fn stats(&self, user_id: i32, now: DateTime<Utc>) -> Result<ReviewStats, StoreError> {
        let mut conn = self.pool.get()?;
        let tracked = review_states::table
            .filter(review_states::user_id.eq(user_id))
            .count()
            .get_result::<i64>(&mut conn)?;
        let due_now = review_states::table
            .filter(review_states::user_id.eq(user_id))
            .filter(review_states::next_review_date.le(now.naive_utc()))
            .count()
            .get_result::<i64>(&mut conn)?;
        Ok(ReviewStats { tracked, due_now })
    }
}
