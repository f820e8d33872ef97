use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use serde::Serialize;

use super::StoreError;
use crate::schema::review_states;

pub const DEFAULT_EASINESS: f64 = 2.5;
pub const MIN_EASINESS: f64 = 1.3;
/// Longest gap between two reviews, roughly a century.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// SM-2 recall quality, always within 0..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Quality(u8);

impl Quality {
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Quality(value))
    }

    /// Values above 5 are clamped to 5.
    pub fn saturating(value: u8) -> Self {
        Quality(value.min(Self::MAX))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Quality 3 and above counts as a successful recall.
    pub fn is_recall(self) -> bool {
        self.0 >= 3
    }
}

impl TryFrom<i32> for Quality {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Quality::new)
            .ok_or_else(|| format!("quality must be between 0 and 5, got {value}"))
    }
}

/// Memory parameters for one (user, question) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewState {
    pub easiness_factor: f64,
    pub repetition_count: u32,
    pub interval_days: u32,
    pub next_review_date: DateTime<Utc>,
    pub quality_history: Vec<u8>,
    pub total_reviews: u32,
}

impl ReviewState {
    /// State of a question the learner has never answered.
    pub fn new_at(now: DateTime<Utc>) -> Self {
        ReviewState {
            easiness_factor: DEFAULT_EASINESS,
            repetition_count: 0,
            interval_days: 1,
            next_review_date: now,
            quality_history: Vec::new(),
            total_reviews: 0,
        }
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = review_states)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReviewRecord {
    pub user_id: i32,
    pub question_id: i32,
    pub easiness_factor: f64,
    pub repetition_count: i32,
    pub interval_days: i32,
    pub next_review_date: NaiveDateTime,
    pub quality_history: String,
    pub total_reviews: i32,
    pub last_reviewed_at: NaiveDateTime,
}

impl TryFrom<ReviewRecord> for ReviewState {
    type Error = StoreError;

    fn try_from(row: ReviewRecord) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| {
            StoreError::Corrupt(format!(
                "review state ({}, {}) {}",
                row.user_id, row.question_id, what
            ))
        };
        let quality_history: Vec<u8> =
            serde_json::from_str(&row.quality_history).map_err(|_| corrupt("quality_history"))?;
        Ok(ReviewState {
            easiness_factor: row.easiness_factor,
            repetition_count: u32::try_from(row.repetition_count)
                .map_err(|_| corrupt("repetition_count"))?,
            interval_days: u32::try_from(row.interval_days).map_err(|_| corrupt("interval_days"))?,
            next_review_date: row.next_review_date.and_utc(),
            quality_history,
            total_reviews: u32::try_from(row.total_reviews).map_err(|_| corrupt("total_reviews"))?,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = review_states)]
pub struct NewReviewRecord {
    pub user_id: i32,
    pub question_id: i32,
    pub easiness_factor: f64,
    pub repetition_count: i32,
    pub interval_days: i32,
    pub next_review_date: NaiveDateTime,
    pub quality_history: String,
    pub total_reviews: i32,
    pub last_reviewed_at: NaiveDateTime,
}

impl NewReviewRecord {
    pub fn from_state(
        user_id: i32,
        question_id: i32,
        state: &ReviewState,
        reviewed_at: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let to_i32 = |value: u32, what: &str| {
            i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{what} out of range")))
        };
        Ok(NewReviewRecord {
            user_id,
            question_id,
            easiness_factor: state.easiness_factor,
            repetition_count: to_i32(state.repetition_count, "repetition_count")?,
            interval_days: to_i32(state.interval_days, "interval_days")?,
            next_review_date: state.next_review_date.naive_utc(),
            quality_history: serde_json::to_string(&state.quality_history)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            total_reviews: to_i32(state.total_reviews, "total_reviews")?,
            last_reviewed_at: reviewed_at.naive_utc(),
        })
    }
}
