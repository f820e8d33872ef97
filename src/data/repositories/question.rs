use diesel::prelude::*;

use crate::data::models::{CatalogEntry, NewQuestionRecord, QuestionRecord, QuizQuestion, StoreError};
use crate::schema::quiz_questions;

/// Read access to the question catalog plus the startup import.
pub struct QuestionRepository;

impl QuestionRepository {
    pub fn find(
        conn: &mut SqliteConnection,
        question_id: i32,
    ) -> Result<Option<QuizQuestion>, StoreError> {
        quiz_questions::table
            .find(question_id)
            .select(QuestionRecord::as_select())
            .first(conn)
            .optional()?
            .map(QuizQuestion::try_from)
            .transpose()
    }

    pub fn exists(conn: &mut SqliteConnection, question_id: i32) -> Result<bool, StoreError> {
        use diesel::dsl::exists;

        Ok(diesel::select(exists(quiz_questions::table.find(question_id))).get_result(conn)?)
    }

    /// Inserts or refreshes every entry, keyed by slug. Returns how many rows were written.
    pub fn upsert_catalog(
        conn: &mut SqliteConnection,
        entries: &[CatalogEntry],
    ) -> Result<usize, StoreError> {
        conn.transaction::<_, StoreError, _>(|conn| {
            let mut written = 0;
            for entry in entries {
                let options = serde_json::to_string(&entry.options)
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?;
                let record = NewQuestionRecord {
                    slug: &entry.slug,
                    prompt: &entry.prompt,
                    options: options.clone(),
                    correct_answer: &entry.correct_answer,
                    explanation: entry.explanation.as_deref(),
                    category: &entry.category,
                    difficulty: entry.difficulty.as_str(),
                };
                written += diesel::insert_into(quiz_questions::table)
                    .values(&record)
                    .on_conflict(quiz_questions::slug)
                    .do_update()
                    .set((
                        quiz_questions::prompt.eq(&entry.prompt),
                        quiz_questions::options.eq(options),
                        quiz_questions::correct_answer.eq(&entry.correct_answer),
                        quiz_questions::explanation.eq(entry.explanation.as_deref()),
                        quiz_questions::category.eq(&entry.category),
                        quiz_questions::difficulty.eq(entry.difficulty.as_str()),
                    ))
                    .execute(conn)?;
            }
            Ok(written)
        })
    }
}
