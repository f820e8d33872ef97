use std::fmt;
use std::str::FromStr;

use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::schema::quiz_questions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty {other:?}")),
        }
    }
}

/// Row as stored; `options` is a JSON array of strings.
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = quiz_questions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct QuestionRecord {
    pub question_id: i32,
    pub slug: String,
    pub prompt: String,
    pub options: String,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub category: String,
    pub difficulty: String,
}

#[derive(Insertable)]
#[diesel(table_name = quiz_questions)]
pub struct NewQuestionRecord<'a> {
    pub slug: &'a str,
    pub prompt: &'a str,
    pub options: String,
    pub correct_answer: &'a str,
    pub explanation: Option<&'a str>,
    pub category: &'a str,
    pub difficulty: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizQuestion {
    pub id: i32,
    pub slug: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub category: String,
    pub difficulty: Difficulty,
}

impl TryFrom<QuestionRecord> for QuizQuestion {
    type Error = StoreError;

    fn try_from(row: QuestionRecord) -> Result<Self, Self::Error> {
        let options = serde_json::from_str(&row.options).map_err(|e| {
            StoreError::Corrupt(format!("question {} options: {}", row.question_id, e))
        })?;
        let difficulty = row.difficulty.parse().map_err(StoreError::Corrupt)?;
        Ok(QuizQuestion {
            id: row.question_id,
            slug: row.slug,
            prompt: row.prompt,
            options,
            correct_answer: row.correct_answer,
            explanation: row.explanation,
            category: row.category,
            difficulty,
        })
    }
}

/// One entry of the catalog file loaded at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub slug: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
    pub category: String,
    pub difficulty: Difficulty,
}
