use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Difficulty, DuelPair, MatchAttempt, QuizQuestion, ReviewState, TicketOutcome, TicketStatus,
};

/// Standard API response format
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

fn default_session_limit() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
pub struct ReviewSessionRequest {
    pub difficulty: Difficulty,
    #[serde(default = "default_session_limit")]
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct SessionQuestion {
    #[serde(flatten)]
    pub question: QuizQuestion,
    /// `true` for a scheduled review, `false` for fresh content.
    pub is_review: bool,
}

#[derive(Debug, Serialize)]
pub struct ReviewSessionResponse {
    pub questions: Vec<SessionQuestion>,
    pub all_caught_up: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question_id: i32,
    pub is_correct: bool,
    pub response_time_secs: f64,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub question_id: i32,
    pub quality: u8,
    pub state: ReviewState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewStats {
    pub tracked: i64,
    pub due_now: i64,
}

#[derive(Debug, Deserialize)]
pub struct StartMatchRequest {
    #[serde(default)]
    pub bet_amount: i64,
    /// Present when the client is polling a ticket it already holds.
    #[serde(default)]
    pub ticket_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub matched: bool,
    pub status: TicketStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bet_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl MatchResponse {
    fn bare(status: TicketStatus) -> Self {
        MatchResponse {
            matched: false,
            status,
            opponent_id: None,
            pair_id: None,
            bet_amount: None,
            ticket_id: None,
            queue_position: None,
            expires_at: None,
        }
    }

    pub fn matched(pair: &DuelPair, viewer: i32) -> Self {
        MatchResponse {
            matched: true,
            opponent_id: Some(pair.opponent_of(viewer)),
            pair_id: Some(pair.pair_id),
            bet_amount: Some(pair.bet_amount),
            ..Self::bare(TicketStatus::Matched)
        }
    }

    pub fn from_attempt(attempt: &MatchAttempt, viewer: i32) -> Self {
        match attempt {
            MatchAttempt::Matched(pair) => Self::matched(pair, viewer),
            MatchAttempt::Enqueued {
                ticket,
                queue_position,
            } => Self::searching(ticket.ticket_id, ticket.bet_amount, *queue_position, ticket.expires_at),
        }
    }

    pub fn from_outcome(outcome: &TicketOutcome, viewer: i32, ticket_id: i32) -> Self {
        match outcome {
            TicketOutcome::Matched(pair) => Self::matched(pair, viewer),
            TicketOutcome::Searching {
                ticket,
                queue_position,
            } => Self::searching(ticket.ticket_id, ticket.bet_amount, *queue_position, ticket.expires_at),
            TicketOutcome::Expired => MatchResponse {
                ticket_id: Some(ticket_id),
                ..Self::bare(TicketStatus::Expired)
            },
            TicketOutcome::Cancelled => MatchResponse {
                ticket_id: Some(ticket_id),
                ..Self::bare(TicketStatus::Cancelled)
            },
        }
    }

    fn searching(ticket_id: i32, bet_amount: i64, queue_position: i64, expires_at: DateTime<Utc>) -> Self {
        MatchResponse {
            ticket_id: Some(ticket_id),
            bet_amount: Some(bet_amount),
            queue_position: Some(queue_position),
            expires_at: Some(expires_at),
            ..Self::bare(TicketStatus::Searching)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: i32,
    pub email: String,
    pub btz_balance: i64,
}
