use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use serde::Serialize;

use super::StoreError;
use crate::schema::{duel_pairs, match_tickets};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Searching,
    Matched,
    Cancelled,
    Expired,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Searching => "searching",
            TicketStatus::Matched => "matched",
            TicketStatus::Cancelled => "cancelled",
            TicketStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(self) -> bool {
        self != TicketStatus::Searching
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "searching" => Ok(TicketStatus::Searching),
            "matched" => Ok(TicketStatus::Matched),
            "cancelled" => Ok(TicketStatus::Cancelled),
            "expired" => Ok(TicketStatus::Expired),
            other => Err(format!("unknown ticket status {other:?}")),
        }
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = match_tickets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TicketRecord {
    pub ticket_id: i32,
    pub user_id: i32,
    pub bet_amount: i64,
    pub status: String,
    pub enqueued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = match_tickets)]
pub struct NewTicket<'a> {
    pub user_id: i32,
    pub bet_amount: i64,
    pub status: &'a str,
    pub enqueued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

/// A pending (or finished) request to be paired for a duel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchmakingTicket {
    pub ticket_id: i32,
    pub user_id: i32,
    pub bet_amount: i64,
    pub status: TicketStatus,
    pub enqueued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl MatchmakingTicket {
    /// Still a candidate for pairing at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == TicketStatus::Searching && now < self.expires_at
    }
}

impl TryFrom<TicketRecord> for MatchmakingTicket {
    type Error = StoreError;

    fn try_from(row: TicketRecord) -> Result<Self, Self::Error> {
        Ok(MatchmakingTicket {
            ticket_id: row.ticket_id,
            user_id: row.user_id,
            bet_amount: row.bet_amount,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            enqueued_at: row.enqueued_at.and_utc(),
            expires_at: row.expires_at.and_utc(),
        })
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = duel_pairs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PairRecord {
    pub pair_id: i32,
    pub challenger_id: i32,
    pub opponent_id: i32,
    pub opponent_ticket_id: i32,
    pub bet_amount: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = duel_pairs)]
pub struct NewPair {
    pub challenger_id: i32,
    pub opponent_id: i32,
    pub opponent_ticket_id: i32,
    pub bet_amount: i64,
    pub created_at: NaiveDateTime,
}

/// Two users paired at an agreed stake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuelPair {
    pub pair_id: i32,
    /// The user whose request completed the match.
    pub challenger_id: i32,
    /// Owner of the ticket that was waiting in the pool.
    pub opponent_id: i32,
    pub opponent_ticket_id: i32,
    pub bet_amount: i64,
    pub created_at: DateTime<Utc>,
}

impl DuelPair {
    /// The other side of the pair, seen from `user_id`.
    pub fn opponent_of(&self, user_id: i32) -> i32 {
        if user_id == self.challenger_id {
            self.opponent_id
        } else {
            self.challenger_id
        }
    }
}

impl From<PairRecord> for DuelPair {
    fn from(row: PairRecord) -> Self {
        DuelPair {
            pair_id: row.pair_id,
            challenger_id: row.challenger_id,
            opponent_id: row.opponent_id,
            opponent_ticket_id: row.opponent_ticket_id,
            bet_amount: row.bet_amount,
            created_at: row.created_at.and_utc(),
        }
    }
}

/// Result of a pair-or-enqueue attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchAttempt {
    Matched(DuelPair),
    Enqueued {
        ticket: MatchmakingTicket,
        queue_position: i64,
    },
}

/// What a poll on an existing ticket reports.
#[derive(Debug, Clone, PartialEq)]
pub enum TicketOutcome {
    Matched(DuelPair),
    Searching {
        ticket: MatchmakingTicket,
        queue_position: i64,
    },
    Expired,
    Cancelled,
}
