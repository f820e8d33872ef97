use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Integer;

use super::UserRepository;
use crate::data::models::{
    DuelPair, MatchAttempt, MatchmakingTicket, NewPair, NewTicket, PairRecord, StoreError,
    TicketRecord, TicketStatus,
};
use crate::db::DbPool;
use crate::features::matchmaking::choose_counterpart;
use crate::schema::{duel_pairs, match_tickets};

/// How many of the oldest live tickets are considered per pairing attempt.
const CANDIDATE_WINDOW: i64 = 16;

/// Persistence needed by the matchmaking engine. `pair_or_enqueue` is the
/// only operation that claims another user's ticket and must be atomic.
pub trait TicketRepository: Send + Sync {
    fn spendable_balance(&self, user_id: i32) -> Result<Option<i64>, StoreError>;

    fn pair_or_enqueue(
        &self,
        user_id: i32,
        bet_amount: i64,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<MatchAttempt, StoreError>;

    fn find_ticket(&self, ticket_id: i32) -> Result<Option<MatchmakingTicket>, StoreError>;

    fn find_pair_for_ticket(&self, ticket_id: i32) -> Result<Option<DuelPair>, StoreError>;

    /// Moves a SEARCHING ticket to EXPIRED. `false` if it was no longer searching.
    fn expire_ticket(&self, ticket_id: i32, now: DateTime<Utc>) -> Result<bool, StoreError>;

    fn queue_position(
        &self,
        ticket: &MatchmakingTicket,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Cancels every SEARCHING ticket the user owns.
    fn cancel_for_user(&self, user_id: i32, now: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Expires every SEARCHING ticket whose deadline has passed.
    fn expire_stale(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Deletes finished tickets resolved before `before`.
    fn purge_resolved(&self, before: DateTime<Utc>) -> Result<usize, StoreError>;
}

#[derive(Clone)]
pub struct SqliteTicketRepository {
    pool: DbPool,
}

impl SqliteTicketRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn searching() -> &'static str {
    TicketStatus::Searching.as_str()
}

fn load_ticket(
    conn: &mut SqliteConnection,
    ticket_id: i32,
) -> Result<Option<MatchmakingTicket>, StoreError> {
    match_tickets::table
        .find(ticket_id)
        .select(TicketRecord::as_select())
        .first(conn)
        .optional()?
        .map(MatchmakingTicket::try_from)
        .transpose()
}

fn expire_stale_in(conn: &mut SqliteConnection, now: DateTime<Utc>) -> Result<usize, StoreError> {
    let now = now.naive_utc();
    Ok(diesel::update(
        match_tickets::table
            .filter(match_tickets::status.eq(searching()))
            .filter(match_tickets::expires_at.le(now)),
    )
    .set((
        match_tickets::status.eq(TicketStatus::Expired.as_str()),
        match_tickets::resolved_at.eq(Some(now)),
    ))
    .execute(conn)?)
}

fn queue_position_in(
    conn: &mut SqliteConnection,
    ticket: &MatchmakingTicket,
    now: DateTime<Utc>,
) -> Result<i64, StoreError> {
    let ahead = match_tickets::table
        .filter(match_tickets::bet_amount.eq(ticket.bet_amount))
        .filter(match_tickets::status.eq(searching()))
        .filter(match_tickets::expires_at.gt(now.naive_utc()))
        .filter(match_tickets::ticket_id.lt(ticket.ticket_id))
        .count()
        .get_result::<i64>(conn)?;
    Ok(ahead + 1)
}

/// Conditional SEARCHING -> MATCHED. Exactly one caller can win a given ticket.
fn claim_ticket(
    conn: &mut SqliteConnection,
    ticket_id: i32,
    now: DateTime<Utc>,
) -> Result<bool, StoreError> {
    let now = now.naive_utc();
    let updated = diesel::update(
        match_tickets::table
            .filter(match_tickets::ticket_id.eq(ticket_id))
            .filter(match_tickets::status.eq(searching()))
            .filter(match_tickets::expires_at.gt(now)),
    )
    .set((
        match_tickets::status.eq(TicketStatus::Matched.as_str()),
        match_tickets::resolved_at.eq(Some(now)),
    ))
    .execute(conn)?;
    Ok(updated == 1)
}

fn last_insert_rowid(conn: &mut SqliteConnection) -> Result<i32, StoreError> {
    Ok(diesel::select(diesel::dsl::sql::<Integer>("last_insert_rowid()")).get_result::<i32>(conn)?)
}

fn live_ticket_for(
    conn: &mut SqliteConnection,
    user_id: i32,
    bet_amount: i64,
    now: DateTime<Utc>,
) -> Result<Option<MatchmakingTicket>, StoreError> {
    match_tickets::table
        .filter(match_tickets::user_id.eq(user_id))
        .filter(match_tickets::bet_amount.eq(bet_amount))
        .filter(match_tickets::status.eq(searching()))
        .filter(match_tickets::expires_at.gt(now.naive_utc()))
        .select(TicketRecord::as_select())
        .first(conn)
        .optional()?
        .map(MatchmakingTicket::try_from)
        .transpose()
}

fn enqueue(
    conn: &mut SqliteConnection,
    user_id: i32,
    bet_amount: i64,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<MatchmakingTicket, StoreError> {
    diesel::insert_into(match_tickets::table)
        .values(&NewTicket {
            user_id,
            bet_amount,
            status: searching(),
            enqueued_at: now.naive_utc(),
            expires_at: expires_at.naive_utc(),
        })
        .execute(conn)?;
    let ticket_id = last_insert_rowid(conn)?;
    load_ticket(conn, ticket_id)?
        .ok_or_else(|| StoreError::Corrupt(format!("ticket {ticket_id} vanished after insert")))
}

fn create_pair(
    conn: &mut SqliteConnection,
    challenger_id: i32,
    claimed: &MatchmakingTicket,
    now: DateTime<Utc>,
) -> Result<DuelPair, StoreError> {
    diesel::insert_into(duel_pairs::table)
        .values(&NewPair {
            challenger_id,
            opponent_id: claimed.user_id,
            opponent_ticket_id: claimed.ticket_id,
            bet_amount: claimed.bet_amount,
            created_at: now.naive_utc(),
        })
        .execute(conn)?;
    let pair_id = last_insert_rowid(conn)?;
    let row = duel_pairs::table
        .find(pair_id)
        .select(PairRecord::as_select())
        .first(conn)?;
    Ok(row.into())
}

impl TicketRepository for SqliteTicketRepository {
    fn spendable_balance(&self, user_id: i32) -> Result<Option<i64>, StoreError> {
        let mut conn = self.pool.get()?;
        Ok(UserRepository::balance(&mut conn, user_id)?)
    }

    fn pair_or_enqueue(
        &self,
        user_id: i32,
        bet_amount: i64,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<MatchAttempt, StoreError> {
        let mut conn = self.pool.get()?;
        // BEGIN IMMEDIATE takes the write lock up front, so two requests can
        // never both read the same candidate as SEARCHING.
        conn.immediate_transaction::<_, StoreError, _>(|conn| {
            expire_stale_in(conn, now)?;

            if let Some(ticket) = live_ticket_for(conn, user_id, bet_amount, now)? {
                let queue_position = queue_position_in(conn, &ticket, now)?;
                return Ok(MatchAttempt::Enqueued {
                    ticket,
                    queue_position,
                });
            }

            let mut candidates = match_tickets::table
                .filter(match_tickets::bet_amount.eq(bet_amount))
                .filter(match_tickets::status.eq(searching()))
                .filter(match_tickets::user_id.ne(user_id))
                .filter(match_tickets::expires_at.gt(now.naive_utc()))
                .order((
                    match_tickets::enqueued_at.asc(),
                    match_tickets::ticket_id.asc(),
                ))
                .limit(CANDIDATE_WINDOW)
                .select(TicketRecord::as_select())
                .load(conn)?
                .into_iter()
                .map(MatchmakingTicket::try_from)
                .collect::<Result<Vec<_>, _>>()?;

            while let Some(pick) = choose_counterpart(&candidates, user_id, bet_amount, now).cloned()
            {
                if claim_ticket(conn, pick.ticket_id, now)? {
                    let pair = create_pair(conn, user_id, &pick, now)?;
                    return Ok(MatchAttempt::Matched(pair));
                }
                log::debug!("ticket {} was taken before it could be claimed", pick.ticket_id);
                candidates.retain(|t| t.ticket_id != pick.ticket_id);
            }

            let ticket = enqueue(conn, user_id, bet_amount, now, expires_at)?;
            let queue_position = queue_position_in(conn, &ticket, now)?;
            Ok(MatchAttempt::Enqueued {
                ticket,
                queue_position,
            })
        })
    }

    fn find_ticket(&self, ticket_id: i32) -> Result<Option<MatchmakingTicket>, StoreError> {
        let mut conn = self.pool.get()?;
        load_ticket(&mut conn, ticket_id)
    }

    fn find_pair_for_ticket(&self, ticket_id: i32) -> Result<Option<DuelPair>, StoreError> {
        let mut conn = self.pool.get()?;
        let row = duel_pairs::table
            .filter(duel_pairs::opponent_ticket_id.eq(ticket_id))
            .select(PairRecord::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(DuelPair::from))
    }

    fn expire_ticket(&self, ticket_id: i32, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut conn = self.pool.get()?;
        let now = now.naive_utc();
        let updated = diesel::update(
            match_tickets::table
                .filter(match_tickets::ticket_id.eq(ticket_id))
                .filter(match_tickets::status.eq(searching())),
        )
        .set((
            match_tickets::status.eq(TicketStatus::Expired.as_str()),
            match_tickets::resolved_at.eq(Some(now)),
        ))
        .execute(&mut conn)?;
        Ok(updated == 1)
    }

    fn queue_position(
        &self,
        ticket: &MatchmakingTicket,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let mut conn = self.pool.get()?;
        queue_position_in(&mut conn, ticket, now)
    }

    fn cancel_for_user(&self, user_id: i32, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut conn = self.pool.get()?;
        let now = now.naive_utc();
        Ok(diesel::update(
            match_tickets::table
                .filter(match_tickets::user_id.eq(user_id))
                .filter(match_tickets::status.eq(searching())),
        )
        .set((
            match_tickets::status.eq(TicketStatus::Cancelled.as_str()),
            match_tickets::resolved_at.eq(Some(now)),
        ))
        .execute(&mut conn)?)
    }

    fn expire_stale(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut conn = self.pool.get()?;
        expire_stale_in(&mut conn, now)
    }

    fn purge_resolved(&self, before: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut conn = self.pool.get()?;
        Ok(diesel::delete(
            match_tickets::table
                .filter(match_tickets::status.ne(searching()))
                .filter(match_tickets::resolved_at.lt(before.naive_utc())),
        )
        .execute(&mut conn)?)
    }
}
