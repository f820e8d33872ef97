use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::config::MatchSettings;
use crate::data::models::{
    ApiError, MatchAttempt, MatchmakingTicket, StoreError, TicketOutcome, TicketStatus,
};
use crate::data::repositories::TicketRepository;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub purged: usize,
}

/// Pairs users who stake the same amount of BTZ on a duel.
pub struct MatchmakingEngine<T> {
    repo: T,
    clock: Arc<dyn Clock>,
    settings: MatchSettings,
}

fn chrono_span(span: std::time::Duration) -> Duration {
    Duration::seconds(i64::try_from(span.as_secs()).unwrap_or(i64::MAX / 1_000))
}

impl<T: TicketRepository> MatchmakingEngine<T> {
    pub fn new(repo: T, clock: Arc<dyn Clock>, settings: MatchSettings) -> Self {
        Self {
            repo,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    /// Pairs the caller with a waiting ticket at the same stake, or enqueues a
    /// new ticket. Bets the caller cannot cover are rejected before the pool
    /// is touched.
    pub fn request_match(&self, user_id: i32, bet_amount: i64) -> Result<MatchAttempt, ApiError> {
        if bet_amount <= 0 {
            return Err(ApiError::Validation(
                "bet_amount must be a positive number of BTZ".into(),
            ));
        }

        let balance = self
            .repo
            .spendable_balance(user_id)?
            .ok_or(ApiError::NotFound("user"))?;
        if balance < bet_amount {
            return Err(ApiError::InsufficientFunds {
                balance,
                bet: bet_amount,
            });
        }

        let now = self.clock.now();
        let expires_at = now + chrono_span(self.settings.ticket_ttl);
        let attempt = self
            .repo
            .pair_or_enqueue(user_id, bet_amount, now, expires_at)?;

        match &attempt {
            MatchAttempt::Matched(pair) => log::info!(
                "duel pair {} created: user {} vs user {} at {} BTZ",
                pair.pair_id,
                pair.challenger_id,
                pair.opponent_id,
                pair.bet_amount
            ),
            MatchAttempt::Enqueued { ticket, .. } => log::debug!(
                "user {} waiting on ticket {} at {} BTZ",
                user_id,
                ticket.ticket_id,
                bet_amount
            ),
        }
        Ok(attempt)
    }

    /// Reports where one of the caller's tickets stands. A SEARCHING ticket
    /// past its deadline is expired here and reported as such.
    pub fn poll_ticket(&self, user_id: i32, ticket_id: i32) -> Result<TicketOutcome, ApiError> {
        let now = self.clock.now();
        let ticket = self
            .repo
            .find_ticket(ticket_id)?
            .filter(|t| t.user_id == user_id)
            .ok_or(ApiError::NotFound("ticket"))?;

        if ticket.status.is_terminal() {
            return self.resolved_outcome(&ticket);
        }

        if now >= ticket.expires_at {
            if self.repo.expire_ticket(ticket_id, now)? {
                log::info!("ticket {} of user {} expired unmatched", ticket_id, user_id);
                return Ok(TicketOutcome::Expired);
            }
            // Lost a race with a match or a cancel: report whatever won.
            let settled = self
                .repo
                .find_ticket(ticket_id)?
                .ok_or(ApiError::NotFound("ticket"))?;
            return self.resolved_outcome(&settled);
        }

        let queue_position = self.repo.queue_position(&ticket, now)?;
        Ok(TicketOutcome::Searching {
            ticket,
            queue_position,
        })
    }

    fn resolved_outcome(&self, ticket: &MatchmakingTicket) -> Result<TicketOutcome, ApiError> {
        match ticket.status {
            TicketStatus::Matched => {
                let pair = self
                    .repo
                    .find_pair_for_ticket(ticket.ticket_id)?
                    .ok_or_else(|| {
                        StoreError::Corrupt(format!(
                            "ticket {} is matched but has no pair",
                            ticket.ticket_id
                        ))
                    })?;
                Ok(TicketOutcome::Matched(pair))
            }
            TicketStatus::Cancelled => Ok(TicketOutcome::Cancelled),
            TicketStatus::Expired | TicketStatus::Searching => Ok(TicketOutcome::Expired),
        }
    }

    /// Withdraws the caller from the pool. Calling it with nothing queued is fine.
    pub fn cancel_match(&self, user_id: i32) -> Result<usize, ApiError> {
        let cancelled = self.repo.cancel_for_user(user_id, self.clock.now())?;
        if cancelled > 0 {
            log::debug!("user {} cancelled {} ticket(s)", user_id, cancelled);
        }
        Ok(cancelled)
    }

    /// Expires stale tickets and forgets finished ones past the retention window.
    pub fn sweep(&self) -> Result<SweepReport, ApiError> {
        let now: DateTime<Utc> = self.clock.now();
        let expired = self.repo.expire_stale(now)?;
        let purged = self
            .repo
            .purge_resolved(now - chrono_span(self.settings.ticket_retention))?;
        Ok(SweepReport { expired, purged })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::data::repositories::{SqliteTicketRepository, UserRepository};
    use crate::db::{self, DbPool};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 4, 12, 0, 0).unwrap()
    }

    fn add_user(pool: &DbPool, email: &str, balance: i64) -> i32 {
        let mut conn = pool.get().unwrap();
        UserRepository::create_user(&mut conn, email, "hash", balance, t0().naive_utc())
            .unwrap()
            .user_id
    }

    fn engine(pool: &DbPool) -> (MatchmakingEngine<SqliteTicketRepository>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(t0()));
        let engine = MatchmakingEngine::new(
            SqliteTicketRepository::new(pool.clone()),
            clock.clone(),
            MatchSettings::default(),
        );
        (engine, clock)
    }

    fn enqueued_ticket(attempt: MatchAttempt) -> MatchmakingTicket {
        match attempt {
            MatchAttempt::Enqueued { ticket, .. } => ticket,
            other => panic!("expected enqueue, got {other:?}"),
        }
    }

    #[test]
    fn second_request_at_same_stake_pairs_immediately() {
        let pool = db::test_pool();
        let alice = add_user(&pool, "alice@example.com", 100);
        let bob = add_user(&pool, "bob@example.com", 100);
        let (engine, _clock) = engine(&pool);

        let ticket = enqueued_ticket(engine.request_match(alice, 25).unwrap());
        assert_eq!(ticket.status, TicketStatus::Searching);

        match engine.request_match(bob, 25).unwrap() {
            MatchAttempt::Matched(pair) => {
                assert_eq!(pair.challenger_id, bob);
                assert_eq!(pair.opponent_id, alice);
                assert_eq!(pair.opponent_ticket_id, ticket.ticket_id);
                assert_eq!(pair.bet_amount, 25);
            }
            other => panic!("expected a match, got {other:?}"),
        }

        match engine.poll_ticket(alice, ticket.ticket_id).unwrap() {
            TicketOutcome::Matched(pair) => assert_eq!(pair.opponent_of(alice), bob),
            other => panic!("expected matched, got {other:?}"),
        }
    }

    #[test]
    fn claimed_ticket_is_not_matched_twice() {
        let pool = db::test_pool();
        let alice = add_user(&pool, "alice@example.com", 100);
        let bob = add_user(&pool, "bob@example.com", 100);
        let carol = add_user(&pool, "carol@example.com", 100);
        let (engine, _clock) = engine(&pool);

        let ticket = enqueued_ticket(engine.request_match(alice, 10).unwrap());
        assert!(matches!(
            engine.request_match(bob, 10).unwrap(),
            MatchAttempt::Matched(_)
        ));

        let carol_ticket = enqueued_ticket(engine.request_match(carol, 10).unwrap());
        assert_ne!(carol_ticket.ticket_id, ticket.ticket_id);
    }

    #[test]
    fn different_stakes_do_not_pair() {
        let pool = db::test_pool();
        let alice = add_user(&pool, "alice@example.com", 100);
        let bob = add_user(&pool, "bob@example.com", 100);
        let (engine, _clock) = engine(&pool);

        enqueued_ticket(engine.request_match(alice, 10).unwrap());
        enqueued_ticket(engine.request_match(bob, 20).unwrap());
    }

    #[test]
    fn repeated_request_reuses_the_live_ticket() {
        let pool = db::test_pool();
        let alice = add_user(&pool, "alice@example.com", 100);
        let (engine, _clock) = engine(&pool);

        let first = enqueued_ticket(engine.request_match(alice, 10).unwrap());
        let again = engine.request_match(alice, 10).unwrap();
        assert_eq!(
            again,
            MatchAttempt::Enqueued {
                ticket: first,
                queue_position: 1
            }
        );
    }

    #[test]
    fn bets_are_validated_before_touching_the_pool() {
        let pool = db::test_pool();
        let alice = add_user(&pool, "alice@example.com", 30);
        let (engine, _clock) = engine(&pool);

        assert!(matches!(
            engine.request_match(alice, 0),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            engine.request_match(alice, 31),
            Err(ApiError::InsufficientFunds {
                balance: 30,
                bet: 31
            })
        ));
        assert!(matches!(
            engine.request_match(4242, 10),
            Err(ApiError::NotFound("user"))
        ));
        assert_eq!(engine.sweep().unwrap(), SweepReport::default());
        assert!(matches!(
            engine.request_match(alice, 30).unwrap(),
            MatchAttempt::Enqueued { .. }
        ));
    }

    #[test]
    fn unmatched_ticket_expires_and_leaves_the_pool() {
        let pool = db::test_pool();
        let alice = add_user(&pool, "alice@example.com", 100);
        let bob = add_user(&pool, "bob@example.com", 100);
        let (engine, clock) = engine(&pool);

        let ticket = enqueued_ticket(engine.request_match(alice, 10).unwrap());
        clock.advance(Duration::seconds(60));
        assert!(matches!(
            engine.poll_ticket(alice, ticket.ticket_id).unwrap(),
            TicketOutcome::Searching { .. }
        ));

        clock.advance(Duration::seconds(61));
        assert_eq!(
            engine.poll_ticket(alice, ticket.ticket_id).unwrap(),
            TicketOutcome::Expired
        );
        assert_eq!(
            engine.poll_ticket(alice, ticket.ticket_id).unwrap(),
            TicketOutcome::Expired
        );

        // Bob arrives later and must not be paired with the dead ticket.
        enqueued_ticket(engine.request_match(bob, 10).unwrap());
    }

    #[test]
    fn cancel_is_idempotent() {
        let pool = db::test_pool();
        let alice = add_user(&pool, "alice@example.com", 100);
        let (engine, _clock) = engine(&pool);

        assert_eq!(engine.cancel_match(alice).unwrap(), 0);
        assert_eq!(engine.cancel_match(alice).unwrap(), 0);

        let ticket = enqueued_ticket(engine.request_match(alice, 10).unwrap());
        assert_eq!(engine.cancel_match(alice).unwrap(), 1);
        assert_eq!(engine.cancel_match(alice).unwrap(), 0);
        assert_eq!(
            engine.poll_ticket(alice, ticket.ticket_id).unwrap(),
            TicketOutcome::Cancelled
        );
    }

    #[test]
    fn tickets_of_other_users_are_not_visible() {
        let pool = db::test_pool();
        let alice = add_user(&pool, "alice@example.com", 100);
        let bob = add_user(&pool, "bob@example.com", 100);
        let (engine, _clock) = engine(&pool);

        let ticket = enqueued_ticket(engine.request_match(alice, 10).unwrap());
        assert!(matches!(
            engine.poll_ticket(bob, ticket.ticket_id),
            Err(ApiError::NotFound("ticket"))
        ));
    }

    #[test]
    fn sweep_expires_then_purges() {
        let pool = db::test_pool();
        let alice = add_user(&pool, "alice@example.com", 100);
        let (engine, clock) = engine(&pool);

        let ticket = enqueued_ticket(engine.request_match(alice, 10).unwrap());
        clock.advance(Duration::seconds(130));
        assert_eq!(
            engine.sweep().unwrap(),
            SweepReport {
                expired: 1,
                purged: 0
            }
        );
        assert_eq!(
            engine.poll_ticket(alice, ticket.ticket_id).unwrap(),
            TicketOutcome::Expired
        );

        clock.advance(Duration::hours(2));
        assert_eq!(
            engine.sweep().unwrap(),
            SweepReport {
                expired: 0,
                purged: 1
            }
        );
        assert!(matches!(
            engine.poll_ticket(alice, ticket.ticket_id),
            Err(ApiError::NotFound("ticket"))
        ));
    }

    #[test]
    fn concurrent_requests_claim_a_ticket_at_most_once() {
        let dir = tempfile::tempdir().unwrap();
        let url = dir.path().join("duels.db");
        let pool = db::build_pool(url.to_str().unwrap(), 4).unwrap();
        db::run_migrations(&pool).unwrap();

        let waiting = add_user(&pool, "waiting@example.com", 100);
        let challengers: Vec<i32> = (0..6)
            .map(|i| add_user(&pool, &format!("challenger{i}@example.com"), 100))
            .collect();
        let (engine, _clock) = engine(&pool);
        let ticket = enqueued_ticket(engine.request_match(waiting, 40).unwrap());

        let results: Vec<MatchAttempt> = std::thread::scope(|scope| {
            let handles: Vec<_> = challengers
                .iter()
                .map(|&user| {
                    let engine = &engine;
                    scope.spawn(move || engine.request_match(user, 40).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let claimed: Vec<i32> = results
            .iter()
            .filter_map(|r| match r {
                MatchAttempt::Matched(pair) => Some(pair.opponent_ticket_id),
                MatchAttempt::Enqueued { .. } => None,
            })
            .collect();
        let mut unique = claimed.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), claimed.len(), "a ticket was claimed twice");
        assert_eq!(claimed.iter().filter(|&&id| id == ticket.ticket_id).count(), 1);

        // Seven participants at one stake: three pairs, one left waiting.
        assert_eq!(claimed.len(), 3);
    }
}
