//! Client side of the duel search: start, then poll until something final happens.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

use super::MatchmakingEngine;
use crate::config::MatchSettings;
use crate::data::models::{ApiError, DuelPair, MatchAttempt, TicketOutcome};
use crate::data::repositories::TicketRepository;

/// The calls a searching client makes against the matchmaking service.
#[allow(async_fn_in_trait)]
pub trait MatchClient {
    type Error: fmt::Display;

    async fn start(&self, bet_amount: i64) -> Result<MatchAttempt, Self::Error>;

    async fn poll(&self, ticket_id: i32) -> Result<TicketOutcome, Self::Error>;

    async fn cancel(&self) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Matched(DuelPair),
    /// Nobody was found before the search timed out.
    Expired,
    /// The user withdrew while searching.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchProgress {
    pub elapsed: Duration,
    pub queue_position: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct MatchPoller {
    poll_interval: Duration,
    search_timeout: Duration,
}

impl Default for MatchPoller {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            search_timeout: Duration::from_secs(120),
        }
    }
}

impl MatchPoller {
    pub fn new(poll_interval: Duration, search_timeout: Duration) -> Self {
        Self {
            poll_interval,
            search_timeout,
        }
    }

    /// Gives up exactly when the server would expire the ticket.
    pub fn from_settings(settings: &MatchSettings) -> Self {
        Self {
            search_timeout: settings.ticket_ttl,
            ..Self::default()
        }
    }

    pub async fn search<C: MatchClient>(
        &self,
        client: &C,
        bet_amount: i64,
    ) -> Result<SearchOutcome, C::Error> {
        self.search_with_progress(client, bet_amount, |_| {}).await
    }

    /// Runs one search to completion. Only the initial request can fail: a
    /// rejected bet is returned as `Err`. Failed polls are logged and retried
    /// on the next tick until the timeout, which cancels the ticket and
    /// reports `Expired`.
    pub async fn search_with_progress<C, P>(
        &self,
        client: &C,
        bet_amount: i64,
        mut on_progress: P,
    ) -> Result<SearchOutcome, C::Error>
    where
        C: MatchClient,
        P: FnMut(SearchProgress),
    {
        let ticket_id = match client.start(bet_amount).await? {
            MatchAttempt::Matched(pair) => return Ok(SearchOutcome::Matched(pair)),
            MatchAttempt::Enqueued {
                ticket,
                queue_position,
            } => {
                on_progress(SearchProgress {
                    elapsed: Duration::ZERO,
                    queue_position,
                });
                ticket.ticket_id
            }
        };

        let started = Instant::now();
        let mut ticker = time::interval_at(started + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let elapsed = started.elapsed();
            if elapsed >= self.search_timeout {
                return Ok(self.give_up(client, ticket_id).await);
            }

            match client.poll(ticket_id).await {
                Ok(TicketOutcome::Matched(pair)) => return Ok(SearchOutcome::Matched(pair)),
                Ok(TicketOutcome::Expired) => return Ok(SearchOutcome::Expired),
                Ok(TicketOutcome::Cancelled) => return Ok(SearchOutcome::Cancelled),
                Ok(TicketOutcome::Searching { queue_position, .. }) => on_progress(SearchProgress {
                    elapsed,
                    queue_position,
                }),
                Err(e) => log::warn!("poll for ticket {} failed, retrying: {}", ticket_id, e),
            }
        }
    }

    async fn give_up<C: MatchClient>(&self, client: &C, ticket_id: i32) -> SearchOutcome {
        if let Err(e) = client.cancel().await {
            log::warn!("cancelling timed-out ticket {} failed: {}", ticket_id, e);
        }
        // A pairing may have landed between the last poll and the cancel.
        match client.poll(ticket_id).await {
            Ok(TicketOutcome::Matched(pair)) => SearchOutcome::Matched(pair),
            _ => SearchOutcome::Expired,
        }
    }
}

/// `MatchClient` that calls an in-process engine on behalf of one user.
pub struct LocalMatchClient<T> {
    engine: Arc<MatchmakingEngine<T>>,
    user_id: i32,
}

impl<T> LocalMatchClient<T> {
    pub fn new(engine: Arc<MatchmakingEngine<T>>, user_id: i32) -> Self {
        Self { engine, user_id }
    }
}

impl<T: TicketRepository> MatchClient for LocalMatchClient<T> {
    type Error = ApiError;

    async fn start(&self, bet_amount: i64) -> Result<MatchAttempt, ApiError> {
        self.engine.request_match(self.user_id, bet_amount)
    }

    async fn poll(&self, ticket_id: i32) -> Result<TicketOutcome, ApiError> {
        self.engine.poll_ticket(self.user_id, ticket_id)
    }

    async fn cancel(&self) -> Result<(), ApiError> {
        self.engine.cancel_match(self.user_id).map(|_| ())
    }
}
