use chrono::{DateTime, Utc};

use crate::data::models::MatchmakingTicket;

/// Picks the ticket a request for `bet_amount` by `user_id` should pair with:
/// the oldest live ticket at the same stake owned by someone else.
pub fn choose_counterpart(
    pool: &[MatchmakingTicket],
    user_id: i32,
    bet_amount: i64,
    now: DateTime<Utc>,
) -> Option<&MatchmakingTicket> {
    pool.iter()
        .filter(|t| t.is_live(now) && t.bet_amount == bet_amount && t.user_id != user_id)
        .min_by_key(|t| (t.enqueued_at, t.ticket_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::models::TicketStatus;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 4, 12, 0, 0).unwrap()
    }

    fn ticket(ticket_id: i32, user_id: i32, bet: i64, enqueued_offset: i64) -> MatchmakingTicket {
        let enqueued_at = t0() + Duration::seconds(enqueued_offset);
        MatchmakingTicket {
            ticket_id,
            user_id,
            bet_amount: bet,
            status: TicketStatus::Searching,
            enqueued_at,
            expires_at: enqueued_at + Duration::seconds(120),
        }
    }

    #[test]
    fn oldest_compatible_ticket_wins() {
        let pool = vec![ticket(3, 30, 50, 20), ticket(1, 10, 50, 5), ticket(2, 20, 50, 10)];
        let pick = choose_counterpart(&pool, 99, 50, t0() + Duration::seconds(30)).unwrap();
        assert_eq!(pick.ticket_id, 1);
    }

    #[test]
    fn own_tickets_and_other_stakes_are_ignored() {
        let pool = vec![ticket(1, 7, 50, 0), ticket(2, 8, 25, 0)];
        assert!(choose_counterpart(&pool, 7, 50, t0()).is_none());
        assert_eq!(choose_counterpart(&pool, 9, 25, t0()).unwrap().ticket_id, 2);
    }

    #[test]
    fn expired_or_resolved_tickets_are_not_candidates() {
        let mut matched = ticket(2, 8, 50, 0);
        matched.status = TicketStatus::Matched;
        let pool = vec![ticket(1, 7, 50, 0), matched];
        assert!(choose_counterpart(&pool, 9, 50, t0() + Duration::seconds(120)).is_none());
        assert!(choose_counterpart(&pool, 9, 50, t0() + Duration::seconds(60)).is_some());
    }
}
