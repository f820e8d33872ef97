use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::MatchmakingEngine;
use crate::data::repositories::TicketRepository;

/// Runs `MatchmakingEngine::sweep` on the configured interval until the runtime shuts down.
pub fn spawn_sweeper<T>(engine: Arc<MatchmakingEngine<T>>) -> JoinHandle<()>
where
    T: TicketRepository + 'static,
{
    let every = engine.settings().sweep_interval;
    tokio::spawn(async move {
        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match engine.sweep() {
                Ok(report) if report.expired > 0 || report.purged > 0 => log::info!(
                    "ticket sweep: {} expired, {} purged",
                    report.expired,
                    report.purged
                ),
                Ok(_) => {}
                Err(e) => log::error!("ticket sweep failed: {}", e),
            }
        }
    })
}
