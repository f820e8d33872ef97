mod engine;
mod pairing;
pub mod poller;
mod sweeper;

pub use engine::{MatchmakingEngine, SweepReport};
pub use pairing::choose_counterpart;
pub use poller::{LocalMatchClient, MatchClient, MatchPoller, SearchOutcome, SearchProgress};
pub use sweeper::spawn_sweeper;
