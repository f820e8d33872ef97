use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

/// Thresholds turning "correct + how long it took" into an SM-2 quality score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityThresholds {
    /// Correct answers strictly faster than this score 5, slower ones 4.
    pub fast_answer_secs: f64,
    /// Wrong answers strictly faster than this count as guesses (1), slower ones 2.
    pub guess_secs: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            fast_answer_secs: 10.0,
            guess_secs: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSettings {
    pub ticket_ttl: Duration,
    pub sweep_interval: Duration,
    pub ticket_retention: Duration,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            ticket_ttl: Duration::from_secs(120),
            sweep_interval: Duration::from_secs(30),
            ticket_retention: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub pool_size: u32,
    pub questions_path: String,
    pub starting_balance: i64,
    pub bcrypt_cost: u32,
    pub log_json: bool,
    pub quality: QualityThresholds,
    pub matchmaking: MatchSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "btz_arena.db".into(),
            bind_addr: "127.0.0.1:5000".into(),
            pool_size: 8,
            questions_path: "data/questions.json".into(),
            starting_balance: 500,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            log_json: false,
            quality: QualityThresholds::default(),
            matchmaking: MatchSettings::default(),
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let secs = |key: &str, default: Duration| -> anyhow::Result<Duration> {
            Ok(Duration::from_secs(parse_or(&lookup, key, default.as_secs())?))
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            pool_size: parse_or(&lookup, "DB_POOL_SIZE", defaults.pool_size)?,
            questions_path: lookup("QUESTIONS_PATH").unwrap_or(defaults.questions_path),
            starting_balance: parse_or(&lookup, "STARTING_BALANCE", defaults.starting_balance)?,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", defaults.bcrypt_cost)?,
            log_json: parse_or(&lookup, "LOG_JSON", defaults.log_json)?,
            quality: QualityThresholds {
                fast_answer_secs: parse_or(
                    &lookup,
                    "REVIEW_FAST_ANSWER_SECS",
                    defaults.quality.fast_answer_secs,
                )?,
                guess_secs: parse_or(&lookup, "REVIEW_GUESS_SECS", defaults.quality.guess_secs)?,
            },
            matchmaking: MatchSettings {
                ticket_ttl: secs("MATCH_TICKET_TTL_SECS", defaults.matchmaking.ticket_ttl)?,
                sweep_interval: secs(
                    "MATCH_SWEEP_INTERVAL_SECS",
                    defaults.matchmaking.sweep_interval,
                )?,
                ticket_retention: secs(
                    "MATCH_TICKET_RETENTION_SECS",
                    defaults.matchmaking.ticket_retention,
                )?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
