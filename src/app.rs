use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use time::Duration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::{
    clock::Clock,
    config::Config,
    db::DbPool,
    data::repositories::{SqliteReviewRepository, SqliteTicketRepository},
    features::{matchmaking::MatchmakingEngine, review::ReviewService},
    handlers::{
        auth::{login, register},
        duel, profile, review,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub clock: Arc<dyn Clock>,
    pub review: Arc<ReviewService<SqliteReviewRepository>>,
    pub matchmaking: Arc<MatchmakingEngine<SqliteTicketRepository>>,
    pub starting_balance: i64,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(pool: DbPool, config: &Config, clock: Arc<dyn Clock>) -> Self {
        let review = ReviewService::new(
            SqliteReviewRepository::new(pool.clone()),
            clock.clone(),
            config.quality,
        );
        let matchmaking = MatchmakingEngine::new(
            SqliteTicketRepository::new(pool.clone()),
            clock.clone(),
            config.matchmaking,
        );
        Self {
            pool,
            clock,
            review: Arc::new(review),
            matchmaking: Arc::new(matchmaking),
            starting_balance: config.starting_balance,
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Sessions configuration
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(Duration::days(1)))
        .with_secure(false);

    let review_router = Router::new()
        .route("/session", post(review::review_session))
        .route("/answer", post(review::submit_answer))
        .route("/stats", get(review::review_stats));

    let duel_router = Router::new()
        .route("/match", post(duel::start_match))
        .route("/cancel", post(duel::cancel_match));

    let api_router = Router::new()
        .nest("/review", review_router)
        .nest("/duels", duel_router)
        .route("/me", get(profile::me));

    let auth_router = Router::new()
        .route("/register", post(register::handle_register))
        .route("/login", post(login::handle_login))
        .route("/logout", get(login::handle_logout));

    Router::new()
        .nest("/auth", auth_router)
        .nest("/api", api_router)
        .with_state(state)
        .layer(session_layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::data::models::CatalogEntry;
    use crate::data::models::Difficulty;
    use crate::data::repositories::QuestionRepository;
    use crate::db;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let pool = db::test_pool();
        {
            let mut conn = pool.get().unwrap();
            let entries: Vec<CatalogEntry> = (1..=3)
                .map(|i| CatalogEntry {
                    slug: format!("compound-interest-{i}"),
                    prompt: "What grows faster with compound interest?".into(),
                    options: vec!["Principal".into(), "Principal plus interest".into()],
                    correct_answer: "Principal plus interest".into(),
                    explanation: None,
                    category: "saving".into(),
                    difficulty: Difficulty::Easy,
                })
                .collect();
            QuestionRepository::upsert_catalog(&mut conn, &entries).unwrap();
        }
        let config = Config {
            bcrypt_cost: 4,
            ..Config::default()
        };
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
        ));
        build_router(AppState::new(pool, &config, clock))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Value,
    ) -> (StatusCode, Option<String>, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = app
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, cookie, json)
    }

    async fn register(app: &Router, email: &str) -> (String, i64) {
        let (status, cookie, body) = send(
            app,
            "POST",
            "/auth/register",
            None,
            json!({ "email": email, "password": "correct horse" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (cookie.expect("session cookie"), body["user_id"].as_i64().unwrap())
    }

    #[tokio::test]
    async fn api_requires_a_session() {
        let app = test_app();
        let (status, _, body) = send(
            &app,
            "POST",
            "/api/review/session",
            None,
            json!({ "difficulty": "easy" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], 401);
    }

    #[tokio::test]
    async fn review_round_trip() {
        let app = test_app();
        let (cookie, _) = register(&app, "learner@example.com").await;

        let (status, _, batch) = send(
            &app,
            "POST",
            "/api/review/session",
            Some(&cookie),
            json!({ "difficulty": "easy", "limit": 2 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(batch["questions"].as_array().unwrap().len(), 2);
        assert_eq!(batch["all_caught_up"], false);

        let question_id = batch["questions"][0]["id"].as_i64().unwrap();
        let (status, _, answer) = send(
            &app,
            "POST",
            "/api/review/answer",
            Some(&cookie),
            json!({ "question_id": question_id, "is_correct": true, "response_time_secs": 4.2 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(answer["quality"], 5);
        assert_eq!(answer["state"]["interval_days"], 1);

        let (_, _, stats) = send(&app, "GET", "/api/review/stats", Some(&cookie), Value::Null).await;
        assert_eq!(stats["tracked"], 1);
    }

    #[tokio::test]
    async fn duel_flow_over_http() {
        let app = test_app();
        let (alice, alice_id) = register(&app, "alice@example.com").await;
        let (bob, bob_id) = register(&app, "bob@example.com").await;

        let (status, _, body) = send(
            &app,
            "POST",
            "/api/duels/match",
            Some(&alice),
            json!({ "bet_amount": 10_000 }),
        )
        .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["status"], 402);

        let (_, _, waiting) = send(
            &app,
            "POST",
            "/api/duels/match",
            Some(&alice),
            json!({ "bet_amount": 50 }),
        )
        .await;
        assert_eq!(waiting["matched"], false);
        assert_eq!(waiting["status"], "searching");
        let ticket_id = waiting["ticket_id"].as_i64().unwrap();

        let (_, _, paired) = send(
            &app,
            "POST",
            "/api/duels/match",
            Some(&bob),
            json!({ "bet_amount": 50 }),
        )
        .await;
        assert_eq!(paired["matched"], true);
        assert_eq!(paired["opponent_id"].as_i64(), Some(alice_id));

        let (_, _, polled) = send(
            &app,
            "POST",
            "/api/duels/match",
            Some(&alice),
            json!({ "ticket_id": ticket_id }),
        )
        .await;
        assert_eq!(polled["matched"], true);
        assert_eq!(polled["opponent_id"].as_i64(), Some(bob_id));

        for _ in 0..2 {
            let (status, _, body) =
                send(&app, "POST", "/api/duels/cancel", Some(&alice), Value::Null).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
        }
    }
}
