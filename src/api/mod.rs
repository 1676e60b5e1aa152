pub mod admin;
pub mod events;
pub mod fantasy;
pub mod fights;
pub mod health;
pub mod markets;
pub mod stats;

use crate::config::Config;
use crate::db::Repository;
use crate::ops::{AuditLog, SystemStatusProvider};
use crate::pipeline::{FantasyService, LedgerService, MarketService};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub ledger: Arc<LedgerService>,
    pub markets: Arc<MarketService>,
    pub fantasy: Arc<FantasyService>,
    pub status: Arc<dyn SystemStatusProvider>,
    pub audit: Arc<AuditLog>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: Config) -> Self {
        let status: Arc<dyn SystemStatusProvider> =
            Arc::new(crate::ops::DbSystemStatus::new(repo.clone()));
        let audit = Arc::new(AuditLog::new(repo.clone(), config.system_actor.clone()));
        let ledger = Arc::new(LedgerService::new(
            repo.clone(),
            status.clone(),
            audit.clone(),
            config.default_round_duration_secs,
        ));
        let markets = Arc::new(MarketService::new(
            repo.clone(),
            status.clone(),
            audit.clone(),
        ));
        let fantasy = Arc::new(FantasyService::new(
            repo.clone(),
            status.clone(),
            audit.clone(),
        ));

        Self {
            repo,
            config,
            ledger,
            markets,
            fantasy,
            status,
            audit,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/fights", post(fights::register_fight))
        .route("/v1/fights/result", post(fights::record_result))
        .route("/v1/fights/:fight_id", get(fights::get_fight))
        .route(
            "/v1/events",
            post(events::append_event).get(events::get_events),
        )
        .route("/v1/bridge", post(events::bridge_round))
        .route("/v1/stats", get(stats::get_round_stats))
        .route("/v1/stats/totals", get(stats::get_fight_totals))
        .route("/v1/control/validate", get(stats::validate_control))
        .route(
            "/v1/markets",
            post(markets::create_market).get(markets::get_markets),
        )
        .route("/v1/markets/:market_id", get(markets::get_market))
        .route("/v1/markets/:market_id/settle", post(markets::settle))
        .route("/v1/markets/:market_id/reopen", post(markets::reopen))
        .route("/v1/markets/:market_id/cancel", post(markets::cancel))
        .route("/v1/markets/:market_id/void", post(markets::void_settlement))
        .route("/v1/fantasy/score", post(fantasy::score_fighter))
        .route(
            "/v1/system/status",
            get(admin::get_system_status).post(admin::set_component_status),
        )
        .route(
            "/v1/audit",
            get(admin::get_audit).post(admin::append_audit_note),
        )
        .layer(cors)
        .with_state(state)
}
