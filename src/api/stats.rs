use crate::api::AppState;
use crate::domain::{Fight, FightId};
use crate::engine::{aggregate, aggregate_fight, validate_no_overlap, FightTotals, OverlapReport, RoundStats};
use crate::error::LedgerError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStatsQuery {
    pub fight_id: String,
    pub round: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FightQuery {
    pub fight_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStatsResponse {
    pub fight_id: String,
    #[serde(flatten)]
    pub stats: RoundStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FightTotalsResponse {
    pub fight_id: String,
    pub totals: FightTotals,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlValidationResponse {
    pub fight_id: String,
    pub round: u32,
    #[serde(flatten)]
    pub report: OverlapReport,
}

async fn load_fight(state: &AppState, fight_id: &str) -> Result<Fight, LedgerError> {
    state
        .repo
        .get_fight(&FightId::new(fight_id))
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("fight {}", fight_id)))
}

pub async fn get_round_stats(
    Query(params): Query<RoundStatsQuery>,
    State(state): State<AppState>,
) -> Result<Json<RoundStatsResponse>, LedgerError> {
    if params.round == 0 {
        return Err(LedgerError::Validation("round must be at least 1".to_string()));
    }
    let fight = load_fight(&state, &params.fight_id).await?;
    let events = state
        .repo
        .query_events(&fight.fight_id, Some(params.round), None)
        .await?;
    let stats = aggregate(&events, params.round, fight.round_duration_secs);

    Ok(Json(RoundStatsResponse {
        fight_id: params.fight_id,
        stats,
    }))
}

pub async fn get_fight_totals(
    Query(params): Query<FightQuery>,
    State(state): State<AppState>,
) -> Result<Json<FightTotalsResponse>, LedgerError> {
    let fight = load_fight(&state, &params.fight_id).await?;
    let events = state.repo.query_events(&fight.fight_id, None, None).await?;
    let totals = aggregate_fight(&events, fight.round_duration_secs);

    Ok(Json(FightTotalsResponse {
        fight_id: params.fight_id,
        totals,
    }))
}

pub async fn validate_control(
    Query(params): Query<RoundStatsQuery>,
    State(state): State<AppState>,
) -> Result<Json<ControlValidationResponse>, LedgerError> {
    if params.round == 0 {
        return Err(LedgerError::Validation("round must be at least 1".to_string()));
    }
    let fight = load_fight(&state, &params.fight_id).await?;
    let events = state
        .repo
        .query_events(&fight.fight_id, Some(params.round), None)
        .await?;
    let report = validate_no_overlap(&events, fight.round_duration_secs);

    Ok(Json(ControlValidationResponse {
        fight_id: params.fight_id,
        round: params.round,
        report,
    }))
}
