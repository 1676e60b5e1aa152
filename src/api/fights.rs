use crate::api::AppState;
use crate::domain::{Corner, Fight, FightId, FightResult, WinMethod};
use crate::error::LedgerError;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFightRequest {
    pub fight_id: String,
    pub red_fighter: String,
    pub blue_fighter: String,
    pub round_duration_secs: Option<u32>,
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResultRequest {
    pub fight_id: String,
    pub winner: String,
    pub method: String,
    pub ending_round: u32,
    pub actor: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FightResultDto {
    pub winner: String,
    pub method: String,
    pub ending_round: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FightDto {
    pub fight_id: String,
    pub red_fighter: String,
    pub blue_fighter: String,
    pub round_duration_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<FightResultDto>,
}

impl FightDto {
    pub fn from_fight(fight: &Fight) -> Self {
        FightDto {
            fight_id: fight.fight_id.to_string(),
            red_fighter: fight.red_fighter.to_string(),
            blue_fighter: fight.blue_fighter.to_string(),
            round_duration_secs: fight.round_duration_secs,
            result: fight.result.as_ref().map(|r| FightResultDto {
                winner: r.winner.as_str().to_string(),
                method: r.method.as_str().to_string(),
                ending_round: r.ending_round,
            }),
        }
    }
}

pub async fn register_fight(
    State(state): State<AppState>,
    Json(req): Json<RegisterFightRequest>,
) -> Result<Json<FightDto>, LedgerError> {
    let fight = state
        .ledger
        .register_fight(
            &req.fight_id,
            &req.red_fighter,
            &req.blue_fighter,
            req.round_duration_secs,
            req.actor.as_deref(),
        )
        .await?;
    Ok(Json(FightDto::from_fight(&fight)))
}

pub async fn record_result(
    State(state): State<AppState>,
    Json(req): Json<RecordResultRequest>,
) -> Result<Json<serde_json::Value>, LedgerError> {
    let winner = Corner::parse(&req.winner)
        .ok_or_else(|| LedgerError::Validation(format!("unknown winner corner: {}", req.winner)))?;
    let method = WinMethod::parse(&req.method)
        .ok_or_else(|| LedgerError::Validation(format!("unknown win method: {}", req.method)))?;

    state
        .ledger
        .record_result(
            &FightId::new(&req.fight_id),
            &FightResult {
                winner,
                method,
                ending_round: req.ending_round,
            },
            req.actor.as_deref(),
        )
        .await?;
    Ok(Json(serde_json::json!({"fightId": req.fight_id, "recorded": true})))
}

pub async fn get_fight(
    Path(fight_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<FightDto>, LedgerError> {
    let fight = state
        .repo
        .get_fight(&FightId::new(&fight_id))
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("fight {}", fight_id)))?;
    Ok(Json(FightDto::from_fight(&fight)))
}
