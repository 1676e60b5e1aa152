use crate::api::AppState;
use crate::domain::{FightId, FighterId};
use crate::engine::BreakdownLine;
use crate::error::LedgerError;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub fight_id: String,
    pub fighter_id: String,
    pub profile_id: String,
    pub actor: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub fight_id: String,
    pub fighter_id: String,
    pub profile_id: String,
    /// Canonical decimal string.
    pub points: String,
    pub breakdown: Vec<BreakdownLine>,
}

pub async fn score_fighter(
    State(state): State<AppState>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, LedgerError> {
    let computed = state
        .fantasy
        .score_fighter(
            &FightId::new(&req.fight_id),
            &FighterId::new(&req.fighter_id),
            &req.profile_id,
            req.actor.as_deref(),
        )
        .await?;

    Ok(Json(ScoreResponse {
        fight_id: req.fight_id,
        fighter_id: req.fighter_id,
        profile_id: req.profile_id,
        points: computed.points.to_string(),
        breakdown: computed.breakdown,
    }))
}
