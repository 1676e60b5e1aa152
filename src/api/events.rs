use crate::api::AppState;
use crate::domain::{normalize, EventKind, FightEvent, FightId};
use crate::engine::RoundSnapshot;
use crate::error::LedgerError;
use crate::pipeline::EventSubmission;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendEventRequest {
    pub fight_id: String,
    pub round: u32,
    pub second_in_round: u32,
    pub label: String,
    pub corner: String,
    pub detail: Option<serde_json::Value>,
    pub actor: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendEventResponse {
    pub fight_id: String,
    pub seq: i64,
    pub kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub fight_id: String,
    pub round: Option<u32>,
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    pub seq: i64,
    pub round: u32,
    pub second_in_round: u32,
    pub kind: String,
    pub corner: String,
    pub detail: serde_json::Value,
    pub generated: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub fight_id: String,
    pub events: Vec<EventDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRequest {
    pub fight_id: String,
    pub round: u32,
    pub snapshot: RoundSnapshot,
    pub actor: Option<String>,
}

pub async fn append_event(
    State(state): State<AppState>,
    Json(req): Json<AppendEventRequest>,
) -> Result<Json<AppendEventResponse>, LedgerError> {
    let appended = state
        .ledger
        .append(
            &EventSubmission {
                fight_id: req.fight_id,
                round: req.round,
                second_in_round: req.second_in_round,
                label: req.label,
                corner: req.corner,
                detail: req.detail,
            },
            req.actor.as_deref(),
        )
        .await?;

    Ok(Json(AppendEventResponse {
        fight_id: appended.fight_id.to_string(),
        seq: appended.seq,
        kind: appended.kind.as_str().to_string(),
    }))
}

pub async fn get_events(
    Query(params): Query<EventsQuery>,
    State(state): State<AppState>,
) -> Result<Json<EventsResponse>, LedgerError> {
    let kind = match params.kind.as_deref() {
        Some(raw) => Some(EventKind::parse(&normalize(raw)).ok_or_else(|| {
            LedgerError::Validation(format!("unknown event kind filter: {}", raw))
        })?),
        None => None,
    };

    let fight_id = FightId::new(&params.fight_id);
    if state.repo.get_fight(&fight_id).await?.is_none() {
        return Err(LedgerError::NotFound(format!("fight {}", params.fight_id)));
    }

    let events = state.repo.query_events(&fight_id, params.round, kind).await?;
    Ok(Json(EventsResponse {
        fight_id: params.fight_id,
        events: events.iter().map(event_dto).collect(),
    }))
}

pub async fn bridge_round(
    State(state): State<AppState>,
    Json(req): Json<BridgeRequest>,
) -> Result<Json<serde_json::Value>, LedgerError> {
    let inserted = state
        .ledger
        .bridge_round(
            &FightId::new(&req.fight_id),
            req.round,
            &req.snapshot,
            req.actor.as_deref(),
        )
        .await?;
    Ok(Json(serde_json::json!({
        "fightId": req.fight_id,
        "round": req.round,
        "inserted": inserted,
    })))
}

fn event_dto(event: &FightEvent) -> EventDto {
    EventDto {
        seq: event.seq,
        round: event.round,
        second_in_round: event.second_in_round,
        kind: event.kind.as_str().to_string(),
        corner: event.corner.as_str().to_string(),
        detail: serde_json::to_value(&event.detail).unwrap_or(serde_json::Value::Null),
        generated: event.generated,
    }
}
