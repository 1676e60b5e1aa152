use crate::api::AppState;
use crate::domain::{FightId, Market, MarketType, Settlement};
use crate::error::LedgerError;
use axum::extract::{Path, Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMarketRequest {
    pub fight_id: String,
    pub market_type: String,
    pub line: Option<String>,
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketsQuery {
    pub fight_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorQuery {
    pub actor: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDto {
    pub market_id: String,
    pub fight_id: String,
    pub market_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDetailDto {
    #[serde(flatten)]
    pub market: MarketDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<SettlementDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementDto {
    pub market_id: String,
    pub winning_side: String,
    pub result_payload: serde_json::Value,
    pub settled_at_ms: i64,
}

impl MarketDto {
    fn from_market(market: &Market) -> Self {
        MarketDto {
            market_id: market.market_id.clone(),
            fight_id: market.fight_id.to_string(),
            market_type: market.market_type.as_str().to_string(),
            line: market.line.map(|l| l.to_string()),
            status: market.status.as_str().to_string(),
        }
    }
}

impl SettlementDto {
    fn from_settlement(settlement: &Settlement) -> Self {
        SettlementDto {
            market_id: settlement.market_id.clone(),
            winning_side: settlement.winning_side.as_str().to_string(),
            result_payload: settlement.result_payload.clone(),
            settled_at_ms: settlement.settled_at_ms,
        }
    }
}

pub async fn create_market(
    State(state): State<AppState>,
    Json(req): Json<CreateMarketRequest>,
) -> Result<Json<MarketDto>, LedgerError> {
    let market_type = MarketType::parse(&req.market_type).ok_or_else(|| {
        LedgerError::Validation(format!("unknown market type: {}", req.market_type))
    })?;
    let line = match req.line.as_deref() {
        Some(raw) => Some(Decimal::from_str(raw).map_err(|_| {
            LedgerError::Validation(format!("line is not a valid decimal: {}", raw))
        })?),
        None => None,
    };

    let market = state
        .markets
        .create_market(
            &FightId::new(&req.fight_id),
            market_type,
            line,
            req.actor.as_deref(),
        )
        .await?;
    Ok(Json(MarketDto::from_market(&market)))
}

pub async fn get_markets(
    Query(params): Query<MarketsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<MarketDto>>, LedgerError> {
    let markets = state
        .repo
        .query_markets(&FightId::new(&params.fight_id))
        .await?;
    Ok(Json(markets.iter().map(MarketDto::from_market).collect()))
}

pub async fn get_market(
    Path(market_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MarketDetailDto>, LedgerError> {
    let market = state
        .repo
        .get_market(&market_id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("market {}", market_id)))?;
    let settlement = state.repo.get_settlement(&market_id).await?;

    Ok(Json(MarketDetailDto {
        market: MarketDto::from_market(&market),
        settlement: settlement.as_ref().map(SettlementDto::from_settlement),
    }))
}

pub async fn settle(
    Path(market_id): Path<String>,
    Query(params): Query<ActorQuery>,
    State(state): State<AppState>,
) -> Result<Json<SettlementDto>, LedgerError> {
    let settlement = state
        .markets
        .settle(&market_id, params.actor.as_deref())
        .await?;
    Ok(Json(SettlementDto::from_settlement(&settlement)))
}

pub async fn reopen(
    Path(market_id): Path<String>,
    Query(params): Query<ActorQuery>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, LedgerError> {
    state
        .markets
        .reopen(&market_id, params.actor.as_deref())
        .await?;
    Ok(Json(serde_json::json!({"marketId": market_id, "status": "open"})))
}

pub async fn cancel(
    Path(market_id): Path<String>,
    Query(params): Query<ActorQuery>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, LedgerError> {
    state
        .markets
        .cancel(&market_id, params.actor.as_deref())
        .await?;
    Ok(Json(serde_json::json!({"marketId": market_id, "status": "cancelled"})))
}

pub async fn void_settlement(
    Path(market_id): Path<String>,
    Query(params): Query<ActorQuery>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, LedgerError> {
    state
        .markets
        .void_settlement(&market_id, params.actor.as_deref())
        .await?;
    Ok(Json(serde_json::json!({"marketId": market_id, "status": "open", "settlementVoided": true})))
}
