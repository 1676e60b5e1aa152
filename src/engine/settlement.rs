//! Market settlement evaluators.
//!
//! Evaluation is pure: given the market, the fight (with its official
//! result), and the aggregated fight totals, produce the winning side and
//! the input payload to freeze into the settlement record. Persistence and
//! the exactly-once guarantee live in the pipeline/repository layers.

use crate::domain::{Corner, Fight, Market, MarketType, WinningSide};
use rust_decimal::Decimal;
use serde_json::json;

use super::aggregate::FightTotals;

/// A successful evaluation: the side that won and the inputs that decided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementOutcome {
    pub winning_side: WinningSide,
    pub result_payload: serde_json::Value,
}

/// Why an evaluator could not complete. The caller moves the market to
/// suspended; these are never silently defaulted into a plausible outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("fight result not recorded for {0}")]
    MissingResult(String),
    #[error("market has no line")]
    MissingLine,
    #[error("market type {0} is not supported for settlement")]
    Unsupported(MarketType),
}

/// Evaluate a market against the fight result and aggregated totals.
pub fn evaluate_market(
    market: &Market,
    fight: &Fight,
    totals: &FightTotals,
) -> Result<SettlementOutcome, EvaluationError> {
    match market.market_type {
        MarketType::Winner => evaluate_winner(market, fight),
        MarketType::TotalSigStrikes => {
            let actual = totals.red.significant_strikes + totals.blue.significant_strikes;
            evaluate_over_under(market, "total_sig_strikes", actual)
        }
        MarketType::KdOverUnder => {
            let actual = totals.red.knockdowns + totals.blue.knockdowns;
            evaluate_over_under(market, "knockdowns", actual)
        }
        // The legacy event feed this engine settles from has no trustworthy
        // per-event submission-attempt trail; refusing beats fabricating a
        // believable-looking number.
        MarketType::SubAttOverUnder => Err(EvaluationError::Unsupported(market.market_type)),
    }
}

fn evaluate_winner(market: &Market, fight: &Fight) -> Result<SettlementOutcome, EvaluationError> {
    let result = fight
        .result
        .as_ref()
        .ok_or_else(|| EvaluationError::MissingResult(fight.fight_id.to_string()))?;

    let winning_side = match result.winner {
        Corner::Red => WinningSide::Red,
        Corner::Blue => WinningSide::Blue,
        Corner::Neutral => WinningSide::Void,
    };

    Ok(SettlementOutcome {
        winning_side,
        result_payload: json!({
            "marketType": market.market_type.as_str(),
            "winner": result.winner.as_str(),
            "method": result.method.as_str(),
            "endingRound": result.ending_round,
        }),
    })
}

fn evaluate_over_under(
    market: &Market,
    stat_name: &str,
    actual: u32,
) -> Result<SettlementOutcome, EvaluationError> {
    let line = market.line.ok_or(EvaluationError::MissingLine)?;

    // Strict greater-than: an exact tie settles UNDER. Whether ties should
    // instead push is an open product question; the comparison operator here
    // is the recorded decision until that is answered.
    let winning_side = if Decimal::from(actual) > line {
        WinningSide::Over
    } else {
        WinningSide::Under
    };

    Ok(SettlementOutcome {
        winning_side,
        result_payload: json!({
            "marketType": market.market_type.as_str(),
            "stat": stat_name,
            "actual": actual,
            "line": line.to_string(),
        }),
    })
}
