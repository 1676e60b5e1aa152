//! Fantasy point computation.
//!
//! The score is a pure function of (totals, result, profile). There is no
//! incremental state: recomputing after any additional event or a result
//! correction applies the same formula to the new totals, so cached values
//! can never drift.

use crate::domain::{Corner, Fight, FighterId, ScoringProfile};
use rust_decimal::Decimal;
use serde::Serialize;

use super::aggregate::{CornerStats, FightTotals};

/// One itemized line of a fantasy score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownLine {
    pub item: String,
    pub count: u32,
    /// Weight or bonus value, canonical decimal string.
    pub weight: String,
    pub points: String,
}

/// A computed fantasy score with its itemized breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FantasyScore {
    pub points: Decimal,
    pub breakdown: Vec<BreakdownLine>,
}

/// Why a score could not be computed for this fighter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("fighter {0} is not in this fight")]
    FighterNotInFight(String),
}

/// Compute a fighter's fantasy points for a fight under a profile.
pub fn score(
    fight: &Fight,
    fighter_id: &FighterId,
    totals: &FightTotals,
    profile: &ScoringProfile,
) -> Result<FantasyScore, ScoringError> {
    let corner = fight
        .corner_of(fighter_id)
        .ok_or_else(|| ScoringError::FighterNotInFight(fighter_id.to_string()))?;

    let stats = match corner {
        Corner::Red => &totals.red,
        Corner::Blue => &totals.blue,
        Corner::Neutral => unreachable!("corner_of never returns Neutral"),
    };

    let mut points = Decimal::ZERO;
    let mut breakdown = Vec::new();
    let mut add = |item: &str, count: u32, weight: Decimal| {
        if count == 0 || weight == Decimal::ZERO {
            return;
        }
        let line_points = Decimal::from(count) * weight;
        points += line_points;
        breakdown.push(BreakdownLine {
            item: item.to_string(),
            count,
            weight: weight.to_string(),
            points: line_points.to_string(),
        });
    };

    apply_stat_weights(&mut add, stats, profile);

    if let Some(result) = &fight.result {
        if result.winner == corner {
            add("win_bonus", 1, profile.bonuses.win);
            if result.method.is_finish() {
                add("finish_bonus", 1, profile.bonuses.finish);
            }
        }
    }

    // The profile multiplier scales the whole total, bonuses included.
    if let Some(multiplier) = profile.multiplier {
        if multiplier != Decimal::ONE && points != Decimal::ZERO {
            let scaled = points * multiplier;
            breakdown.push(BreakdownLine {
                item: "profile_multiplier".to_string(),
                count: 1,
                weight: multiplier.to_string(),
                points: (scaled - points).to_string(),
            });
            points = scaled;
        }
    }

    Ok(FantasyScore { points, breakdown })
}

fn apply_stat_weights<F: FnMut(&str, u32, Decimal)>(
    add: &mut F,
    stats: &CornerStats,
    profile: &ScoringProfile,
) {
    let w = &profile.weights;
    add("strikes_landed", stats.strikes_landed, w.strike_landed);
    add(
        "significant_strikes",
        stats.significant_strikes,
        w.significant_strike,
    );
    add("knockdowns", stats.knockdowns, w.knockdown);
    add("takedowns_landed", stats.takedowns_landed, w.takedown_landed);
    add(
        "submission_attempts",
        stats.submission_attempts,
        w.submission_attempt,
    );
    add("reversals", stats.reversals, w.reversal);
    // Control scores per full minute; partial minutes do not count.
    add("control_minutes", stats.control_seconds / 60, w.control_minute);
}
