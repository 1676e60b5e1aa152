//! Fantasy scoring profiles.
//!
//! A profile is a named configuration of per-stat weights, flat bonuses, and
//! an optional total multiplier. All values are `rust_decimal::Decimal` so
//! recomputation is lossless and byte-for-byte reproducible regardless of
//! evaluation order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-stat weights and result bonuses for one scoring profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringProfile {
    pub profile_id: String,
    pub weights: ScoringWeights,
    pub bonuses: ScoringBonuses,
    /// Scales the whole total, bonuses included. Absent means no scaling.
    pub multiplier: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScoringWeights {
    pub strike_landed: Decimal,
    pub significant_strike: Decimal,
    pub knockdown: Decimal,
    pub takedown_landed: Decimal,
    pub submission_attempt: Decimal,
    pub reversal: Decimal,
    /// Points per full minute of control.
    pub control_minute: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScoringBonuses {
    pub win: Decimal,
    /// Extra on top of the win bonus when the win is a finish (KO/TKO/sub).
    pub finish: Decimal,
}

impl ScoringProfile {
    pub fn from_config_json(profile_id: &str, config: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct ProfileConfig {
            #[serde(default)]
            weights: ScoringWeights,
            #[serde(default)]
            bonuses: ScoringBonuses,
            #[serde(default)]
            multiplier: Option<Decimal>,
        }

        let config: ProfileConfig = serde_json::from_str(config)?;
        Ok(ScoringProfile {
            profile_id: profile_id.to_string(),
            weights: config.weights,
            bonuses: config.bonuses,
            multiplier: config.multiplier,
        })
    }
}
