//! Market and settlement types.

use crate::domain::FightId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Propositions this engine knows how to settle. At most one market of a
/// given type exists per fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    Winner,
    TotalSigStrikes,
    KdOverUnder,
    SubAttOverUnder,
}

impl MarketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::Winner => "winner",
            MarketType::TotalSigStrikes => "total_sig_strikes",
            MarketType::KdOverUnder => "kd_over_under",
            MarketType::SubAttOverUnder => "sub_att_over_under",
        }
    }

    pub fn parse(s: &str) -> Option<MarketType> {
        match s {
            "winner" => Some(MarketType::Winner),
            "total_sig_strikes" => Some(MarketType::TotalSigStrikes),
            "kd_over_under" => Some(MarketType::KdOverUnder),
            "sub_att_over_under" => Some(MarketType::SubAttOverUnder),
            _ => None,
        }
    }

    /// Over/under markets require a line; the winner market must not carry one.
    pub fn requires_line(&self) -> bool {
        !matches!(self, MarketType::Winner)
    }
}

impl std::fmt::Display for MarketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Market lifecycle. `Settled` and `Cancelled` are terminal; `Suspended`
/// requires an audited administrative reopen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Settled,
    Suspended,
    Cancelled,
}

impl MarketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketStatus::Open => "open",
            MarketStatus::Settled => "settled",
            MarketStatus::Suspended => "suspended",
            MarketStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<MarketStatus> {
        match s {
            "open" => Some(MarketStatus::Open),
            "settled" => Some(MarketStatus::Settled),
            "suspended" => Some(MarketStatus::Suspended),
            "cancelled" => Some(MarketStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bettable proposition on a fight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub market_id: String,
    pub fight_id: FightId,
    pub market_type: MarketType,
    /// Over/under line; None for winner markets.
    pub line: Option<Decimal>,
    pub status: MarketStatus,
}

impl Market {
    pub fn new(fight_id: FightId, market_type: MarketType, line: Option<Decimal>) -> Self {
        Market {
            market_id: Uuid::new_v4().to_string(),
            fight_id,
            market_type,
            line,
            status: MarketStatus::Open,
        }
    }

    /// Idempotency token for exactly-once settlement: written in the same
    /// transaction as the settlement row so a retried partial transaction
    /// cannot settle twice.
    pub fn execution_key(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.market_id.as_bytes());
        hasher.update(b"|");
        hasher.update(self.fight_id.as_str().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Which side of the proposition won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WinningSide {
    Red,
    Blue,
    Over,
    Under,
    /// Draws and no-contests void the winner market.
    Void,
}

impl WinningSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            WinningSide::Red => "red",
            WinningSide::Blue => "blue",
            WinningSide::Over => "over",
            WinningSide::Under => "under",
            WinningSide::Void => "void",
        }
    }
}

impl std::fmt::Display for WinningSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The immutable resolution of exactly one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub market_id: String,
    pub winning_side: WinningSide,
    /// Inputs the evaluator saw, for audit replay.
    pub result_payload: serde_json::Value,
    /// Wall-clock settle time, milliseconds since Unix epoch.
    pub settled_at_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_market_type_roundtrip() {
        for t in [
            MarketType::Winner,
            MarketType::TotalSigStrikes,
            MarketType::KdOverUnder,
            MarketType::SubAttOverUnder,
        ] {
            assert_eq!(MarketType::parse(t.as_str()), Some(t));
        }
        assert_eq!(MarketType::parse("round_winner"), None);
    }

    #[test]
    fn test_requires_line() {
        assert!(!MarketType::Winner.requires_line());
        assert!(MarketType::TotalSigStrikes.requires_line());
        assert!(MarketType::KdOverUnder.requires_line());
    }

    #[test]
    fn test_execution_key_deterministic() {
        let market = Market {
            market_id: "m-1".to_string(),
            fight_id: FightId::new("f-1"),
            market_type: MarketType::Winner,
            line: None,
            status: MarketStatus::Open,
        };
        assert_eq!(market.execution_key(), market.execution_key());
        assert_eq!(market.execution_key().len(), 64);
    }

    #[test]
    fn test_execution_key_varies_by_market() {
        let a = Market {
            market_id: "m-1".to_string(),
            fight_id: FightId::new("f-1"),
            market_type: MarketType::Winner,
            line: None,
            status: MarketStatus::Open,
        };
        let mut b = a.clone();
        b.market_id = "m-2".to_string();
        assert_ne!(a.execution_key(), b.execution_key());
    }

    #[test]
    fn test_new_market_is_open_with_uuid() {
        let market = Market::new(
            FightId::new("f-1"),
            MarketType::KdOverUnder,
            Some(Decimal::from_str("1.5").unwrap()),
        );
        assert_eq!(market.status, MarketStatus::Open);
        assert!(Uuid::from_str(&market.market_id).is_ok());
    }
}
