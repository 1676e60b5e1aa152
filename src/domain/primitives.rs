//! Domain primitives: FightId, FighterId, Corner, Fight.

use serde::{Deserialize, Serialize};

/// Default round length in seconds when a fight does not override it.
pub const DEFAULT_ROUND_DURATION_SECS: u32 = 300;

/// Opaque fight identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FightId(pub String);

impl FightId {
    pub fn new(id: impl Into<String>) -> Self {
        FightId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FightId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque fighter identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FighterId(pub String);

impl FighterId {
    pub fn new(id: impl Into<String>) -> Self {
        FighterId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FighterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the two competitors, or neither (round markers, referee actions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    Red,
    Blue,
    Neutral,
}

impl Corner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Corner::Red => "red",
            Corner::Blue => "blue",
            Corner::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Corner> {
        match s {
            "red" => Some(Corner::Red),
            "blue" => Some(Corner::Blue),
            "neutral" => Some(Corner::Neutral),
            _ => None,
        }
    }
}

impl std::fmt::Display for Corner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fight registration row: fighters, round length, and (once known) the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fight {
    pub fight_id: FightId,
    pub red_fighter: FighterId,
    pub blue_fighter: FighterId,
    /// Round length in seconds; configurable per fight (amateur bouts,
    /// title-fight extensions) rather than a global constant.
    pub round_duration_secs: u32,
    pub result: Option<crate::domain::FightResult>,
}

impl Fight {
    /// Corner the given fighter occupies in this fight, if they are in it.
    pub fn corner_of(&self, fighter: &FighterId) -> Option<Corner> {
        if &self.red_fighter == fighter {
            Some(Corner::Red)
        } else if &self.blue_fighter == fighter {
            Some(Corner::Blue)
        } else {
            None
        }
    }
}
