//! Official fight result.

use crate::domain::Corner;
use serde::{Deserialize, Serialize};

/// How the fight was won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinMethod {
    Ko,
    Tko,
    Submission,
    Decision,
    Draw,
    NoContest,
}

impl WinMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            WinMethod::Ko => "ko",
            WinMethod::Tko => "tko",
            WinMethod::Submission => "submission",
            WinMethod::Decision => "decision",
            WinMethod::Draw => "draw",
            WinMethod::NoContest => "no_contest",
        }
    }

    pub fn parse(s: &str) -> Option<WinMethod> {
        match s {
            "ko" => Some(WinMethod::Ko),
            "tko" => Some(WinMethod::Tko),
            "submission" => Some(WinMethod::Submission),
            "decision" => Some(WinMethod::Decision),
            "draw" => Some(WinMethod::Draw),
            "no_contest" => Some(WinMethod::NoContest),
            _ => None,
        }
    }

    /// A finish ends the fight before the judges: KO, TKO, or submission.
    pub fn is_finish(&self) -> bool {
        matches!(self, WinMethod::Ko | WinMethod::Tko | WinMethod::Submission)
    }
}

impl std::fmt::Display for WinMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The recorded outcome of a fight. `winner` is Neutral for draws and
/// no-contests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FightResult {
    pub winner: Corner,
    pub method: WinMethod,
    /// Round in which the fight ended.
    pub ending_round: u32,
}
