//! Domain types and determinism layer for the fight-event ledger.
//!
//! This module provides:
//! - Domain primitives: FightId, FighterId, Corner, Fight
//! - The closed event vocabulary and typed per-kind detail variants
//! - Event label normalization for legacy producers
//! - Market, settlement, fight result, and scoring profile types

pub mod event;
pub mod market;
pub mod normalize;
pub mod primitives;
pub mod profile;
pub mod result;

pub use event::{EventDetail, EventKind, FightEvent, StrikeTarget};
pub use market::{Market, MarketStatus, MarketType, Settlement, WinningSide};
pub use normalize::normalize;
pub use primitives::{Corner, Fight, FightId, FighterId, DEFAULT_ROUND_DURATION_SECS};
pub use profile::{ScoringBonuses, ScoringProfile, ScoringWeights};
pub use result::{FightResult, WinMethod};
