//! Deterministic derivation engines.
//!
//! Everything in this module is a pure function over ledger events and
//! already-loaded rows: control-time resolution, the overlap consistency
//! check, stat aggregation, bridge synthesis, settlement evaluation, and
//! fantasy scoring. Persistence and gating live elsewhere.

pub mod aggregate;
pub mod bridge;
pub mod control;
pub mod fantasy;
pub mod settlement;

pub use aggregate::{aggregate, aggregate_fight, CornerStats, FightTotals, RoundStats};
pub use bridge::{generate_events, CornerSnapshot, RoundSnapshot};
pub use control::{resolve_control, validate_no_overlap, ControlResolution, OverlapReport};
pub use fantasy::{score, BreakdownLine, FantasyScore, ScoringError};
pub use settlement::{evaluate_market, EvaluationError, SettlementOutcome};
