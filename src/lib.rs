pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ops;
pub mod pipeline;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Corner, EventDetail, EventKind, Fight, FightEvent, FightId, FightResult, FighterId, Market,
    MarketStatus, MarketType, ScoringProfile, Settlement, WinMethod, WinningSide,
};
pub use error::LedgerError;
