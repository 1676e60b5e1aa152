//! Market lifecycle and settlement orchestration.
//!
//! Creation is gated on the `markets` component and settlement on
//! `settlement`. Administrative corrections (reopen, cancel, void) are not
//! gated: they are the recovery path an operator uses while switches are off.

use crate::db::Repository;
use crate::domain::{FightId, Market, MarketStatus, MarketType, Settlement};
use crate::engine::{aggregate_fight, evaluate_market, validate_no_overlap};
use crate::error::LedgerError;
use crate::ops::{AuditLog, AuditStatus, Component, SystemStatusProvider};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

pub struct MarketService {
    repo: Arc<Repository>,
    status: Arc<dyn SystemStatusProvider>,
    audit: Arc<AuditLog>,
}

impl MarketService {
    pub fn new(
        repo: Arc<Repository>,
        status: Arc<dyn SystemStatusProvider>,
        audit: Arc<AuditLog>,
    ) -> Self {
        MarketService {
            repo,
            status,
            audit,
        }
    }

    /// Open a market on a fight. One market per (fight, type).
    pub async fn create_market(
        &self,
        fight_id: &FightId,
        market_type: MarketType,
        line: Option<Decimal>,
        actor: Option<&str>,
    ) -> Result<Market, LedgerError> {
        let resource = format!("fight:{}", fight_id);
        super::gate(
            self.status.as_ref(),
            self.audit.as_ref(),
            Component::Markets,
            "market_create",
            &resource,
            actor,
        )
        .await?;

        if market_type.requires_line() && line.is_none() {
            return Err(LedgerError::Validation(format!(
                "market type {} requires a line",
                market_type
            )));
        }
        if !market_type.requires_line() && line.is_some() {
            return Err(LedgerError::Validation(
                "winner market does not take a line".to_string(),
            ));
        }
        if self.repo.get_fight(fight_id).await?.is_none() {
            return Err(LedgerError::NotFound(format!("fight {}", fight_id)));
        }

        let market = Market::new(fight_id.clone(), market_type, line);
        self.repo.insert_market(&market).await?;

        self.audit
            .record(
                "market_create",
                actor,
                "create",
                &format!("market:{}", market.market_id),
                json!({
                    "fightId": fight_id.as_str(),
                    "marketType": market_type.as_str(),
                    "line": line.map(|l| l.to_string()),
                }),
                AuditStatus::Success,
            )
            .await?;

        Ok(market)
    }

    /// Settle an open market exactly once.
    ///
    /// A market whose evaluator cannot complete (missing result, missing
    /// line, unsupported type) is moved to suspended and needs an audited
    /// reopen after the inputs are corrected.
    pub async fn settle(
        &self,
        market_id: &str,
        actor: Option<&str>,
    ) -> Result<Settlement, LedgerError> {
        let resource = format!("market:{}", market_id);
        super::gate(
            self.status.as_ref(),
            self.audit.as_ref(),
            Component::Settlement,
            "market_settle",
            &resource,
            actor,
        )
        .await?;

        let result = self.evaluate_and_settle(market_id).await;
        match &result {
            Ok(settlement) => {
                self.audit
                    .record(
                        "market_settle",
                        actor,
                        "settle",
                        &resource,
                        json!({
                            "winningSide": settlement.winning_side.as_str(),
                            "resultPayload": settlement.result_payload,
                        }),
                        AuditStatus::Success,
                    )
                    .await?;
            }
            Err(e) => {
                self.audit
                    .record_best_effort(
                        "market_settle",
                        actor,
                        "settle",
                        &resource,
                        json!({"error": e.to_string()}),
                        AuditStatus::Failure,
                    )
                    .await;
            }
        }
        result
    }

    async fn evaluate_and_settle(&self, market_id: &str) -> Result<Settlement, LedgerError> {
        let market = self
            .repo
            .get_market(market_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("market {}", market_id)))?;

        match market.status {
            MarketStatus::Open => {}
            MarketStatus::Settled => {
                return Err(LedgerError::AlreadySettled(format!(
                    "market {} is already settled",
                    market_id
                )))
            }
            MarketStatus::Suspended => {
                return Err(LedgerError::SettlementFailed(format!(
                    "market {} is suspended and must be reopened first",
                    market_id
                )))
            }
            MarketStatus::Cancelled => {
                return Err(LedgerError::SettlementFailed(format!(
                    "market {} is cancelled",
                    market_id
                )))
            }
        }

        let fight = self
            .repo
            .get_fight(&market.fight_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("fight {}", market.fight_id)))?;
        let events = self.repo.query_events(&market.fight_id, None, None).await?;
        let totals = aggregate_fight(&events, fight.round_duration_secs);

        // Control overlap never blocks settlement, but it is surfaced in the
        // frozen payload so a reviewer can see the inputs were flagged.
        let flagged_rounds = overlap_flagged_rounds(&events, fight.round_duration_secs);
        if !flagged_rounds.is_empty() {
            warn!(
                market_id,
                fight_id = %market.fight_id,
                rounds = ?flagged_rounds,
                "Settling market over rounds with control overlap"
            );
        }

        match evaluate_market(&market, &fight, &totals) {
            Ok(outcome) => {
                let mut result_payload = outcome.result_payload;
                if !flagged_rounds.is_empty() {
                    if let Some(object) = result_payload.as_object_mut() {
                        object.insert(
                            "controlOverlapRounds".to_string(),
                            json!(flagged_rounds),
                        );
                    }
                }
                let settlement = Settlement {
                    market_id: market.market_id.clone(),
                    winning_side: outcome.winning_side,
                    result_payload,
                    settled_at_ms: chrono::Utc::now().timestamp_millis(),
                };
                self.repo
                    .insert_settlement_atomic(&market, &settlement)
                    .await?;
                Ok(settlement)
            }
            Err(e) => {
                self.repo
                    .transition_market_status(market_id, MarketStatus::Open, MarketStatus::Suspended)
                    .await?;
                Err(LedgerError::SettlementFailed(e.to_string()))
            }
        }
    }

    /// Reopen a suspended market after its inputs have been corrected.
    pub async fn reopen(&self, market_id: &str, actor: Option<&str>) -> Result<(), LedgerError> {
        if self.repo.get_market(market_id).await?.is_none() {
            return Err(LedgerError::NotFound(format!("market {}", market_id)));
        }
        if !self
            .repo
            .transition_market_status(market_id, MarketStatus::Suspended, MarketStatus::Open)
            .await?
        {
            return Err(LedgerError::Conflict(format!(
                "market {} is not suspended",
                market_id
            )));
        }

        self.audit
            .record(
                "market_reopen",
                actor,
                "reopen",
                &format!("market:{}", market_id),
                json!({}),
                AuditStatus::Success,
            )
            .await?;
        Ok(())
    }

    /// Cancel an open or suspended market. Settled markets cannot be
    /// cancelled; their settlement must be voided instead.
    pub async fn cancel(&self, market_id: &str, actor: Option<&str>) -> Result<(), LedgerError> {
        let market = self
            .repo
            .get_market(market_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("market {}", market_id)))?;
        if market.status == MarketStatus::Settled {
            return Err(LedgerError::AlreadySettled(format!(
                "market {} is settled, void the settlement instead",
                market_id
            )));
        }

        let cancelled = self
            .repo
            .transition_market_status(market_id, MarketStatus::Open, MarketStatus::Cancelled)
            .await?
            || self
                .repo
                .transition_market_status(
                    market_id,
                    MarketStatus::Suspended,
                    MarketStatus::Cancelled,
                )
                .await?;
        if !cancelled {
            return Err(LedgerError::Conflict(format!(
                "market {} is not open or suspended",
                market_id
            )));
        }

        self.audit
            .record(
                "market_cancel",
                actor,
                "cancel",
                &format!("market:{}", market_id),
                json!({}),
                AuditStatus::Success,
            )
            .await?;
        Ok(())
    }

    /// Void a settlement: delete it, release the execution key, and reopen
    /// the market so a corrected settlement can run.
    pub async fn void_settlement(
        &self,
        market_id: &str,
        actor: Option<&str>,
    ) -> Result<(), LedgerError> {
        let market = self
            .repo
            .get_market(market_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("market {}", market_id)))?;

        if !self.repo.void_settlement_atomic(&market).await? {
            return Err(LedgerError::NotFound(format!(
                "no settlement for market {}",
                market_id
            )));
        }

        self.audit
            .record(
                "settlement_void",
                actor,
                "void",
                &format!("market:{}", market_id),
                json!({"fightId": market.fight_id.as_str()}),
                AuditStatus::Success,
            )
            .await?;
        Ok(())
    }
}

fn overlap_flagged_rounds(
    events: &[crate::domain::FightEvent],
    round_duration: u32,
) -> Vec<u32> {
    let mut rounds: Vec<u32> = events.iter().map(|e| e.round).collect();
    rounds.sort_unstable();
    rounds.dedup();

    rounds
        .into_iter()
        .filter(|&round| {
            let round_events: Vec<_> = events
                .iter()
                .filter(|e| e.round == round)
                .cloned()
                .collect();
            validate_no_overlap(&round_events, round_duration).has_overlap
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_db, NewEvent};
    use crate::domain::{Corner, EventDetail, EventKind, Fight, FightResult, FighterId, WinMethod, WinningSide};
    use crate::ops::DbSystemStatus;
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn setup() -> (MarketService, Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Arc::new(Repository::new(pool));
        let status = Arc::new(DbSystemStatus::new(repo.clone()));
        let audit = Arc::new(AuditLog::new(repo.clone(), "system"));
        (
            MarketService::new(repo.clone(), status, audit),
            repo,
            temp_dir,
        )
    }

    async fn seed_fight(repo: &Repository, fight_id: &str) {
        repo.insert_fight(&Fight {
            fight_id: FightId::new(fight_id),
            red_fighter: FighterId::new("red-1"),
            blue_fighter: FighterId::new("blue-1"),
            round_duration_secs: 300,
            result: None,
        })
        .await
        .unwrap();
    }

    async fn seed_result(repo: &Repository, fight_id: &str, winner: Corner) {
        repo.record_fight_result(
            &FightId::new(fight_id),
            &FightResult {
                winner,
                method: WinMethod::Decision,
                ending_round: 3,
            },
        )
        .await
        .unwrap();
    }

    async fn seed_sig_strikes(repo: &Repository, fight_id: &str, corner: Corner, n: u32) {
        for i in 0..n {
            repo.append_event(&NewEvent {
                fight_id: FightId::new(fight_id),
                round: 1,
                second_in_round: (i % 300) + 1,
                kind: EventKind::StrLand,
                corner,
                detail: EventDetail::StrLand {
                    significant: true,
                    target: None,
                },
                generated: false,
            })
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_create_market_validates_line() {
        let (service, repo, _temp) = setup().await;
        seed_fight(&repo, "f-1").await;

        let missing_line = service
            .create_market(&FightId::new("f-1"), MarketType::KdOverUnder, None, None)
            .await;
        assert!(matches!(missing_line, Err(LedgerError::Validation(_))));

        let extra_line = service
            .create_market(
                &FightId::new("f-1"),
                MarketType::Winner,
                Some(Decimal::from_str("1.5").unwrap()),
                None,
            )
            .await;
        assert!(matches!(extra_line, Err(LedgerError::Validation(_))));

        service
            .create_market(&FightId::new("f-1"), MarketType::Winner, None, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_settle_winner_market() {
        let (service, repo, _temp) = setup().await;
        seed_fight(&repo, "f-1").await;
        seed_result(&repo, "f-1", Corner::Red).await;

        let market = service
            .create_market(&FightId::new("f-1"), MarketType::Winner, None, None)
            .await
            .unwrap();
        let settlement = service.settle(&market.market_id, None).await.unwrap();
        assert_eq!(settlement.winning_side, WinningSide::Red);

        let loaded = repo.get_market(&market.market_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MarketStatus::Settled);
    }

    #[tokio::test]
    async fn test_settle_exactly_once() {
        let (service, repo, _temp) = setup().await;
        seed_fight(&repo, "f-1").await;
        seed_result(&repo, "f-1", Corner::Blue).await;

        let market = service
            .create_market(&FightId::new("f-1"), MarketType::Winner, None, None)
            .await
            .unwrap();
        service.settle(&market.market_id, None).await.unwrap();

        let second = service.settle(&market.market_id, None).await;
        assert!(matches!(second, Err(LedgerError::AlreadySettled(_))));
        assert_eq!(repo.count_settlements(&market.market_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_settle_without_result_suspends() {
        let (service, repo, _temp) = setup().await;
        seed_fight(&repo, "f-1").await;

        let market = service
            .create_market(&FightId::new("f-1"), MarketType::Winner, None, None)
            .await
            .unwrap();
        let result = service.settle(&market.market_id, None).await;
        assert!(matches!(result, Err(LedgerError::SettlementFailed(_))));

        let loaded = repo.get_market(&market.market_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MarketStatus::Suspended);

        // Reopen after the result lands, then settle cleanly.
        seed_result(&repo, "f-1", Corner::Red).await;
        service.reopen(&market.market_id, None).await.unwrap();
        let settlement = service.settle(&market.market_id, None).await.unwrap();
        assert_eq!(settlement.winning_side, WinningSide::Red);
    }

    #[tokio::test]
    async fn test_settle_sig_strikes_over() {
        let (service, repo, _temp) = setup().await;
        seed_fight(&repo, "f-1").await;
        seed_sig_strikes(&repo, "f-1", Corner::Red, 40).await;
        seed_sig_strikes(&repo, "f-1", Corner::Blue, 24).await;

        let market = service
            .create_market(
                &FightId::new("f-1"),
                MarketType::TotalSigStrikes,
                Some(Decimal::from_str("50.5").unwrap()),
                None,
            )
            .await
            .unwrap();
        let settlement = service.settle(&market.market_id, None).await.unwrap();
        assert_eq!(settlement.winning_side, WinningSide::Over);
        assert_eq!(settlement.result_payload["actual"], 64);
    }

    #[tokio::test]
    async fn test_unsupported_market_type_suspends() {
        let (service, repo, _temp) = setup().await;
        seed_fight(&repo, "f-1").await;

        let market = service
            .create_market(
                &FightId::new("f-1"),
                MarketType::SubAttOverUnder,
                Some(Decimal::from_str("1.5").unwrap()),
                None,
            )
            .await
            .unwrap();
        let result = service.settle(&market.market_id, None).await;
        assert!(matches!(result, Err(LedgerError::SettlementFailed(_))));

        let loaded = repo.get_market(&market.market_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MarketStatus::Suspended);
        assert_eq!(repo.count_settlements(&market.market_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_kill_switch_blocks_settlement() {
        let (service, repo, _temp) = setup().await;
        seed_fight(&repo, "f-1").await;
        seed_result(&repo, "f-1", Corner::Red).await;
        let market = service
            .create_market(&FightId::new("f-1"), MarketType::Winner, None, None)
            .await
            .unwrap();

        repo.set_component_status("settlement", "emergency_stop", Some("incident"))
            .await
            .unwrap();
        let result = service.settle(&market.market_id, None).await;
        assert!(matches!(result, Err(LedgerError::Unavailable { .. })));
        assert_eq!(repo.count_settlements(&market.market_id).await.unwrap(), 0);

        // The market stays open for when the switch comes back.
        let loaded = repo.get_market(&market.market_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MarketStatus::Open);
    }

    #[tokio::test]
    async fn test_void_then_resettle() {
        let (service, repo, _temp) = setup().await;
        seed_fight(&repo, "f-1").await;
        seed_result(&repo, "f-1", Corner::Red).await;
        let market = service
            .create_market(&FightId::new("f-1"), MarketType::Winner, None, None)
            .await
            .unwrap();
        service.settle(&market.market_id, None).await.unwrap();

        service
            .void_settlement(&market.market_id, Some("ops-admin"))
            .await
            .unwrap();
        assert_eq!(repo.count_settlements(&market.market_id).await.unwrap(), 0);

        // Corrected result, then a fresh settlement.
        seed_result(&repo, "f-1", Corner::Blue).await;
        let settlement = service.settle(&market.market_id, None).await.unwrap();
        assert_eq!(settlement.winning_side, WinningSide::Blue);
    }

    #[tokio::test]
    async fn test_cancel_settled_market_rejected() {
        let (service, repo, _temp) = setup().await;
        seed_fight(&repo, "f-1").await;
        seed_result(&repo, "f-1", Corner::Red).await;
        let market = service
            .create_market(&FightId::new("f-1"), MarketType::Winner, None, None)
            .await
            .unwrap();
        service.settle(&market.market_id, None).await.unwrap();

        let result = service.cancel(&market.market_id, None).await;
        assert!(matches!(result, Err(LedgerError::AlreadySettled(_))));
    }

    #[tokio::test]
    async fn test_overlap_flag_in_settlement_payload() {
        let (service, repo, _temp) = setup().await;
        seed_fight(&repo, "f-1").await;
        seed_result(&repo, "f-1", Corner::Red).await;

        // RED 30-90 and BLUE 60-120 both controlling.
        for (corner, kind, second) in [
            (Corner::Red, EventKind::CtrlStart, 30),
            (Corner::Blue, EventKind::CtrlStart, 60),
            (Corner::Red, EventKind::CtrlEnd, 90),
            (Corner::Blue, EventKind::CtrlEnd, 120),
        ] {
            let detail = match kind {
                EventKind::CtrlStart => EventDetail::CtrlStart { position: None },
                _ => EventDetail::CtrlEnd,
            };
            repo.append_event(&NewEvent {
                fight_id: FightId::new("f-1"),
                round: 1,
                second_in_round: second,
                kind,
                corner,
                detail,
                generated: false,
            })
            .await
            .unwrap();
        }

        let market = service
            .create_market(&FightId::new("f-1"), MarketType::Winner, None, None)
            .await
            .unwrap();
        let settlement = service.settle(&market.market_id, None).await.unwrap();
        assert_eq!(settlement.result_payload["controlOverlapRounds"], serde_json::json!([1]));
    }
}
