//! Market, settlement, and execution-key operations.

use crate::domain::{FightId, Market, MarketStatus, MarketType, Settlement, WinningSide};
use crate::error::LedgerError;
use rust_decimal::Decimal;
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

use super::Repository;

impl Repository {
    /// Create a market. At most one market of a given type may exist per
    /// fight; a second is rejected as `DuplicateMarket`.
    pub async fn insert_market(&self, market: &Market) -> Result<(), LedgerError> {
        let result = sqlx::query(
            r#"
            INSERT INTO markets (market_id, fight_id, market_type, line, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&market.market_id)
        .bind(market.fight_id.as_str())
        .bind(market.market_type.as_str())
        .bind(market.line.map(|l| l.to_string()))
        .bind(market.status.as_str())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(self.pool())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if LedgerError::is_unique_violation(&e) => {
                Err(LedgerError::DuplicateMarket(format!(
                    "market of type {} already exists for fight {}",
                    market.market_type, market.fight_id
                )))
            }
            Err(e) => Err(LedgerError::Db(e)),
        }
    }

    pub async fn get_market(&self, market_id: &str) -> Result<Option<Market>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT market_id, fight_id, market_type, line, status FROM markets WHERE market_id = ?",
        )
        .bind(market_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.as_ref().and_then(map_market_row))
    }

    pub async fn query_markets(&self, fight_id: &FightId) -> Result<Vec<Market>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT market_id, fight_id, market_type, line, status
            FROM markets
            WHERE fight_id = ?
            ORDER BY market_type ASC
            "#,
        )
        .bind(fight_id.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().filter_map(map_market_row).collect())
    }

    /// Transition a market's status, guarded by the expected current status.
    /// Returns false when the market was not in the expected state, so races
    /// are visible to the caller instead of silently absorbed.
    pub async fn transition_market_status(
        &self,
        market_id: &str,
        from: MarketStatus,
        to: MarketStatus,
    ) -> Result<bool, sqlx::Error> {
        let updated = sqlx::query(
            "UPDATE markets SET status = ? WHERE market_id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(market_id)
        .bind(from.as_str())
        .execute(self.pool())
        .await?;

        Ok(updated.rows_affected() > 0)
    }

    /// Write a settlement exactly once: the execution key, the settlement
    /// row, and the open→settled status flip all commit in one transaction.
    /// A duplicate call (or a retried partial transaction) trips one of the
    /// UNIQUE constraints or the guarded UPDATE and rolls back whole.
    pub async fn insert_settlement_atomic(
        &self,
        market: &Market,
        settlement: &Settlement,
    ) -> Result<(), LedgerError> {
        let mut tx = self.pool().begin().await?;

        let execution = sqlx::query(
            r#"
            INSERT INTO settlement_executions (execution_key, market_id, executed_at_ms)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(market.execution_key())
        .bind(&market.market_id)
        .bind(settlement.settled_at_ms)
        .execute(&mut *tx)
        .await;

        if let Err(e) = execution {
            return if LedgerError::is_unique_violation(&e) {
                Err(LedgerError::AlreadySettled(format!(
                    "settlement already executed for market {}",
                    market.market_id
                )))
            } else {
                Err(LedgerError::Db(e))
            };
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO settlements (market_id, winning_side, result_payload, settled_at_ms)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&settlement.market_id)
        .bind(settlement.winning_side.as_str())
        .bind(settlement.result_payload.to_string())
        .bind(settlement.settled_at_ms)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            return if LedgerError::is_unique_violation(&e) {
                Err(LedgerError::AlreadySettled(format!(
                    "settlement row already exists for market {}",
                    market.market_id
                )))
            } else {
                Err(LedgerError::Db(e))
            };
        }

        let flipped = sqlx::query(
            "UPDATE markets SET status = 'settled' WHERE market_id = ? AND status = 'open'",
        )
        .bind(&market.market_id)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() != 1 {
            // Not open anymore: a concurrent settle or admin action won.
            return Err(LedgerError::AlreadySettled(format!(
                "market {} is no longer open",
                market.market_id
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_settlement(
        &self,
        market_id: &str,
    ) -> Result<Option<Settlement>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT market_id, winning_side, result_payload, settled_at_ms
            FROM settlements
            WHERE market_id = ?
            "#,
        )
        .bind(market_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| {
            let payload_str: String = r.get("result_payload");
            let result_payload = serde_json::from_str(&payload_str).unwrap_or_else(|e| {
                warn!(market_id, error = %e, "Failed to parse settlement payload, using null");
                serde_json::Value::Null
            });
            let side_str: String = r.get("winning_side");

            Settlement {
                market_id: r.get("market_id"),
                winning_side: parse_winning_side(&side_str),
                result_payload,
                settled_at_ms: r.get("settled_at_ms"),
            }
        }))
    }

    /// True when an execution record exists for the market's idempotency key.
    pub async fn settlement_executed(&self, market: &Market) -> Result<bool, sqlx::Error> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM settlement_executions WHERE execution_key = ?",
        )
        .bind(market.execution_key())
        .fetch_one(self.pool())
        .await?;

        Ok(row.get::<i64, _>("n") > 0)
    }

    pub async fn count_settlements(&self, market_id: &str) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM settlements WHERE market_id = ?")
            .bind(market_id)
            .fetch_one(self.pool())
            .await?;

        Ok(row.get("n"))
    }

    /// Administrative correction: delete the settlement and execution key and
    /// reopen the market, atomically. Returns false if no settlement existed.
    pub async fn void_settlement_atomic(&self, market: &Market) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let deleted = sqlx::query("DELETE FROM settlements WHERE market_id = ?")
            .bind(&market.market_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM settlement_executions WHERE execution_key = ?")
            .bind(market.execution_key())
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE markets SET status = 'open' WHERE market_id = ?")
            .bind(&market.market_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

fn parse_winning_side(s: &str) -> WinningSide {
    match s {
        "red" => WinningSide::Red,
        "blue" => WinningSide::Blue,
        "over" => WinningSide::Over,
        "under" => WinningSide::Under,
        _ => WinningSide::Void,
    }
}

fn map_market_row(row: &sqlx::sqlite::SqliteRow) -> Option<Market> {
    let type_str: String = row.get("market_type");
    let status_str: String = row.get("status");
    let line_str: Option<String> = row.get("line");
    let market_id: String = row.get("market_id");

    let market_type = match MarketType::parse(&type_str) {
        Some(t) => t,
        None => {
            warn!(market_id = %market_id, market_type = %type_str, "Unknown market type row, skipping");
            return None;
        }
    };
    let status = match MarketStatus::parse(&status_str) {
        Some(s) => s,
        None => {
            warn!(market_id = %market_id, status = %status_str, "Unknown market status row, skipping");
            return None;
        }
    };
    let line = line_str.and_then(|s| {
        Decimal::from_str(&s)
            .map_err(|e| {
                warn!(market_id = %market_id, line = %s, error = %e, "Failed to parse market line, ignoring");
                e
            })
            .ok()
    });

    Some(Market {
        market_id,
        fight_id: FightId::new(row.get::<String, _>("fight_id")),
        market_type,
        line,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::super::tests::{setup_test_db, test_fight};
    use super::*;

    async fn open_market(repo: &Repository, market_type: MarketType, line: Option<&str>) -> Market {
        repo.insert_fight(&test_fight("f-1")).await.ok();
        let market = Market::new(
            FightId::new("f-1"),
            market_type,
            line.map(|l| Decimal::from_str(l).unwrap()),
        );
        repo.insert_market(&market).await.unwrap();
        market
    }

    fn settlement_for(market: &Market, side: WinningSide) -> Settlement {
        Settlement {
            market_id: market.market_id.clone(),
            winning_side: side,
            result_payload: serde_json::json!({"actual": 64, "line": "50.5"}),
            settled_at_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_market() {
        let (repo, _temp) = setup_test_db().await;
        let market = open_market(&repo, MarketType::TotalSigStrikes, Some("50.5")).await;

        let loaded = repo.get_market(&market.market_id).await.unwrap().unwrap();
        assert_eq!(loaded, market);
    }

    #[tokio::test]
    async fn test_duplicate_market_type_rejected() {
        let (repo, _temp) = setup_test_db().await;
        open_market(&repo, MarketType::Winner, None).await;

        let dup = Market::new(FightId::new("f-1"), MarketType::Winner, None);
        match repo.insert_market(&dup).await {
            Err(LedgerError::DuplicateMarket(_)) => {}
            other => panic!("expected DuplicateMarket, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_settlement_exactly_once() {
        let (repo, _temp) = setup_test_db().await;
        let market = open_market(&repo, MarketType::KdOverUnder, Some("1.5")).await;

        let settlement = settlement_for(&market, WinningSide::Over);
        repo.insert_settlement_atomic(&market, &settlement)
            .await
            .unwrap();

        match repo.insert_settlement_atomic(&market, &settlement).await {
            Err(LedgerError::AlreadySettled(_)) => {}
            other => panic!("expected AlreadySettled, got {:?}", other),
        }

        assert_eq!(repo.count_settlements(&market.market_id).await.unwrap(), 1);
        let loaded = repo.get_market(&market.market_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MarketStatus::Settled);
        assert!(repo.settlement_executed(&market).await.unwrap());
    }

    #[tokio::test]
    async fn test_settlement_refused_when_not_open() {
        let (repo, _temp) = setup_test_db().await;
        let market = open_market(&repo, MarketType::Winner, None).await;

        assert!(repo
            .transition_market_status(&market.market_id, MarketStatus::Open, MarketStatus::Suspended)
            .await
            .unwrap());

        let settlement = settlement_for(&market, WinningSide::Red);
        match repo.insert_settlement_atomic(&market, &settlement).await {
            Err(LedgerError::AlreadySettled(_)) => {}
            other => panic!("expected AlreadySettled, got {:?}", other),
        }
        // The rollback must leave no settlement or execution behind.
        assert_eq!(repo.count_settlements(&market.market_id).await.unwrap(), 0);
        assert!(!repo.settlement_executed(&market).await.unwrap());
    }

    #[tokio::test]
    async fn test_guarded_transition() {
        let (repo, _temp) = setup_test_db().await;
        let market = open_market(&repo, MarketType::Winner, None).await;

        assert!(!repo
            .transition_market_status(&market.market_id, MarketStatus::Suspended, MarketStatus::Open)
            .await
            .unwrap());
        assert!(repo
            .transition_market_status(&market.market_id, MarketStatus::Open, MarketStatus::Cancelled)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_void_settlement_reopens_market() {
        let (repo, _temp) = setup_test_db().await;
        let market = open_market(&repo, MarketType::KdOverUnder, Some("1.5")).await;

        let settlement = settlement_for(&market, WinningSide::Under);
        repo.insert_settlement_atomic(&market, &settlement)
            .await
            .unwrap();

        assert!(repo.void_settlement_atomic(&market).await.unwrap());
        assert_eq!(repo.count_settlements(&market.market_id).await.unwrap(), 0);
        assert!(!repo.settlement_executed(&market).await.unwrap());
        let loaded = repo.get_market(&market.market_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MarketStatus::Open);

        // Re-settling after the void must succeed.
        repo.insert_settlement_atomic(&market, &settlement)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_void_without_settlement() {
        let (repo, _temp) = setup_test_db().await;
        let market = open_market(&repo, MarketType::Winner, None).await;
        assert!(!repo.void_settlement_atomic(&market).await.unwrap());
    }

    #[tokio::test]
    async fn test_query_markets_by_fight() {
        let (repo, _temp) = setup_test_db().await;
        open_market(&repo, MarketType::Winner, None).await;
        open_market(&repo, MarketType::KdOverUnder, Some("2.5")).await;

        let markets = repo.query_markets(&FightId::new("f-1")).await.unwrap();
        assert_eq!(markets.len(), 2);
    }
}
