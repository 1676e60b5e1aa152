//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `events.rs` - Append-only fight-event ledger operations
//! - `markets.rs` - Market, settlement, and execution-key operations
//! - `fantasy.rs` - Scoring profiles and the fantasy stat cache

mod events;
mod fantasy;
mod markets;

pub use events::NewEvent;
pub use fantasy::FantasyStatRow;

use crate::domain::{Corner, Fight, FightId, FightResult, FighterId, WinMethod};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::warn;

/// A single audit trail entry. Append-only, never mutated or deleted
/// programmatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub time_ms: i64,
    pub event_type: String,
    pub actor: String,
    pub action: String,
    pub resource: String,
    pub details: serde_json::Value,
    pub status: String,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Round trip through the pool, used by the readiness probe.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // Fight operations
    // =========================================================================

    /// Register a fight. Returns false if the fight already exists.
    pub async fn insert_fight(&self, fight: &Fight) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO fights (fight_id, red_fighter, blue_fighter, round_duration_secs, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(fight_id) DO NOTHING
            "#,
        )
        .bind(fight.fight_id.as_str())
        .bind(fight.red_fighter.as_str())
        .bind(fight.blue_fighter.as_str())
        .bind(fight.round_duration_secs as i64)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get a fight by id.
    pub async fn get_fight(&self, fight_id: &FightId) -> Result<Option<Fight>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT fight_id, red_fighter, blue_fighter, round_duration_secs,
                   result_winner, result_method, result_ending_round
            FROM fights
            WHERE fight_id = ?
            "#,
        )
        .bind(fight_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| map_fight_row(&r)))
    }

    /// Record (or correct) the official result of a fight.
    pub async fn record_fight_result(
        &self,
        fight_id: &FightId,
        result: &FightResult,
    ) -> Result<bool, sqlx::Error> {
        let updated = sqlx::query(
            r#"
            UPDATE fights
            SET result_winner = ?, result_method = ?, result_ending_round = ?
            WHERE fight_id = ?
            "#,
        )
        .bind(result.winner.as_str())
        .bind(result.method.as_str())
        .bind(result.ending_round as i64)
        .bind(fight_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected() > 0)
    }

    // =========================================================================
    // System status (kill-switch) operations
    // =========================================================================

    /// Read the status row for a component. None for an ungoverned component.
    pub async fn get_component_status(
        &self,
        component: &str,
    ) -> Result<Option<(String, Option<String>)>, sqlx::Error> {
        let row = sqlx::query("SELECT status, reason FROM system_status WHERE component = ?")
            .bind(component)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| (r.get("status"), r.get("reason"))))
    }

    /// Set a component's status. Returns false for an ungoverned component;
    /// the registry is seeded at deploy time and rows are never added at runtime.
    pub async fn set_component_status(
        &self,
        component: &str,
        status: &str,
        reason: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let updated = sqlx::query(
            r#"
            UPDATE system_status
            SET status = ?, reason = ?, updated_at_ms = ?
            WHERE component = ?
            "#,
        )
        .bind(status)
        .bind(reason)
        .bind(chrono::Utc::now().timestamp_millis())
        .bind(component)
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected() > 0)
    }

    // =========================================================================
    // Audit trail operations
    // =========================================================================

    /// Append an audit entry. The trail has no update or delete path.
    pub async fn insert_audit(&self, entry: &AuditEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (time_ms, event_type, actor, action, resource, details, status)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.time_ms)
        .bind(&entry.event_type)
        .bind(&entry.actor)
        .bind(&entry.action)
        .bind(&entry.resource)
        .bind(entry.details.to_string())
        .bind(&entry.status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Query audit entries, optionally narrowed to one resource, oldest first.
    pub async fn query_audit(
        &self,
        resource: Option<&str>,
    ) -> Result<Vec<AuditEntry>, sqlx::Error> {
        let rows = if let Some(resource) = resource {
            sqlx::query(
                r#"
                SELECT time_ms, event_type, actor, action, resource, details, status
                FROM audit_log
                WHERE resource = ?
                ORDER BY id ASC
                "#,
            )
            .bind(resource)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                SELECT time_ms, event_type, actor, action, resource, details, status
                FROM audit_log
                ORDER BY id ASC
                "#,
            )
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows
            .iter()
            .map(|row| {
                let details_str: String = row.get("details");
                let details = serde_json::from_str(&details_str).unwrap_or_else(|e| {
                    warn!(error = %e, "Failed to parse audit details JSON, using null");
                    serde_json::Value::Null
                });
                AuditEntry {
                    time_ms: row.get("time_ms"),
                    event_type: row.get("event_type"),
                    actor: row.get("actor"),
                    action: row.get("action"),
                    resource: row.get("resource"),
                    details,
                    status: row.get("status"),
                }
            })
            .collect())
    }
}

fn map_fight_row(row: &sqlx::sqlite::SqliteRow) -> Fight {
    let winner: Option<String> = row.get("result_winner");
    let method: Option<String> = row.get("result_method");
    let ending_round: Option<i64> = row.get("result_ending_round");

    let result = match (winner, method, ending_round) {
        (Some(w), Some(m), Some(r)) => {
            let winner = Corner::parse(&w);
            let method = WinMethod::parse(&m);
            match (winner, method) {
                (Some(winner), Some(method)) => Some(FightResult {
                    winner,
                    method,
                    ending_round: r as u32,
                }),
                _ => {
                    warn!(winner = %w, method = %m, "Unparseable fight result row, treating as no result");
                    None
                }
            }
        }
        _ => None,
    };

    Fight {
        fight_id: FightId::new(row.get::<String, _>("fight_id")),
        red_fighter: FighterId::new(row.get::<String, _>("red_fighter")),
        blue_fighter: FighterId::new(row.get::<String, _>("blue_fighter")),
        round_duration_secs: row.get::<i64, _>("round_duration_secs") as u32,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use tempfile::TempDir;

    pub(crate) async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    pub(crate) fn test_fight(fight_id: &str) -> Fight {
        Fight {
            fight_id: FightId::new(fight_id),
            red_fighter: FighterId::new("red-1"),
            blue_fighter: FighterId::new("blue-1"),
            round_duration_secs: 300,
            result: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_fight() {
        let (repo, _temp) = setup_test_db().await;

        let fight = test_fight("f-1");
        assert!(repo.insert_fight(&fight).await.unwrap());

        let loaded = repo.get_fight(&fight.fight_id).await.unwrap().unwrap();
        assert_eq!(loaded, fight);
    }

    #[tokio::test]
    async fn test_insert_duplicate_fight_ignored() {
        let (repo, _temp) = setup_test_db().await;

        let fight = test_fight("f-1");
        assert!(repo.insert_fight(&fight).await.unwrap());
        assert!(!repo.insert_fight(&fight).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_and_read_result() {
        let (repo, _temp) = setup_test_db().await;

        let fight = test_fight("f-1");
        repo.insert_fight(&fight).await.unwrap();

        let result = FightResult {
            winner: Corner::Red,
            method: WinMethod::Tko,
            ending_round: 2,
        };
        assert!(repo
            .record_fight_result(&fight.fight_id, &result)
            .await
            .unwrap());

        let loaded = repo.get_fight(&fight.fight_id).await.unwrap().unwrap();
        assert_eq!(loaded.result, Some(result));
    }

    #[tokio::test]
    async fn test_record_result_unknown_fight() {
        let (repo, _temp) = setup_test_db().await;

        let result = FightResult {
            winner: Corner::Red,
            method: WinMethod::Decision,
            ending_round: 3,
        };
        assert!(!repo
            .record_fight_result(&FightId::new("missing"), &result)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_component_status_read_and_set() {
        let (repo, _temp) = setup_test_db().await;

        let (status, reason) = repo.get_component_status("api").await.unwrap().unwrap();
        assert_eq!(status, "active");
        assert_eq!(reason, None);

        assert!(repo
            .set_component_status("api", "emergency_stop", Some("incident 42"))
            .await
            .unwrap());

        let (status, reason) = repo.get_component_status("api").await.unwrap().unwrap();
        assert_eq!(status, "emergency_stop");
        assert_eq!(reason.as_deref(), Some("incident 42"));
    }

    #[tokio::test]
    async fn test_set_status_unknown_component() {
        let (repo, _temp) = setup_test_db().await;
        assert!(!repo
            .set_component_status("teleporter", "active", None)
            .await
            .unwrap());
        assert!(repo
            .get_component_status("teleporter")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_audit_append_and_query() {
        let (repo, _temp) = setup_test_db().await;

        let entry = AuditEntry {
            time_ms: 1000,
            event_type: "event_append".to_string(),
            actor: "system".to_string(),
            action: "append".to_string(),
            resource: "fight:f-1".to_string(),
            details: serde_json::json!({"seq": 1}),
            status: "success".to_string(),
        };
        repo.insert_audit(&entry).await.unwrap();

        let all = repo.query_audit(None).await.unwrap();
        assert_eq!(all, vec![entry.clone()]);

        let by_resource = repo.query_audit(Some("fight:f-1")).await.unwrap();
        assert_eq!(by_resource.len(), 1);
        assert!(repo.query_audit(Some("fight:f-2")).await.unwrap().is_empty());
    }
}
