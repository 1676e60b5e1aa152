//! Append-only fight-event ledger operations.

use crate::domain::{Corner, EventDetail, EventKind, FightEvent, FightId};
use crate::error::LedgerError;
use sqlx::Row;
use tracing::warn;

use super::Repository;

/// An event prepared for insertion: everything but the sequence number,
/// which is assigned by the ledger at insertion time and never supplied
/// externally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub fight_id: FightId,
    pub round: u32,
    pub second_in_round: u32,
    pub kind: EventKind,
    pub corner: Corner,
    pub detail: EventDetail,
    pub generated: bool,
}

impl Repository {
    /// Append one event to the fight's ledger, assigning the next sequence
    /// number atomically with the insert.
    ///
    /// The MAX(seq)+1 read and the insert share one transaction; a losing
    /// race surfaces as a UNIQUE(fight_id, seq) violation and is returned as
    /// `LedgerError::Conflict` for the caller to retry, never silently
    /// resolved.
    pub async fn append_event(&self, event: &NewEvent) -> Result<i64, LedgerError> {
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query(
            "SELECT COALESCE(MAX(seq), 0) AS max_seq FROM fight_events WHERE fight_id = ?",
        )
        .bind(event.fight_id.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let seq: i64 = row.get::<i64, _>("max_seq") + 1;

        let detail_json = serde_json::to_string(&event.detail)
            .map_err(|e| LedgerError::Validation(format!("unserializable detail: {}", e)))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO fight_events
            (fight_id, seq, round, second_in_round, kind, corner, detail, generated, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.fight_id.as_str())
        .bind(seq)
        .bind(event.round as i64)
        .bind(event.second_in_round as i64)
        .bind(event.kind.as_str())
        .bind(event.corner.as_str())
        .bind(&detail_json)
        .bind(event.generated as i64)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {
                tx.commit().await?;
                Ok(seq)
            }
            Err(e) if LedgerError::is_unique_violation(&e) => Err(LedgerError::Conflict(format!(
                "seq {} for fight {} already taken",
                seq, event.fight_id
            ))),
            Err(e) => Err(LedgerError::Db(e)),
        }
    }

    /// Insert a batch of events (bridge backfill) in one transaction,
    /// assigning consecutive sequence numbers. All-or-nothing.
    pub async fn append_events_batch(&self, events: &[NewEvent]) -> Result<usize, LedgerError> {
        if events.is_empty() {
            return Ok(0);
        }

        let fight_id = &events[0].fight_id;
        let created_at = chrono::Utc::now().timestamp_millis();
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query(
            "SELECT COALESCE(MAX(seq), 0) AS max_seq FROM fight_events WHERE fight_id = ?",
        )
        .bind(fight_id.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let mut seq: i64 = row.get("max_seq");

        for event in events {
            seq += 1;
            let detail_json = serde_json::to_string(&event.detail)
                .map_err(|e| LedgerError::Validation(format!("unserializable detail: {}", e)))?;

            let inserted = sqlx::query(
                r#"
                INSERT INTO fight_events
                (fight_id, seq, round, second_in_round, kind, corner, detail, generated, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(event.fight_id.as_str())
            .bind(seq)
            .bind(event.round as i64)
            .bind(event.second_in_round as i64)
            .bind(event.kind.as_str())
            .bind(event.corner.as_str())
            .bind(&detail_json)
            .bind(event.generated as i64)
            .bind(created_at)
            .execute(&mut *tx)
            .await;

            if let Err(e) = inserted {
                return if LedgerError::is_unique_violation(&e) {
                    Err(LedgerError::Conflict(format!(
                        "seq {} for fight {} already taken",
                        seq, fight_id
                    )))
                } else {
                    Err(LedgerError::Db(e))
                };
            }
        }

        tx.commit().await?;
        Ok(events.len())
    }

    /// Query a fight's events in total (seq) order, optionally narrowed by
    /// round and kind.
    pub async fn query_events(
        &self,
        fight_id: &FightId,
        round: Option<u32>,
        kind: Option<EventKind>,
    ) -> Result<Vec<FightEvent>, sqlx::Error> {
        let mut sql = String::from(
            "SELECT fight_id, seq, round, second_in_round, kind, corner, detail, generated \
             FROM fight_events WHERE fight_id = ?",
        );
        if round.is_some() {
            sql.push_str(" AND round = ?");
        }
        if kind.is_some() {
            sql.push_str(" AND kind = ?");
        }
        sql.push_str(" ORDER BY seq ASC");

        let mut query = sqlx::query(&sql).bind(fight_id.as_str());
        if let Some(round) = round {
            query = query.bind(round as i64);
        }
        if let Some(kind) = kind {
            query = query.bind(kind.as_str());
        }

        let rows = query.fetch_all(self.pool()).await?;
        Ok(rows.iter().filter_map(map_event_row).collect())
    }

    /// Number of events already recorded for a fight round, organic or
    /// generated. The bridge refuses to run against a non-empty round.
    pub async fn count_round_events(
        &self,
        fight_id: &FightId,
        round: u32,
    ) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM fight_events WHERE fight_id = ? AND round = ?",
        )
        .bind(fight_id.as_str())
        .bind(round as i64)
        .fetch_one(self.pool())
        .await?;

        Ok(row.get("n"))
    }
}

fn map_event_row(row: &sqlx::sqlite::SqliteRow) -> Option<FightEvent> {
    let kind_str: String = row.get("kind");
    let corner_str: String = row.get("corner");
    let detail_str: String = row.get("detail");
    let seq: i64 = row.get("seq");

    let kind = match EventKind::parse(&kind_str) {
        Some(kind) => kind,
        None => {
            warn!(seq, kind = %kind_str, "Unknown event kind in ledger row, skipping");
            return None;
        }
    };
    let corner = match Corner::parse(&corner_str) {
        Some(corner) => corner,
        None => {
            warn!(seq, corner = %corner_str, "Unknown corner in ledger row, skipping");
            return None;
        }
    };
    let detail = serde_json::from_str(&detail_str).unwrap_or_else(|e| {
        warn!(seq, error = %e, "Failed to parse event detail, using kind default");
        EventDetail::for_kind(kind, None).unwrap_or(EventDetail::FightEnd)
    });

    Some(FightEvent {
        fight_id: FightId::new(row.get::<String, _>("fight_id")),
        seq,
        round: row.get::<i64, _>("round") as u32,
        second_in_round: row.get::<i64, _>("second_in_round") as u32,
        kind,
        corner,
        detail,
        generated: row.get::<i64, _>("generated") != 0,
    })
}
