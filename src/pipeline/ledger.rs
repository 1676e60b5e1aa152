//! Ledger ingestion: fight registration, event appends, and the bridge
//! backfill, each gated on the `api` component and audited.

use crate::db::{NewEvent, Repository};
use crate::domain::{
    normalize, Corner, EventDetail, EventKind, Fight, FightId, FightResult, FighterId,
};
use crate::engine::{generate_events, RoundSnapshot};
use crate::error::LedgerError;
use crate::ops::{AuditLog, AuditStatus, Component, SystemStatusProvider};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// A raw event as submitted by a producer: uncanonicalized label, string
/// corner, optional detail payload.
#[derive(Debug, Clone)]
pub struct EventSubmission {
    pub fight_id: String,
    pub round: u32,
    pub second_in_round: u32,
    pub label: String,
    pub corner: String,
    pub detail: Option<serde_json::Value>,
}

/// The ledger's acknowledgement of an accepted event.
#[derive(Debug, Clone)]
pub struct AppendedEvent {
    pub fight_id: FightId,
    pub seq: i64,
    pub kind: EventKind,
}

/// Ingestion service for the append-only ledger.
pub struct LedgerService {
    repo: Arc<Repository>,
    status: Arc<dyn SystemStatusProvider>,
    audit: Arc<AuditLog>,
    default_round_duration: u32,
}

impl LedgerService {
    pub fn new(
        repo: Arc<Repository>,
        status: Arc<dyn SystemStatusProvider>,
        audit: Arc<AuditLog>,
        default_round_duration: u32,
    ) -> Self {
        LedgerService {
            repo,
            status,
            audit,
            default_round_duration,
        }
    }

    /// Register a fight. Re-registering an existing fight id is a conflict,
    /// not an upsert: fighters and round length are fixed at registration.
    pub async fn register_fight(
        &self,
        fight_id: &str,
        red_fighter: &str,
        blue_fighter: &str,
        round_duration_secs: Option<u32>,
        actor: Option<&str>,
    ) -> Result<Fight, LedgerError> {
        let resource = format!("fight:{}", fight_id);
        super::gate(
            self.status.as_ref(),
            self.audit.as_ref(),
            Component::Api,
            "fight_register",
            &resource,
            actor,
        )
        .await?;

        if red_fighter == blue_fighter {
            return Err(LedgerError::Validation(
                "red and blue fighters must differ".to_string(),
            ));
        }
        let round_duration_secs = match round_duration_secs {
            Some(0) => {
                return Err(LedgerError::Validation(
                    "round duration must be positive".to_string(),
                ))
            }
            Some(secs) => secs,
            None => self.default_round_duration,
        };

        let fight = Fight {
            fight_id: FightId::new(fight_id),
            red_fighter: FighterId::new(red_fighter),
            blue_fighter: FighterId::new(blue_fighter),
            round_duration_secs,
            result: None,
        };

        if !self.repo.insert_fight(&fight).await? {
            return Err(LedgerError::Conflict(format!(
                "fight {} already registered",
                fight_id
            )));
        }

        self.audit
            .record(
                "fight_register",
                actor,
                "register",
                &resource,
                json!({
                    "redFighter": red_fighter,
                    "blueFighter": blue_fighter,
                    "roundDurationSecs": round_duration_secs,
                }),
                AuditStatus::Success,
            )
            .await?;

        Ok(fight)
    }

    /// Record or correct the official result. Corrections overwrite; derived
    /// values (settlement inputs, fantasy bonuses) are recomputed from the
    /// stored result on their next read, never patched in place.
    pub async fn record_result(
        &self,
        fight_id: &FightId,
        result: &FightResult,
        actor: Option<&str>,
    ) -> Result<(), LedgerError> {
        let resource = format!("fight:{}", fight_id);
        super::gate(
            self.status.as_ref(),
            self.audit.as_ref(),
            Component::Api,
            "fight_result",
            &resource,
            actor,
        )
        .await?;

        if result.ending_round == 0 {
            return Err(LedgerError::Validation(
                "ending round must be at least 1".to_string(),
            ));
        }
        if !self.repo.record_fight_result(fight_id, result).await? {
            return Err(LedgerError::NotFound(format!("fight {}", fight_id)));
        }

        self.audit
            .record(
                "fight_result",
                actor,
                "record_result",
                &resource,
                json!({
                    "winner": result.winner.as_str(),
                    "method": result.method.as_str(),
                    "endingRound": result.ending_round,
                }),
                AuditStatus::Success,
            )
            .await?;

        Ok(())
    }

    /// Append one event: gate, canonicalize, validate, write, audit.
    ///
    /// Labels outside the canonical vocabulary are rejected before any write;
    /// the ledger never stores an event kind it cannot aggregate.
    pub async fn append(
        &self,
        submission: &EventSubmission,
        actor: Option<&str>,
    ) -> Result<AppendedEvent, LedgerError> {
        let resource = format!("fight:{}", submission.fight_id);
        super::gate(
            self.status.as_ref(),
            self.audit.as_ref(),
            Component::Api,
            "event_append",
            &resource,
            actor,
        )
        .await?;

        let result = self.validate_and_append(submission).await;
        match &result {
            Ok(appended) => {
                self.audit
                    .record(
                        "event_append",
                        actor,
                        "append",
                        &resource,
                        json!({
                            "seq": appended.seq,
                            "kind": appended.kind.as_str(),
                            "round": submission.round,
                            "secondInRound": submission.second_in_round,
                        }),
                        AuditStatus::Success,
                    )
                    .await?;
            }
            Err(e) => {
                self.audit
                    .record_best_effort(
                        "event_append",
                        actor,
                        "append",
                        &resource,
                        json!({
                            "label": submission.label,
                            "error": e.to_string(),
                        }),
                        AuditStatus::Failure,
                    )
                    .await;
            }
        }
        result
    }

    async fn validate_and_append(
        &self,
        submission: &EventSubmission,
    ) -> Result<AppendedEvent, LedgerError> {
        let fight_id = FightId::new(&submission.fight_id);
        let fight = self
            .repo
            .get_fight(&fight_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("fight {}", fight_id)))?;

        let canonical = normalize(&submission.label);
        let kind = EventKind::parse(&canonical).ok_or_else(|| {
            LedgerError::Validation(format!("unknown event label: {}", submission.label))
        })?;
        let corner = Corner::parse(&submission.corner).ok_or_else(|| {
            LedgerError::Validation(format!("unknown corner: {}", submission.corner))
        })?;

        if submission.round == 0 {
            return Err(LedgerError::Validation(
                "round must be at least 1".to_string(),
            ));
        }
        if submission.second_in_round > fight.round_duration_secs {
            return Err(LedgerError::Validation(format!(
                "second_in_round {} exceeds round duration {}",
                submission.second_in_round, fight.round_duration_secs
            )));
        }

        let detail =
            EventDetail::for_kind(kind, submission.detail.as_ref()).map_err(LedgerError::Validation)?;

        let seq = self
            .repo
            .append_event(&NewEvent {
                fight_id: fight_id.clone(),
                round: submission.round,
                second_in_round: submission.second_in_round,
                kind,
                corner,
                detail,
                generated: false,
            })
            .await?;

        Ok(AppendedEvent {
            fight_id,
            seq,
            kind,
        })
    }

    /// Backfill a round from a legacy cumulative snapshot. Refuses to run
    /// against a round that already has any events, organic or generated.
    pub async fn bridge_round(
        &self,
        fight_id: &FightId,
        round: u32,
        snapshot: &RoundSnapshot,
        actor: Option<&str>,
    ) -> Result<usize, LedgerError> {
        let resource = format!("fight:{}", fight_id);
        super::gate(
            self.status.as_ref(),
            self.audit.as_ref(),
            Component::Api,
            "bridge_backfill",
            &resource,
            actor,
        )
        .await?;

        if round == 0 {
            return Err(LedgerError::Validation(
                "round must be at least 1".to_string(),
            ));
        }
        let fight = self
            .repo
            .get_fight(fight_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("fight {}", fight_id)))?;

        let existing = self.repo.count_round_events(fight_id, round).await?;
        if existing > 0 {
            self.audit
                .record_best_effort(
                    "bridge_backfill",
                    actor,
                    "backfill",
                    &resource,
                    json!({"round": round, "existingEvents": existing}),
                    AuditStatus::Failure,
                )
                .await;
            return Err(LedgerError::Conflict(format!(
                "round {} of fight {} already has {} events",
                round, fight_id, existing
            )));
        }

        let events = generate_events(fight_id, round, snapshot, fight.round_duration_secs);
        let inserted = self.repo.append_events_batch(&events).await?;
        info!(fight_id = %fight_id, round, inserted, "Bridge backfill complete");

        self.audit
            .record(
                "bridge_backfill",
                actor,
                "backfill",
                &resource,
                json!({"round": round, "inserted": inserted}),
                AuditStatus::Success,
            )
            .await?;

        Ok(inserted)
    }
}
