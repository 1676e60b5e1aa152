//! Fantasy scoring orchestration.
//!
//! Computation is delegated to the pure scorer; this service loads the
//! inputs, refreshes the derived cache row, and audits the write. The cache
//! is pull-through: a stale row is simply overwritten on the next call.

use crate::db::{FantasyStatRow, Repository};
use crate::domain::{FightId, FighterId};
use crate::engine::{aggregate_fight, score, FantasyScore};
use crate::error::LedgerError;
use crate::ops::{AuditLog, AuditStatus, Component, SystemStatusProvider};
use serde_json::json;
use std::sync::Arc;

pub struct FantasyService {
    repo: Arc<Repository>,
    status: Arc<dyn SystemStatusProvider>,
    audit: Arc<AuditLog>,
}

impl FantasyService {
    pub fn new(
        repo: Arc<Repository>,
        status: Arc<dyn SystemStatusProvider>,
        audit: Arc<AuditLog>,
    ) -> Self {
        FantasyService {
            repo,
            status,
            audit,
        }
    }

    /// Score a fighter under a profile and refresh the cached row.
    ///
    /// An unknown profile is a hard error; silently scoring with default
    /// weights would hand out wrong points that look plausible.
    pub async fn score_fighter(
        &self,
        fight_id: &FightId,
        fighter_id: &FighterId,
        profile_id: &str,
        actor: Option<&str>,
    ) -> Result<FantasyScore, LedgerError> {
        let resource = format!("fight:{}", fight_id);
        super::gate(
            self.status.as_ref(),
            self.audit.as_ref(),
            Component::Fantasy,
            "fantasy_score",
            &resource,
            actor,
        )
        .await?;

        let profile = self
            .repo
            .get_profile(profile_id)
            .await?
            .ok_or_else(|| LedgerError::UnknownProfile(profile_id.to_string()))?;
        let fight = self
            .repo
            .get_fight(fight_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("fight {}", fight_id)))?;

        let events = self.repo.query_events(fight_id, None, None).await?;
        let totals = aggregate_fight(&events, fight.round_duration_secs);

        let computed = score(&fight, fighter_id, &totals, &profile)
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        let breakdown = serde_json::to_value(&computed.breakdown)
            .map_err(|e| LedgerError::Validation(format!("unserializable breakdown: {}", e)))?;
        self.repo
            .upsert_fantasy_stat(&FantasyStatRow {
                fight_id: fight_id.clone(),
                fighter_id: fighter_id.clone(),
                profile_id: profile_id.to_string(),
                points: computed.points.to_string(),
                breakdown,
            })
            .await?;

        self.audit
            .record(
                "fantasy_score",
                actor,
                "score",
                &resource,
                json!({
                    "fighterId": fighter_id.as_str(),
                    "profileId": profile_id,
                    "points": computed.points.to_string(),
                }),
                AuditStatus::Success,
            )
            .await?;

        Ok(computed)
    }
}
