//! Scoring profiles and the fantasy stat cache.
//!
//! `fantasy_stats` is a derived cache, never a source of truth: every row is
//! recomputable from the event ledger, the fight result, and the profile
//! config, so the upsert here is always safe to repeat.

use crate::domain::{FightId, FighterId, ScoringProfile};
use sqlx::Row;
use tracing::warn;

use super::Repository;

/// Cached fantasy computation for one (fight, fighter, profile).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FantasyStatRow {
    pub fight_id: FightId,
    pub fighter_id: FighterId,
    pub profile_id: String,
    /// Canonical decimal string.
    pub points: String,
    pub breakdown: serde_json::Value,
}

impl Repository {
    /// Load a scoring profile by id. None means the profile does not exist,
    /// which callers must treat as a hard error, not a zero score.
    pub async fn get_profile(
        &self,
        profile_id: &str,
    ) -> Result<Option<ScoringProfile>, sqlx::Error> {
        let row = sqlx::query("SELECT config FROM scoring_profiles WHERE profile_id = ?")
            .bind(profile_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.and_then(|r| {
            let config: String = r.get("config");
            match ScoringProfile::from_config_json(profile_id, &config) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!(profile_id, error = %e, "Malformed scoring profile config, treating as missing");
                    None
                }
            }
        }))
    }

    /// Store or create a scoring profile config.
    pub async fn upsert_profile(
        &self,
        profile_id: &str,
        config_json: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO scoring_profiles (profile_id, config)
            VALUES (?, ?)
            ON CONFLICT(profile_id) DO UPDATE SET config = excluded.config
            "#,
        )
        .bind(profile_id)
        .bind(config_json)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Upsert the cached computation for a (fight, fighter, profile) key.
    pub async fn upsert_fantasy_stat(&self, stat: &FantasyStatRow) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO fantasy_stats (fight_id, fighter_id, profile_id, points, breakdown, computed_at_ms)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(fight_id, fighter_id, profile_id) DO UPDATE SET
                points = excluded.points,
                breakdown = excluded.breakdown,
                computed_at_ms = excluded.computed_at_ms
            "#,
        )
        .bind(stat.fight_id.as_str())
        .bind(stat.fighter_id.as_str())
        .bind(&stat.profile_id)
        .bind(&stat.points)
        .bind(stat.breakdown.to_string())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn get_fantasy_stat(
        &self,
        fight_id: &FightId,
        fighter_id: &FighterId,
        profile_id: &str,
    ) -> Result<Option<FantasyStatRow>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT fight_id, fighter_id, profile_id, points, breakdown
            FROM fantasy_stats
            WHERE fight_id = ? AND fighter_id = ? AND profile_id = ?
            "#,
        )
        .bind(fight_id.as_str())
        .bind(fighter_id.as_str())
        .bind(profile_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| {
            let breakdown_str: String = r.get("breakdown");
            let breakdown = serde_json::from_str(&breakdown_str).unwrap_or_else(|e| {
                warn!(profile_id, error = %e, "Failed to parse fantasy breakdown, using null");
                serde_json::Value::Null
            });
            FantasyStatRow {
                fight_id: FightId::new(r.get::<String, _>("fight_id")),
                fighter_id: FighterId::new(r.get::<String, _>("fighter_id")),
                profile_id: r.get("profile_id"),
                points: r.get("points"),
                breakdown,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{setup_test_db, test_fight};
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_seeded_profiles_load() {
        let (repo, _temp) = setup_test_db().await;

        let standard = repo.get_profile("standard").await.unwrap().unwrap();
        assert_eq!(
            standard.weights.knockdown,
            Decimal::from_str("10").unwrap()
        );
        assert_eq!(standard.bonuses.win, Decimal::from_str("25").unwrap());
        assert!(standard.multiplier.is_none());

        let aggressive = repo.get_profile("aggressive").await.unwrap().unwrap();
        assert_eq!(
            aggressive.bonuses.finish,
            Decimal::from_str("30").unwrap()
        );
        assert_eq!(
            aggressive.multiplier,
            Some(Decimal::from_str("1.25").unwrap())
        );
    }

    #[tokio::test]
    async fn test_unknown_profile_is_none() {
        let (repo, _temp) = setup_test_db().await;
        assert!(repo.get_profile("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fantasy_stat_upsert_overwrites() {
        let (repo, _temp) = setup_test_db().await;
        repo.insert_fight(&test_fight("f-1")).await.unwrap();

        let mut stat = FantasyStatRow {
            fight_id: FightId::new("f-1"),
            fighter_id: FighterId::new("red-1"),
            profile_id: "standard".to_string(),
            points: "42.5".to_string(),
            breakdown: serde_json::json!({"knockdowns": "20"}),
        };
        repo.upsert_fantasy_stat(&stat).await.unwrap();

        stat.points = "50.0".to_string();
        repo.upsert_fantasy_stat(&stat).await.unwrap();

        let loaded = repo
            .get_fantasy_stat(&stat.fight_id, &stat.fighter_id, "standard")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.points, "50.0");
    }

    #[tokio::test]
    async fn test_upsert_profile_roundtrip() {
        let (repo, _temp) = setup_test_db().await;

        repo.upsert_profile("custom", r#"{"weights":{"knockdown":"7"}}"#)
            .await
            .unwrap();
        let profile = repo.get_profile("custom").await.unwrap().unwrap();
        assert_eq!(profile.weights.knockdown, Decimal::from_str("7").unwrap());
    }
}
