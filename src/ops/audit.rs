//! Audit trail recorder.
//!
//! Every mutating operation writes one entry: success, failure, or blocked
//! (kill-switch). Entries that fail to persist on a failure path are logged
//! and dropped rather than masking the original error.

use crate::db::{AuditEntry, Repository};
use std::sync::Arc;
use tracing::warn;

/// Outcome recorded with each audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Success,
    Failure,
    Blocked,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::Failure => "failure",
            AuditStatus::Blocked => "blocked",
        }
    }
}

/// Append-only recorder over the `audit_log` table.
pub struct AuditLog {
    repo: Arc<Repository>,
    default_actor: String,
}

impl AuditLog {
    pub fn new(repo: Arc<Repository>, default_actor: impl Into<String>) -> Self {
        AuditLog {
            repo,
            default_actor: default_actor.into(),
        }
    }

    /// Record one entry. Failures on the success path propagate; callers on
    /// error paths should use `record_best_effort`.
    pub async fn record(
        &self,
        event_type: &str,
        actor: Option<&str>,
        action: &str,
        resource: &str,
        details: serde_json::Value,
        status: AuditStatus,
    ) -> Result<(), sqlx::Error> {
        let entry = self.entry(event_type, actor, action, resource, details, status);
        self.repo.insert_audit(&entry).await
    }

    /// Record an entry on a failure or blocked path. A write error here is
    /// logged and swallowed so the caller's original error survives.
    pub async fn record_best_effort(
        &self,
        event_type: &str,
        actor: Option<&str>,
        action: &str,
        resource: &str,
        details: serde_json::Value,
        status: AuditStatus,
    ) {
        let entry = self.entry(event_type, actor, action, resource, details, status);
        if let Err(e) = self.repo.insert_audit(&entry).await {
            warn!(error = %e, resource = %entry.resource, "Failed to write audit entry");
        }
    }

    fn entry(
        &self,
        event_type: &str,
        actor: Option<&str>,
        action: &str,
        resource: &str,
        details: serde_json::Value,
        status: AuditStatus,
    ) -> AuditEntry {
        AuditEntry {
            time_ms: chrono::Utc::now().timestamp_millis(),
            event_type: event_type.to_string(),
            actor: actor.unwrap_or(&self.default_actor).to_string(),
            action: action.to_string(),
            resource: resource.to_string(),
            details,
            status: status.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use serde_json::json;
    use tempfile::TempDir;

    async fn setup() -> (AuditLog, Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Arc::new(Repository::new(pool));
        (AuditLog::new(repo.clone(), "system"), repo, temp_dir)
    }

    #[tokio::test]
    async fn test_record_uses_default_actor() {
        let (log, repo, _temp) = setup().await;
        log.record(
            "event_append",
            None,
            "append",
            "fight:f-1",
            json!({"seq": 1}),
            AuditStatus::Success,
        )
        .await
        .unwrap();

        let entries = repo.query_audit(None).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor, "system");
        assert_eq!(entries[0].status, "success");
    }

    #[tokio::test]
    async fn test_explicit_actor_and_blocked_status() {
        let (log, repo, _temp) = setup().await;
        log.record_best_effort(
            "market_settle",
            Some("ops-admin"),
            "settle",
            "market:m-1",
            json!({"reason": "emergency_stop"}),
            AuditStatus::Blocked,
        )
        .await;

        let entries = repo.query_audit(Some("market:m-1")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor, "ops-admin");
        assert_eq!(entries[0].status, "blocked");
    }
}
