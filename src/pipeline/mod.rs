//! Write pipeline: every mutating operation runs the same explicit chain of
//! kill-switch gate, validation, write, audit.

pub mod fantasy;
pub mod ledger;
pub mod market;

pub use fantasy::FantasyService;
pub use ledger::{AppendedEvent, EventSubmission, LedgerService};
pub use market::MarketService;

use crate::error::LedgerError;
use crate::ops::{AuditLog, AuditStatus, Component, SystemStatusProvider};
use serde_json::json;

/// Shared kill-switch gate. Runs before any state mutation; a blocked
/// operation is audited and surfaced as `Unavailable`.
pub(crate) async fn gate(
    status: &dyn SystemStatusProvider,
    audit: &AuditLog,
    component: Component,
    event_type: &str,
    resource: &str,
    actor: Option<&str>,
) -> Result<(), LedgerError> {
    let health = status.check(component).await?;
    if health.is_active {
        return Ok(());
    }

    let reason = health
        .reason
        .clone()
        .unwrap_or_else(|| health.state.as_str().to_string());
    audit
        .record_best_effort(
            event_type,
            actor,
            "blocked",
            resource,
            json!({
                "component": component.as_str(),
                "state": health.state.as_str(),
                "reason": reason,
            }),
            AuditStatus::Blocked,
        )
        .await;

    Err(LedgerError::Unavailable {
        component: component.as_str().to_string(),
        reason,
    })
}
