//! Operational concerns: the kill-switch registry and the audit trail.

pub mod audit;
pub mod status;

pub use audit::{AuditLog, AuditStatus};
pub use status::{
    Component, ComponentHealth, ComponentState, DbSystemStatus, StaticStatus, SystemStatusProvider,
};
