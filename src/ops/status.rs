//! Kill-switch registry access.
//!
//! Gated operations consult a `SystemStatusProvider` at the top of every
//! mutating path rather than reading a global table ad hoc, which keeps the
//! pipeline testable without a live registry. The DB-backed provider reads
//! the `system_status` rows seeded at deploy time.

use crate::db::Repository;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Components governed by the kill-switch registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Api,
    Websocket,
    Fantasy,
    Markets,
    Settlement,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Api => "api",
            Component::Websocket => "websocket",
            Component::Fantasy => "fantasy",
            Component::Markets => "markets",
            Component::Settlement => "settlement",
        }
    }

    pub fn parse(s: &str) -> Option<Component> {
        match s {
            "api" => Some(Component::Api),
            "websocket" => Some(Component::Websocket),
            "fantasy" => Some(Component::Fantasy),
            "markets" => Some(Component::Markets),
            "settlement" => Some(Component::Settlement),
            _ => None,
        }
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operational state of one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentState {
    Active,
    Maintenance,
    EmergencyStop,
}

impl ComponentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentState::Active => "active",
            ComponentState::Maintenance => "maintenance",
            ComponentState::EmergencyStop => "emergency_stop",
        }
    }

    pub fn parse(s: &str) -> Option<ComponentState> {
        match s {
            "active" => Some(ComponentState::Active),
            "maintenance" => Some(ComponentState::Maintenance),
            "emergency_stop" => Some(ComponentState::EmergencyStop),
            _ => None,
        }
    }
}

/// Result of a kill-switch check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub is_active: bool,
    pub state: ComponentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[async_trait]
pub trait SystemStatusProvider: Send + Sync {
    /// Current health of a component. Must be consulted before any state
    /// mutation in a gated operation.
    async fn check(&self, component: Component) -> Result<ComponentHealth, sqlx::Error>;
}

/// Provider backed by the `system_status` table.
pub struct DbSystemStatus {
    repo: Arc<Repository>,
}

impl DbSystemStatus {
    pub fn new(repo: Arc<Repository>) -> Self {
        DbSystemStatus { repo }
    }
}

#[async_trait]
impl SystemStatusProvider for DbSystemStatus {
    async fn check(&self, component: Component) -> Result<ComponentHealth, sqlx::Error> {
        let row = self.repo.get_component_status(component.as_str()).await?;

        Ok(match row {
            Some((status, reason)) => {
                let state = ComponentState::parse(&status).unwrap_or(ComponentState::EmergencyStop);
                ComponentHealth {
                    is_active: state == ComponentState::Active,
                    state,
                    reason,
                }
            }
            // The registry is seeded at deploy time; a missing row means the
            // component is not provisioned and must not accept mutations.
            None => ComponentHealth {
                is_active: false,
                state: ComponentState::EmergencyStop,
                reason: Some("component not registered".to_string()),
            },
        })
    }
}

/// Fixed-state provider for tests and tooling.
pub struct StaticStatus {
    pub state: ComponentState,
    pub reason: Option<String>,
}

impl StaticStatus {
    pub fn active() -> Self {
        StaticStatus {
            state: ComponentState::Active,
            reason: None,
        }
    }

    pub fn stopped(reason: &str) -> Self {
        StaticStatus {
            state: ComponentState::EmergencyStop,
            reason: Some(reason.to_string()),
        }
    }
}

#[async_trait]
impl SystemStatusProvider for StaticStatus {
    async fn check(&self, _component: Component) -> Result<ComponentHealth, sqlx::Error> {
        Ok(ComponentHealth {
            is_active: self.state == ComponentState::Active,
            state: self.state,
            reason: self.reason.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    async fn setup() -> (Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Arc::new(Repository::new(pool)), temp_dir)
    }

    #[tokio::test]
    async fn test_seeded_components_active() {
        let (repo, _temp) = setup().await;
        let provider = DbSystemStatus::new(repo);

        for component in [
            Component::Api,
            Component::Websocket,
            Component::Fantasy,
            Component::Markets,
            Component::Settlement,
        ] {
            let health = provider.check(component).await.unwrap();
            assert!(health.is_active, "{} should be active", component);
        }
    }

    #[tokio::test]
    async fn test_emergency_stop_deactivates() {
        let (repo, _temp) = setup().await;
        repo.set_component_status("settlement", "emergency_stop", Some("incident"))
            .await
            .unwrap();

        let provider = DbSystemStatus::new(repo);
        let health = provider.check(Component::Settlement).await.unwrap();
        assert!(!health.is_active);
        assert_eq!(health.state, ComponentState::EmergencyStop);
        assert_eq!(health.reason.as_deref(), Some("incident"));
    }

    #[tokio::test]
    async fn test_maintenance_deactivates() {
        let (repo, _temp) = setup().await;
        repo.set_component_status("api", "maintenance", None)
            .await
            .unwrap();

        let provider = DbSystemStatus::new(repo);
        let health = provider.check(Component::Api).await.unwrap();
        assert!(!health.is_active);
        assert_eq!(health.state, ComponentState::Maintenance);
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticStatus::stopped("drill");
        let health = provider.check(Component::Api).await.unwrap();
        assert!(!health.is_active);
        assert_eq!(health.reason.as_deref(), Some("drill"));
    }
}
