use crate::api::AppState;
use crate::error::LedgerError;
use crate::ops::{AuditStatus, Component, ComponentState};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatusDto {
    pub component: String,
    pub state: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    pub component: String,
    pub status: String,
    pub reason: Option<String>,
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    pub resource: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntryDto {
    pub time_ms: i64,
    pub event_type: String,
    pub actor: String,
    pub action: String,
    pub resource: String,
    pub details: serde_json::Value,
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditNoteRequest {
    pub action: String,
    pub resource: String,
    pub details: Option<serde_json::Value>,
    pub actor: Option<String>,
}

const ALL_COMPONENTS: [Component; 5] = [
    Component::Api,
    Component::Websocket,
    Component::Fantasy,
    Component::Markets,
    Component::Settlement,
];

pub async fn get_system_status(
    State(state): State<AppState>,
) -> Result<Json<Vec<ComponentStatusDto>>, LedgerError> {
    let mut statuses = Vec::with_capacity(ALL_COMPONENTS.len());
    for component in ALL_COMPONENTS {
        let health = state.status.check(component).await?;
        statuses.push(ComponentStatusDto {
            component: component.as_str().to_string(),
            state: health.state.as_str().to_string(),
            is_active: health.is_active,
            reason: health.reason,
        });
    }
    Ok(Json(statuses))
}

pub async fn set_component_status(
    State(state): State<AppState>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<ComponentStatusDto>, LedgerError> {
    let component = Component::parse(&req.component).ok_or_else(|| {
        LedgerError::Validation(format!("unknown component: {}", req.component))
    })?;
    let new_state = ComponentState::parse(&req.status).ok_or_else(|| {
        LedgerError::Validation(format!("unknown status: {}", req.status))
    })?;

    if !state
        .repo
        .set_component_status(component.as_str(), new_state.as_str(), req.reason.as_deref())
        .await?
    {
        return Err(LedgerError::NotFound(format!(
            "component {}",
            req.component
        )));
    }

    state
        .audit
        .record(
            "system_status",
            req.actor.as_deref(),
            "set_status",
            &format!("component:{}", component),
            json!({
                "status": new_state.as_str(),
                "reason": req.reason,
            }),
            AuditStatus::Success,
        )
        .await?;

    Ok(Json(ComponentStatusDto {
        component: component.as_str().to_string(),
        state: new_state.as_str().to_string(),
        is_active: new_state == ComponentState::Active,
        reason: req.reason,
    }))
}

pub async fn get_audit(
    Query(params): Query<AuditQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AuditEntryDto>>, LedgerError> {
    let entries = state.repo.query_audit(params.resource.as_deref()).await?;
    Ok(Json(
        entries
            .into_iter()
            .map(|e| AuditEntryDto {
                time_ms: e.time_ms,
                event_type: e.event_type,
                actor: e.actor,
                action: e.action,
                resource: e.resource,
                details: e.details,
                status: e.status,
            })
            .collect(),
    ))
}

/// Operator-written audit note, for context that no automated entry carries
/// (manual review outcomes, incident numbers).
pub async fn append_audit_note(
    State(state): State<AppState>,
    Json(req): Json<AuditNoteRequest>,
) -> Result<Json<serde_json::Value>, LedgerError> {
    if req.action.trim().is_empty() || req.resource.trim().is_empty() {
        return Err(LedgerError::Validation(
            "action and resource must be non-empty".to_string(),
        ));
    }

    state
        .audit
        .record(
            "manual_note",
            req.actor.as_deref(),
            &req.action,
            &req.resource,
            req.details.unwrap_or(serde_json::Value::Null),
            AuditStatus::Success,
        )
        .await?;

    Ok(Json(json!({"recorded": true})))
}
