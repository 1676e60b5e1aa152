use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy for the ledger core.
///
/// Consistency warnings (overlap, clamped control) are never errors; they
/// travel in result payloads so callers can decide whether to proceed.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed input, rejected before any write.
    #[error("Validation error: {0}")]
    Validation(String),
    /// Concurrent-write race on sequence assignment. Recoverable by caller
    /// retry; never auto-retried internally.
    #[error("Sequence conflict: {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// A market of this type already exists for the fight.
    #[error("Duplicate market: {0}")]
    DuplicateMarket(String),
    /// The market already has a settlement. Fatal to the calling operation;
    /// silently ignoring this would mask a double-pay bug.
    #[error("Market already settled: {0}")]
    AlreadySettled(String),
    /// Evaluator could not complete; the market has been moved to suspended
    /// and requires an administrative reopen.
    #[error("Settlement failed: {0}")]
    SettlementFailed(String),
    #[error("Unknown scoring profile: {0}")]
    UnknownProfile(String),
    /// Kill-switch active for the gated component. An operational signal,
    /// distinct from validation/business errors.
    #[error("Component {component} unavailable: {reason}")]
    Unavailable { component: String, reason: String },
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl LedgerError {
    /// True when the underlying sqlx error is a UNIQUE constraint violation.
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db) => db.message().contains("UNIQUE constraint failed"),
            _ => false,
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            LedgerError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            LedgerError::DuplicateMarket(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            LedgerError::UnknownProfile(msg) => {
                (StatusCode::BAD_REQUEST, format!("unknown profile: {}", msg))
            }
            LedgerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            LedgerError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            LedgerError::AlreadySettled(msg) => (StatusCode::CONFLICT, msg.clone()),
            LedgerError::SettlementFailed(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, msg.clone())
            }
            LedgerError::Unavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            LedgerError::Db(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "kind": kind_label(&self),
        }));

        (status, body).into_response()
    }
}

fn kind_label(err: &LedgerError) -> &'static str {
    match err {
        LedgerError::Validation(_) => "validation",
        LedgerError::Conflict(_) => "conflict",
        LedgerError::NotFound(_) => "not_found",
        LedgerError::DuplicateMarket(_) => "duplicate_market",
        LedgerError::AlreadySettled(_) => "already_settled",
        LedgerError::SettlementFailed(_) => "settlement_failed",
        LedgerError::UnknownProfile(_) => "unknown_profile",
        LedgerError::Unavailable { .. } => "unavailable",
        LedgerError::Db(_) => "internal",
    }
}
