//! The fight-event vocabulary and the immutable ledger event type.
//!
//! `EventKind` is the closed canonical vocabulary; anything outside it is
//! rejected at the ledger boundary. `EventDetail` is one typed variant per
//! kind, replacing the legacy open metadata bag so that event-specific fields
//! are carried by construction rather than looked up by string key.

use crate::domain::{Corner, FightId};
use serde::{Deserialize, Serialize};

/// Canonical event vocabulary. Stored as lowercase strings in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StrAtt,
    StrLand,
    Kd,
    TdAtt,
    TdLand,
    CtrlStart,
    CtrlEnd,
    SubAtt,
    Reversal,
    RoundStart,
    RoundEnd,
    FightEnd,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::StrAtt => "str_att",
            EventKind::StrLand => "str_land",
            EventKind::Kd => "kd",
            EventKind::TdAtt => "td_att",
            EventKind::TdLand => "td_land",
            EventKind::CtrlStart => "ctrl_start",
            EventKind::CtrlEnd => "ctrl_end",
            EventKind::SubAtt => "sub_att",
            EventKind::Reversal => "reversal",
            EventKind::RoundStart => "round_start",
            EventKind::RoundEnd => "round_end",
            EventKind::FightEnd => "fight_end",
        }
    }

    /// Parse a canonical (already normalized) label. Returns None for
    /// anything outside the vocabulary so callers can reject explicitly.
    pub fn parse(s: &str) -> Option<EventKind> {
        match s {
            "str_att" => Some(EventKind::StrAtt),
            "str_land" => Some(EventKind::StrLand),
            "kd" => Some(EventKind::Kd),
            "td_att" => Some(EventKind::TdAtt),
            "td_land" => Some(EventKind::TdLand),
            "ctrl_start" => Some(EventKind::CtrlStart),
            "ctrl_end" => Some(EventKind::CtrlEnd),
            "sub_att" => Some(EventKind::SubAtt),
            "reversal" => Some(EventKind::Reversal),
            "round_start" => Some(EventKind::RoundStart),
            "round_end" => Some(EventKind::RoundEnd),
            "fight_end" => Some(EventKind::FightEnd),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strike target, when the producer reports one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrikeTarget {
    Head,
    Body,
    Leg,
}

/// Typed per-kind payload. One variant per `EventKind`; the tag is kept in
/// sync with `EventKind::as_str` so the ledger can cross-check kind vs detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDetail {
    StrAtt {
        #[serde(default)]
        significant: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<StrikeTarget>,
    },
    StrLand {
        #[serde(default)]
        significant: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<StrikeTarget>,
    },
    Kd,
    TdAtt,
    TdLand,
    CtrlStart {
        #[serde(skip_serializing_if = "Option::is_none")]
        position: Option<String>,
    },
    CtrlEnd,
    SubAtt {
        #[serde(skip_serializing_if = "Option::is_none")]
        technique: Option<String>,
    },
    Reversal,
    RoundStart,
    RoundEnd,
    FightEnd,
}

impl EventDetail {
    /// The kind this detail variant belongs to.
    pub fn kind(&self) -> EventKind {
        match self {
            EventDetail::StrAtt { .. } => EventKind::StrAtt,
            EventDetail::StrLand { .. } => EventKind::StrLand,
            EventDetail::Kd => EventKind::Kd,
            EventDetail::TdAtt => EventKind::TdAtt,
            EventDetail::TdLand => EventKind::TdLand,
            EventDetail::CtrlStart { .. } => EventKind::CtrlStart,
            EventDetail::CtrlEnd => EventKind::CtrlEnd,
            EventDetail::SubAtt { .. } => EventKind::SubAtt,
            EventDetail::Reversal => EventKind::Reversal,
            EventDetail::RoundStart => EventKind::RoundStart,
            EventDetail::RoundEnd => EventKind::RoundEnd,
            EventDetail::FightEnd => EventKind::FightEnd,
        }
    }

    /// Build the detail variant for `kind` from an optional producer payload.
    ///
    /// A missing payload yields the variant's defaults. A payload whose `kind`
    /// tag disagrees with the event kind, or whose fields fail to parse, is an
    /// error string suitable for a validation rejection.
    pub fn for_kind(kind: EventKind, payload: Option<&serde_json::Value>) -> Result<Self, String> {
        let detail = match payload {
            Some(value) => {
                let mut object = value
                    .as_object()
                    .cloned()
                    .ok_or_else(|| "detail must be a JSON object".to_string())?;
                // The tag is implied by the event kind; producers may omit it.
                object.insert(
                    "kind".to_string(),
                    serde_json::Value::String(kind.as_str().to_string()),
                );
                serde_json::from_value(serde_json::Value::Object(object))
                    .map_err(|e| format!("invalid detail for {}: {}", kind, e))?
            }
            None => Self::default_for(kind),
        };

        if detail.kind() != kind {
            return Err(format!(
                "detail kind {} does not match event kind {}",
                detail.kind(),
                kind
            ));
        }
        Ok(detail)
    }

    fn default_for(kind: EventKind) -> EventDetail {
        match kind {
            EventKind::StrAtt => EventDetail::StrAtt {
                significant: false,
                target: None,
            },
            EventKind::StrLand => EventDetail::StrLand {
                significant: false,
                target: None,
            },
            EventKind::Kd => EventDetail::Kd,
            EventKind::TdAtt => EventDetail::TdAtt,
            EventKind::TdLand => EventDetail::TdLand,
            EventKind::CtrlStart => EventDetail::CtrlStart { position: None },
            EventKind::CtrlEnd => EventDetail::CtrlEnd,
            EventKind::SubAtt => EventDetail::SubAtt { technique: None },
            EventKind::Reversal => EventDetail::Reversal,
            EventKind::RoundStart => EventDetail::RoundStart,
            EventKind::RoundEnd => EventDetail::RoundEnd,
            EventKind::FightEnd => EventDetail::FightEnd,
        }
    }
}

/// An immutable ledger fact. Once written it is never edited; corrections are
/// modeled as new compensating events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FightEvent {
    pub fight_id: FightId,
    /// Strictly increasing, gapless per fight. Assigned at insertion time.
    pub seq: i64,
    /// 1-based round number.
    pub round: u32,
    /// Seconds elapsed within the round, in [0, round_duration].
    pub second_in_round: u32,
    pub kind: EventKind,
    pub corner: Corner,
    pub detail: EventDetail,
    /// True for events synthesized by the bridge generator from legacy
    /// cumulative snapshots, false for organically ingested events.
    pub generated: bool,
}
