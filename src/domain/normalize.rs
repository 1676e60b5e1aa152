//! Event label normalization.
//!
//! Upstream producers (scoring devices, legacy feeds, older app versions) do
//! not agree on exact spelling. Normalization folds case, trims whitespace,
//! and maps a fixed table of legacy aliases onto the canonical vocabulary.
//! Unknown labels pass through unchanged so the ledger can reject them
//! explicitly; normalization never silently drops data.

/// Normalize a raw event label toward the canonical vocabulary.
pub fn normalize(raw_label: &str) -> String {
    let folded = raw_label.trim().to_ascii_lowercase();

    let mapped = match folded.as_str() {
        // Legacy cumulative-stat feed labels.
        "strike" | "strike_landed" | "sig_strike" | "significant_strike" => "str_land",
        "strike_attempt" | "strike_thrown" | "strike_missed" => "str_att",
        "knockdown" | "knock_down" => "kd",
        "takedown" | "takedown_landed" | "takedown_completed" => "td_land",
        "takedown_attempt" | "takedown_stuffed" => "td_att",
        "control_start" | "ctrl_begin" | "position_gained" => "ctrl_start",
        "control_end" | "ctrl_stop" | "position_lost" => "ctrl_end",
        "submission" | "submission_attempt" | "sub_attempt" => "sub_att",
        "sweep" | "reversal_gained" => "reversal",
        "round_begin" => "round_start",
        "round_over" => "round_end",
        "fight_over" | "bout_end" => "fight_end",
        other => other,
    };

    mapped.to_string()
}
