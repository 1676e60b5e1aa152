//! Projection of the event ledger into cumulative per-round statistics.
//!
//! `aggregate` is a pure function of the round's events: calling it twice
//! with no intervening writes yields identical results. Nothing here mutates
//! state; all counters are derived on demand.

use crate::domain::{Corner, EventDetail, EventKind, FightEvent};
use serde::Serialize;

use super::control::{resolve_control, ControlResolution};

/// One corner's cumulative counts for a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CornerStats {
    pub strikes_attempted: u32,
    pub strikes_landed: u32,
    pub significant_strikes: u32,
    pub knockdowns: u32,
    pub takedowns_attempted: u32,
    pub takedowns_landed: u32,
    pub submission_attempts: u32,
    pub reversals: u32,
    pub control_seconds: u32,
    /// Control-time derivation warnings, carried as data.
    pub control_unterminated: bool,
    pub control_clamped: bool,
}

/// Aggregated statistics for one round of one fight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStats {
    pub round: u32,
    pub red: CornerStats,
    pub blue: CornerStats,
}

/// Fight-level totals summed over all rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FightTotals {
    pub red: CornerStats,
    pub blue: CornerStats,
}

/// Aggregate one round. `events` must already be filtered to the round.
pub fn aggregate(events: &[FightEvent], round: u32, round_duration: u32) -> RoundStats {
    RoundStats {
        round,
        red: corner_stats(events, Corner::Red, round_duration),
        blue: corner_stats(events, Corner::Blue, round_duration),
    }
}

/// Aggregate every round present in a fight's event stream and sum totals.
pub fn aggregate_fight(events: &[FightEvent], round_duration: u32) -> FightTotals {
    let mut rounds: Vec<u32> = events.iter().map(|e| e.round).collect();
    rounds.sort_unstable();
    rounds.dedup();

    let mut totals = FightTotals::default();
    for round in rounds {
        let round_events: Vec<FightEvent> = events
            .iter()
            .filter(|e| e.round == round)
            .cloned()
            .collect();
        let stats = aggregate(&round_events, round, round_duration);
        add_into(&mut totals.red, &stats.red);
        add_into(&mut totals.blue, &stats.blue);
    }
    totals
}

fn corner_stats(events: &[FightEvent], corner: Corner, round_duration: u32) -> CornerStats {
    let mut stats = CornerStats::default();

    for event in events {
        if event.corner != corner {
            continue;
        }
        match event.kind {
            // Significance counts only when landed.
            EventKind::StrAtt => stats.strikes_attempted += 1,
            EventKind::StrLand => {
                // A landed strike is also an attempt.
                stats.strikes_attempted += 1;
                stats.strikes_landed += 1;
                if is_significant(&event.detail) {
                    stats.significant_strikes += 1;
                }
            }
            EventKind::Kd => stats.knockdowns += 1,
            EventKind::TdAtt => stats.takedowns_attempted += 1,
            EventKind::TdLand => {
                stats.takedowns_attempted += 1;
                stats.takedowns_landed += 1;
            }
            EventKind::SubAtt => stats.submission_attempts += 1,
            EventKind::Reversal => stats.reversals += 1,
            EventKind::CtrlStart
            | EventKind::CtrlEnd
            | EventKind::RoundStart
            | EventKind::RoundEnd
            | EventKind::FightEnd => {}
        }
    }

    let ControlResolution {
        seconds,
        unterminated_start,
        clamped,
    } = resolve_control(events, corner, round_duration);
    stats.control_seconds = seconds;
    stats.control_unterminated = unterminated_start;
    stats.control_clamped = clamped;

    stats
}

fn is_significant(detail: &EventDetail) -> bool {
    matches!(
        detail,
        EventDetail::StrLand {
            significant: true,
            ..
        }
    )
}

fn add_into(total: &mut CornerStats, round: &CornerStats) {
    total.strikes_attempted += round.strikes_attempted;
    total.strikes_landed += round.strikes_landed;
    total.significant_strikes += round.significant_strikes;
    total.knockdowns += round.knockdowns;
    total.takedowns_attempted += round.takedowns_attempted;
    total.takedowns_landed += round.takedowns_landed;
    total.submission_attempts += round.submission_attempts;
    total.reversals += round.reversals;
    total.control_seconds += round.control_seconds;
    total.control_unterminated |= round.control_unterminated;
    total.control_clamped |= round.control_clamped;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FightId;

    fn event(
        round: u32,
        second: u32,
        kind: EventKind,
        corner: Corner,
        detail: EventDetail,
        seq: i64,
    ) -> FightEvent {
        FightEvent {
            fight_id: FightId::new("f-1"),
            seq,
            round,
            second_in_round: second,
            kind,
            corner,
            detail,
            generated: false,
        }
    }

    fn sig_strike(round: u32, second: u32, corner: Corner, seq: i64) -> FightEvent {
        event(
            round,
            second,
            EventKind::StrLand,
            corner,
            EventDetail::StrLand {
                significant: true,
                target: None,
            },
            seq,
        )
    }

    #[test]
    fn test_counts_per_corner() {
        let events = vec![
            sig_strike(1, 10, Corner::Red, 1),
            sig_strike(1, 20, Corner::Red, 2),
            event(
                1,
                30,
                EventKind::StrLand,
                Corner::Red,
                EventDetail::StrLand {
                    significant: false,
                    target: None,
                },
                3,
            ),
            event(1, 40, EventKind::Kd, Corner::Red, EventDetail::Kd, 4),
            sig_strike(1, 50, Corner::Blue, 5),
            event(1, 60, EventKind::TdLand, Corner::Blue, EventDetail::TdLand, 6),
            event(
                1,
                70,
                EventKind::SubAtt,
                Corner::Blue,
                EventDetail::SubAtt { technique: None },
                7,
            ),
        ];

        let stats = aggregate(&events, 1, 300);
        assert_eq!(stats.red.strikes_landed, 3);
        assert_eq!(stats.red.significant_strikes, 2);
        assert_eq!(stats.red.knockdowns, 1);
        assert_eq!(stats.blue.strikes_landed, 1);
        assert_eq!(stats.blue.takedowns_landed, 1);
        assert_eq!(stats.blue.takedowns_attempted, 1);
        assert_eq!(stats.blue.submission_attempts, 1);
    }

    #[test]
    fn test_landed_strike_counts_as_attempt() {
        let events = vec![
            sig_strike(1, 10, Corner::Red, 1),
            event(
                1,
                20,
                EventKind::StrAtt,
                Corner::Red,
                EventDetail::StrAtt {
                    significant: false,
                    target: None,
                },
                2,
            ),
        ];
        let stats = aggregate(&events, 1, 300);
        assert_eq!(stats.red.strikes_attempted, 2);
        assert_eq!(stats.red.strikes_landed, 1);
    }

    #[test]
    fn test_control_seconds_included() {
        let events = vec![
            event(
                1,
                30,
                EventKind::CtrlStart,
                Corner::Red,
                EventDetail::CtrlStart { position: None },
                1,
            ),
            event(1, 90, EventKind::CtrlEnd, Corner::Red, EventDetail::CtrlEnd, 2),
        ];
        let stats = aggregate(&events, 1, 300);
        assert_eq!(stats.red.control_seconds, 60);
        assert_eq!(stats.blue.control_seconds, 0);
    }

    #[test]
    fn test_determinism() {
        let events = vec![
            sig_strike(1, 10, Corner::Red, 1),
            event(1, 40, EventKind::Kd, Corner::Blue, EventDetail::Kd, 2),
            event(
                1,
                50,
                EventKind::CtrlStart,
                Corner::Blue,
                EventDetail::CtrlStart { position: None },
                3,
            ),
        ];
        let first = aggregate(&events, 1, 300);
        let second = aggregate(&events, 1, 300);
        assert_eq!(first, second);
    }

    #[test]
    fn test_fight_totals_sum_rounds() {
        let events = vec![
            sig_strike(1, 10, Corner::Red, 1),
            sig_strike(2, 10, Corner::Red, 2),
            sig_strike(2, 20, Corner::Blue, 3),
            event(3, 30, EventKind::Kd, Corner::Red, EventDetail::Kd, 4),
        ];
        let totals = aggregate_fight(&events, 300);
        assert_eq!(totals.red.significant_strikes, 2);
        assert_eq!(totals.blue.significant_strikes, 1);
        assert_eq!(totals.red.knockdowns, 1);
    }

    #[test]
    fn test_empty_round() {
        let stats = aggregate(&[], 1, 300);
        assert_eq!(stats.red, CornerStats::default());
        assert_eq!(stats.blue, CornerStats::default());
    }
}
