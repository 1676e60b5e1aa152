//! Control-time resolution and the overlap consistency check.
//!
//! Control time is derived from paired ctrl_start/ctrl_end markers rather
//! than stored as a mutable counter. Pairing is by chronological order, not
//! by explicit linking IDs: any producer that emits well-ordered markers is
//! accepted, at the cost of not detecting two starts before one end here
//! (that shows up in the overlap check instead).

use crate::domain::{Corner, EventKind, FightEvent};
use serde::Serialize;
use tracing::warn;

/// Result of resolving one corner's control in one round. Warnings are data
/// annotations, never errors: control time is a best-effort derived metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlResolution {
    pub seconds: u32,
    /// A ctrl_start had no matching ctrl_end; control was assumed to run to
    /// the end of the round.
    pub unterminated_start: bool,
    /// An end-before-start pair was clamped to zero, or the total exceeded
    /// the round duration and was clamped down.
    pub clamped: bool,
}

/// A corner's control intervals within one round, paired chronologically.
fn control_intervals(
    events: &[FightEvent],
    corner: Corner,
    round_duration: u32,
) -> (Vec<(u32, u32)>, bool, bool) {
    let mut starts: Vec<u32> = Vec::new();
    let mut ends: Vec<u32> = Vec::new();

    for event in events {
        if event.corner != corner {
            continue;
        }
        match event.kind {
            EventKind::CtrlStart => starts.push(event.second_in_round),
            EventKind::CtrlEnd => ends.push(event.second_in_round),
            _ => {}
        }
    }

    starts.sort_unstable();
    ends.sort_unstable();

    let mut intervals = Vec::with_capacity(starts.len());
    let mut unterminated_start = false;
    let mut clamped = false;
    let mut next_end = 0usize;

    for &start in &starts {
        // Earliest end at or after this start; earlier ends are unmatched
        // leftovers and never pair backwards.
        while next_end < ends.len() && ends[next_end] < start {
            next_end += 1;
        }

        match ends.get(next_end) {
            Some(&end) => {
                next_end += 1;
                if end < start {
                    // Structurally impossible given the scan above, checked anyway.
                    warn!(corner = %corner, start, end, "Negative control duration clamped to zero");
                    clamped = true;
                } else {
                    intervals.push((start, end.min(round_duration)));
                }
            }
            None => {
                // Control never explicitly ended: persists to round end.
                unterminated_start = true;
                if start <= round_duration {
                    intervals.push((start, round_duration));
                }
            }
        }
    }

    (intervals, unterminated_start, clamped)
}

/// Resolve a corner's control seconds for one round from the round's events.
///
/// Events must belong to a single round; callers filter before invoking.
pub fn resolve_control(
    events: &[FightEvent],
    corner: Corner,
    round_duration: u32,
) -> ControlResolution {
    let (intervals, unterminated_start, mut clamped) =
        control_intervals(events, corner, round_duration);

    let total: u64 = intervals
        .iter()
        .map(|&(start, end)| u64::from(end - start))
        .sum();

    let seconds = if total > u64::from(round_duration) {
        warn!(
            corner = %corner,
            total,
            round_duration,
            "Control total exceeds round duration, clamping"
        );
        clamped = true;
        round_duration
    } else {
        total as u32
    };

    ControlResolution {
        seconds,
        unterminated_start,
        clamped,
    }
}

/// Advisory overlap check: red and blue control are physically mutually
/// exclusive, so overlapping control indicates a data-entry defect in the
/// upstream event producer. Never blocks ingestion; settlement consumers
/// should treat flagged fights as requiring manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapReport {
    pub has_overlap: bool,
    /// Seconds during which both corners were recorded as controlling, or the
    /// amount by which combined control exceeds the round duration, whichever
    /// is larger.
    pub excess_seconds: u32,
    pub red_seconds: u32,
    pub blue_seconds: u32,
}

pub fn validate_no_overlap(events: &[FightEvent], round_duration: u32) -> OverlapReport {
    let (red_intervals, _, _) = control_intervals(events, Corner::Red, round_duration);
    let (blue_intervals, _, _) = control_intervals(events, Corner::Blue, round_duration);

    let red = resolve_control(events, Corner::Red, round_duration);
    let blue = resolve_control(events, Corner::Blue, round_duration);

    // Pairwise interval intersection catches simultaneous control directly.
    let mut intersection: u64 = 0;
    for &(rs, re) in &red_intervals {
        for &(bs, be) in &blue_intervals {
            let lo = rs.max(bs);
            let hi = re.min(be);
            if hi > lo {
                intersection += u64::from(hi - lo);
            }
        }
    }

    // Combined-total check additionally catches malformed marker streams
    // whose synthesized intervals do not visibly intersect.
    let sum_excess = u64::from(red.seconds) + u64::from(blue.seconds);
    let sum_excess = sum_excess.saturating_sub(u64::from(round_duration));

    let excess = intersection.max(sum_excess).min(u64::from(round_duration)) as u32;

    OverlapReport {
        has_overlap: excess > 0,
        excess_seconds: excess,
        red_seconds: red.seconds,
        blue_seconds: blue.seconds,
    }
}
