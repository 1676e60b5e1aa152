//! Bridge generator: synthesize an event stream from a legacy cumulative
//! snapshot. Migration-only.
//!
//! The synthesized stream is plausible rather than faithful: counted events
//! are spread evenly across the round and each corner gets at most one
//! control start/end pair. Aggregating the output reproduces the snapshot's
//! counts exactly; control seconds match the snapshot's control totals to
//! the second because a single pair carries the whole duration.

use crate::db::NewEvent;
use crate::domain::{Corner, EventDetail, EventKind, FightId};
use serde::Deserialize;

/// Legacy per-round cumulative snapshot for one corner.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CornerSnapshot {
    pub strikes_landed: u32,
    pub significant_strikes: u32,
    pub knockdowns: u32,
    pub takedowns_landed: u32,
    pub submission_attempts: u32,
    pub control_seconds: u32,
}

/// Legacy cumulative snapshot for one round.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoundSnapshot {
    pub red: CornerSnapshot,
    pub blue: CornerSnapshot,
}

/// Synthesize events reproducing `snapshot` when aggregated.
///
/// Every event carries `generated: true` so backfilled rounds remain
/// distinguishable from organic ingestion. Callers must refuse to run this
/// against a round that already has events; the repository count check
/// enforces that at the pipeline level.
pub fn generate_events(
    fight_id: &FightId,
    round: u32,
    snapshot: &RoundSnapshot,
    round_duration: u32,
) -> Vec<NewEvent> {
    let mut events = Vec::new();
    corner_events(&mut events, fight_id, round, Corner::Red, &snapshot.red, round_duration);
    corner_events(&mut events, fight_id, round, Corner::Blue, &snapshot.blue, round_duration);
    events
}

fn corner_events(
    out: &mut Vec<NewEvent>,
    fight_id: &FightId,
    round: u32,
    corner: Corner,
    snapshot: &CornerSnapshot,
    round_duration: u32,
) {
    let make = |second: u32, kind: EventKind, detail: EventDetail| NewEvent {
        fight_id: fight_id.clone(),
        round,
        second_in_round: second.min(round_duration),
        kind,
        corner,
        detail,
        generated: true,
    };

    // Strikes spread evenly; the first `significant_strikes` of them are
    // tagged significant so both counters reproduce.
    for i in 0..snapshot.strikes_landed {
        let second = spread(i, snapshot.strikes_landed, round_duration);
        let significant = i < snapshot.significant_strikes;
        out.push(make(
            second,
            EventKind::StrLand,
            EventDetail::StrLand {
                significant,
                target: None,
            },
        ));
    }
    // Snapshot feeds occasionally report more significant strikes than total
    // strikes; emit the remainder as standalone significant strikes so the
    // significant counter still reproduces.
    if snapshot.significant_strikes > snapshot.strikes_landed {
        let extra = snapshot.significant_strikes - snapshot.strikes_landed;
        for i in 0..extra {
            let second = spread(i, extra, round_duration);
            out.push(make(
                second,
                EventKind::StrLand,
                EventDetail::StrLand {
                    significant: true,
                    target: None,
                },
            ));
        }
    }

    for i in 0..snapshot.knockdowns {
        let second = spread(i, snapshot.knockdowns, round_duration);
        out.push(make(second, EventKind::Kd, EventDetail::Kd));
    }

    for i in 0..snapshot.takedowns_landed {
        let second = spread(i, snapshot.takedowns_landed, round_duration);
        out.push(make(second, EventKind::TdLand, EventDetail::TdLand));
    }

    for i in 0..snapshot.submission_attempts {
        let second = spread(i, snapshot.submission_attempts, round_duration);
        out.push(make(
            second,
            EventKind::SubAtt,
            EventDetail::SubAtt { technique: None },
        ));
    }

    // One control pair per corner carries the full control total.
    if snapshot.control_seconds > 0 {
        let seconds = snapshot.control_seconds.min(round_duration);
        out.push(make(
            0,
            EventKind::CtrlStart,
            EventDetail::CtrlStart { position: None },
        ));
        out.push(make(seconds, EventKind::CtrlEnd, EventDetail::CtrlEnd));
    }
}

/// i-th of n marks, spread across (0, round_duration).
fn spread(i: u32, n: u32, round_duration: u32) -> u32 {
    debug_assert!(n > 0);
    ((u64::from(i) + 1) * u64::from(round_duration) / (u64::from(n) + 1)) as u32
}
