// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Builds the contiguous, duration-annotated [`Activity`] sequence from the
//! reconstructed cyclic-buffer [`DailyActivityRecord`]s (spec §4.3).

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::result::{Activity, ActivityChangeInfo, DailyActivityRecord};

/// Absolute UTC timestamp of a change: its owning day's midnight plus its
/// `minute_of_day` offset.
fn absolute_timestamp(day: &DailyActivityRecord, change: &ActivityChangeInfo) -> DateTime<Utc> {
    let midnight = day
        .day_timestamp
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc();
    midnight + Duration::minutes(change.minute_of_day as i64)
}

/// From the ordered daily-activity records, build a contiguous list of
/// [`Activity`] intervals covering every minute between the first and last
/// change (spec §4.3). Adjacent entries with the same `(kind, slot,
/// card_inserted)` are merged into one. Ties between changes that land on
/// the same timestamp are broken by order of appearance — the input is
/// walked in the order the cyclic buffer reconstruction produced it, never
/// re-sorted.
pub fn build(daily_records: &[DailyActivityRecord]) -> Vec<Activity> {
    let changes: Vec<(DateTime<Utc>, &ActivityChangeInfo)> = daily_records
        .iter()
        .flat_map(|day| day.changes.iter().map(move |change| (absolute_timestamp(day, change), change)))
        .collect();

    if changes.len() < 2 {
        return Vec::new();
    }

    let mut activities = Vec::with_capacity(changes.len() - 1);
    for pair in changes.windows(2) {
        let (start, change) = pair[0];
        let (end, _) = pair[1];
        if end < start {
            // A malformed cyclic buffer can hand us an out-of-order pair;
            // skip it rather than emit a negative-duration activity.
            continue;
        }
        activities.push(Activity {
            kind: change.activity,
            start,
            end,
            duration_minutes: (end - start).num_minutes(),
            slot: change.slot,
            card_inserted: !change.card_withdrawn,
        });
    }

    let merged = merge_adjacent(activities);
    debug!(segments = merged.len(), "timeline built");
    merged
}

/// Merge consecutive activities that share `(kind, slot, card_inserted)`
/// and abut exactly (spec §4.3: "adjacent entries of the same (kind, slot,
/// card_inserted) are merged").
fn merge_adjacent(activities: Vec<Activity>) -> Vec<Activity> {
    let mut merged: Vec<Activity> = Vec::with_capacity(activities.len());
    for activity in activities {
        let extends_previous = merged.last().is_some_and(|last| {
            last.kind == activity.kind
                && last.slot == activity.slot
                && last.card_inserted == activity.card_inserted
                && last.end == activity.start
        });
        if extends_previous {
            let last = merged.last_mut().expect("checked above");
            last.end = activity.end;
            last.duration_minutes += activity.duration_minutes;
        } else {
            merged.push(activity);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{ActivityKind, Slot};

    fn day(day_ts: u32, changes: &[(u16, ActivityKind)]) -> DailyActivityRecord {
        DailyActivityRecord {
            previous_length: 0,
            current_length: 0,
            day_timestamp: crate::primitives::decode_time_real(day_ts),
            daily_presence_counter: 1,
            day_distance_km: 0,
            changes: changes
                .iter()
                .map(|&(minute_of_day, activity)| ActivityChangeInfo {
                    slot: Slot::Driver,
                    crew: false,
                    card_withdrawn: false,
                    activity,
                    minute_of_day,
                })
                .collect(),
        }
    }

    #[test]
    fn builds_contiguous_intervals_between_first_and_last_change() {
        let day0 = day(1_577_836_800, &[(0, ActivityKind::Rest), (540, ActivityKind::Driving), (600, ActivityKind::Rest)]);
        let activities = build(&[day0]);
        assert_eq!(activities.len(), 2);
        assert!(activities.iter().all(|a| a.start < a.end));
        assert!(activities
            .iter()
            .all(|a| (a.end - a.start).num_minutes() == a.duration_minutes));
        assert_eq!(activities[0].kind, ActivityKind::Rest);
        assert_eq!(activities[0].duration_minutes, 540);
        assert_eq!(activities[1].kind, ActivityKind::Driving);
        assert_eq!(activities[1].duration_minutes, 60);
    }

    #[test]
    fn merges_adjacent_same_kind_segments_across_days() {
        // Day 0 ends mid-REST; day 1 begins with the same kind/slot/card
        // state at minute 0, immediately following day 0's last change.
        let day0 = day(1_577_836_800, &[(0, ActivityKind::Driving), (1439, ActivityKind::Rest)]);
        let day1 = day(1_577_836_800 + 86_400, &[(0, ActivityKind::Rest), (60, ActivityKind::Driving)]);
        let activities = build(&[day0, day1]);
        // The two REST changes (day0 minute 1439, day1 minute 0) are one
        // minute apart and share kind/slot/card state but are NOT the same
        // instant, so they still yield a one-minute REST segment before
        // merging with day1's explicit REST change, then DRIVING resumes.
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].kind, ActivityKind::Driving);
        assert_eq!(activities[1].kind, ActivityKind::Rest);
        assert_eq!(activities[1].duration_minutes, 61);
    }

    #[test]
    fn fewer_than_two_changes_yields_no_activities() {
        let day0 = day(1_577_836_800, &[(0, ActivityKind::Rest)]);
        assert!(build(&[day0]).is_empty());
        assert!(build(&[]).is_empty());
    }
}
