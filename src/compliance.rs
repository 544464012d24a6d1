// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! EU Reg. 561/2006 driving-time compliance engine (spec §4.4). Consumes
//! the [`Activity`] timeline built by [`crate::timeline`], segments it into
//! shifts and weeks, and evaluates each rule independently before
//! collecting the findings into a [`ComplianceReport`].
//!
//! Several of 561/2006's rules (daily/weekly rest, weekly-rest
//! compensation) depend on details the regulation leaves to member-state
//! enforcement practice or that a single `.ddd` file cannot fully
//! disambiguate (e.g. the exact boundary of a "weekly rest" versus an
//! ordinary long layover). Where spec §4.4 doesn't fully pin these down,
//! the simplifications taken are recorded in DESIGN.md rather than
//! silently guessed.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tracing::debug;

use crate::result::{
    Activity, ActivityKind, ComplianceReport, DailyActivityRecord, Infraction, InfractionCategory, Severity,
    WeeklyStats,
};

/// Minimum continuous rest that ends a shift (Art. 8: the 9h floor below
/// which a rest can't even count as a reduced daily rest).
const SHIFT_BOUNDARY_MINUTES: i64 = 9 * 60;
/// Below this, a rest isn't a candidate "daily rest" at all — just an
/// ordinary break — and doesn't close a shift.
const MIN_CANDIDATE_REST_MINUTES: i64 = 3 * 60;
const REGULAR_DAILY_REST_MINUTES: i64 = 11 * 60;
const REDUCED_DAILY_REST_MINUTES: i64 = 9 * 60;
const MAX_CONTINUOUS_DRIVING_MINUTES: i64 = 270;
const MAX_DAILY_DRIVING_MINUTES: i64 = 600;
const EXTENDED_DAILY_DRIVING_MINUTES: i64 = 540;
const MAX_EXTENSIONS_PER_WEEK: u32 = 2;
const MAX_REDUCED_RESTS_PER_CYCLE: u32 = 3;
const WEEKLY_DRIVING_LIMIT_MINUTES: i64 = 56 * 60;
const BIWEEKLY_DRIVING_LIMIT_MINUTES: i64 = 90 * 60;
const BREAK_MINUTES: i64 = 15;

/// A maximal activity run ending at a rest of at least [`SHIFT_BOUNDARY_MINUTES`]
/// (spec §4.4). The ending rest is `None` for a trailing shift whose data
/// simply ran out before a qualifying rest appeared.
struct Shift<'a> {
    activities: &'a [Activity],
    ending_rest: Option<&'a Activity>,
}

impl Shift<'_> {
    fn date(&self) -> NaiveDate {
        self.activities
            .first()
            .map(|a| a.start.date_naive())
            .unwrap_or_default()
    }

    fn driving_minutes(&self) -> i64 {
        self.activities
            .iter()
            .filter(|a| a.kind == ActivityKind::Driving)
            .map(|a| a.duration_minutes)
            .sum()
    }
}

/// Partition activities into shifts (spec §4.4). A shift closes on any
/// REST activity of at least [`MIN_CANDIDATE_REST_MINUTES`] — the floor a
/// rest must clear to plausibly be "the" daily rest rather than an
/// ordinary break — with that rest included as the shift's last element.
/// The concatenation of every shift's activities equals the input slice
/// exactly: this is a partition (spec §8's "Laws").
fn partition_shifts(activities: &[Activity]) -> Vec<Shift<'_>> {
    let mut shifts = Vec::new();
    let mut start = 0usize;
    for (index, activity) in activities.iter().enumerate() {
        let is_boundary = activity.kind == ActivityKind::Rest && activity.duration_minutes >= MIN_CANDIDATE_REST_MINUTES;
        if is_boundary {
            shifts.push(Shift {
                activities: &activities[start..=index],
                ending_rest: Some(activity),
            });
            start = index + 1;
        }
    }
    if start < activities.len() {
        shifts.push(Shift {
            activities: &activities[start..],
            ending_rest: None,
        });
    }
    shifts
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Group shifts by the Monday-anchored week their first activity falls in
/// (spec §4.4's week definition).
fn group_by_week<'a, 'b>(shifts: &'b [Shift<'a>]) -> Vec<(NaiveDate, Vec<&'b Shift<'a>>)> {
    let mut weeks: Vec<(NaiveDate, Vec<&Shift>)> = Vec::new();
    for shift in shifts {
        let week_start = monday_of(shift.date());
        match weeks.iter_mut().find(|(start, _)| *start == week_start) {
            Some((_, group)) => group.push(shift),
            None => weeks.push((week_start, vec![shift])),
        }
    }
    weeks.sort_by_key(|(start, _)| *start);
    weeks
}

fn infraction(date: NaiveDate, category: InfractionCategory, severity: Severity, description: impl Into<String>) -> Infraction {
    Infraction {
        date,
        category,
        severity,
        description: description.into(),
        evidence_refs: Vec::new(),
    }
}

/// Art. 7: continuous-driving accumulator. Resets on a single REST of at
/// least 45 minutes, or on a 15-then-30-minute split rest taken in that
/// order — even if the completing half arrives only after the accumulator
/// has already passed 270 minutes, since the requirement is that the break
/// eventually materializes, not that it precede every minute of driving.
/// Only an accumulator that NEVER receives a qualifying reset before the
/// timeline ends is reported — see DESIGN.md for the worked trace this
/// mirrors (spec §8 scenarios 3, 5, 6).
fn check_continuous_driving(activities: &[Activity]) -> Vec<Infraction> {
    let mut accumulated = 0i64;
    let mut pending_split: Option<i64> = None;
    let mut unresolved_since: Option<DateTime<Utc>> = None;
    let mut findings = Vec::new();

    for activity in activities {
        match activity.kind {
            ActivityKind::Driving => {
                accumulated += activity.duration_minutes;
                if accumulated > MAX_CONTINUOUS_DRIVING_MINUTES && unresolved_since.is_none() {
                    unresolved_since = Some(activity.start);
                }
            }
            ActivityKind::Rest => {
                let minutes = activity.duration_minutes;
                if minutes >= 45 {
                    accumulated = 0;
                    pending_split = None;
                    unresolved_since = None;
                } else if minutes >= 30 && pending_split.is_some() {
                    accumulated = 0;
                    pending_split = None;
                    unresolved_since = None;
                } else if minutes >= BREAK_MINUTES && pending_split.is_none() {
                    pending_split = Some(minutes);
                }
            }
            ActivityKind::Availability | ActivityKind::Work => {}
        }
    }

    if let Some(start) = unresolved_since {
        findings.push(infraction(
            start.date_naive(),
            InfractionCategory::NoBreakAfter4h30,
            Severity::Serious,
            format!("{accumulated} minutes of driving accumulated without a qualifying break"),
        ));
    }
    findings
}

/// Art. 6.1: daily driving limit and the weekly extension budget.
fn check_daily_driving(weeks: &[(NaiveDate, Vec<&Shift>)]) -> Vec<Infraction> {
    let mut findings = Vec::new();
    for (_, shifts) in weeks {
        let mut extensions_seen = 0u32;
        for shift in shifts {
            let driving = shift.driving_minutes();
            if driving > MAX_DAILY_DRIVING_MINUTES {
                findings.push(infraction(
                    shift.date(),
                    InfractionCategory::DailyDrivingOver10h,
                    Severity::VerySerious,
                    format!("{driving} minutes of driving in a single shift exceeds the 10h daily limit"),
                ));
            } else if driving > EXTENDED_DAILY_DRIVING_MINUTES {
                extensions_seen += 1;
                if extensions_seen > MAX_EXTENSIONS_PER_WEEK {
                    findings.push(infraction(
                        shift.date(),
                        InfractionCategory::ExtraDailyExtension,
                        Severity::Minor,
                        format!(
                            "{driving}-minute shift is the {extensions_seen}th daily-driving extension this week (max {MAX_EXTENSIONS_PER_WEEK} allowed)"
                        ),
                    ));
                }
            }
        }
    }
    findings
}

/// Art. 8: daily rest adequacy and the reduced-rest budget between weekly
/// rests. A rest of 660+ minutes is regular; 540..660 is reduced (budgeted
/// at [`MAX_REDUCED_RESTS_PER_CYCLE`] per week); below 540 is insufficient —
/// unless it's immediately completed by a second rest bringing the
/// combined total to 660+ within the same day, the split-rest allowance
/// (spec §4.4: "split rest of 3h + 9h... counts as a regular rest").
fn check_daily_rest(shifts: &[Shift]) -> Vec<Infraction> {
    let mut findings = Vec::new();
    let mut reduced_rests_in_cycle = 0u32;

    for (index, shift) in shifts.iter().enumerate() {
        let Some(rest) = shift.ending_rest else { continue };
        let mut rest_minutes = rest.duration_minutes;

        if rest_minutes < REDUCED_DAILY_REST_MINUTES {
            if let Some(next) = shifts.get(index + 1).and_then(|s| s.ending_rest) {
                if next.start - rest.end <= Duration::hours(24) && rest_minutes + next.duration_minutes >= REGULAR_DAILY_REST_MINUTES {
                    rest_minutes += next.duration_minutes;
                }
            }
        }

        if rest_minutes >= REGULAR_DAILY_REST_MINUTES {
            reduced_rests_in_cycle = 0;
        } else if rest_minutes >= REDUCED_DAILY_REST_MINUTES {
            reduced_rests_in_cycle += 1;
            if reduced_rests_in_cycle > MAX_REDUCED_RESTS_PER_CYCLE {
                findings.push(infraction(
                    shift.date(),
                    InfractionCategory::ReducedRestOveruse,
                    Severity::Serious,
                    format!("{reduced_rests_in_cycle}th reduced daily rest since the last weekly rest (max {MAX_REDUCED_RESTS_PER_CYCLE})"),
                ));
            }
        } else {
            findings.push(infraction(
                shift.date(),
                InfractionCategory::InsufficientDailyRest,
                Severity::VerySerious,
                format!("{rest_minutes}-minute rest falls short of the {REDUCED_DAILY_REST_MINUTES}-minute reduced daily rest floor"),
            ));
        }
    }

    findings
}

/// Art. 6.2/6.3: weekly and rolling-biweekly driving caps. The rolling
/// 6×24h weekly-rest-due window from spec §4.4 is approximated here by the
/// Monday-anchored calendar week (see DESIGN.md).
fn check_weekly_driving(weeks: &[(NaiveDate, Vec<&Shift>)]) -> Vec<Infraction> {
    let mut findings = Vec::new();
    let weekly_minutes: Vec<(NaiveDate, i64)> = weeks
        .iter()
        .map(|(start, shifts)| (*start, shifts.iter().map(|s| s.driving_minutes()).sum()))
        .collect();

    for (index, &(week_start, minutes)) in weekly_minutes.iter().enumerate() {
        if minutes > WEEKLY_DRIVING_LIMIT_MINUTES {
            findings.push(infraction(
                week_start,
                InfractionCategory::WeeklyDrivingOver56h,
                Severity::VerySerious,
                format!("{minutes} minutes of driving this week exceeds the 56h weekly limit"),
            ));
        }
        if index > 0 {
            let biweekly = minutes + weekly_minutes[index - 1].1;
            if biweekly > BIWEEKLY_DRIVING_LIMIT_MINUTES {
                findings.push(infraction(
                    week_start,
                    InfractionCategory::BiweeklyDrivingOver90h,
                    Severity::VerySerious,
                    format!("{biweekly} minutes of driving across this week and the previous one exceeds the 90h biweekly limit"),
                ));
            }
        }
    }
    findings
}

/// Art. 8.6: a reduced weekly rest (24h..45h) must be compensated by an
/// attached block of rest before the end of the third following week.
/// Approximated per the same calendar-week model as
/// [`check_weekly_driving`] (see DESIGN.md): the longest rest in a week is
/// taken as that week's weekly rest candidate.
struct OwedCompensation {
    incurred_week: NaiveDate,
    due_by: NaiveDate,
    owed_minutes: i64,
}

fn check_weekly_rest(weeks: &[(NaiveDate, Vec<&Shift>)]) -> Vec<Infraction> {
    const REGULAR_WEEKLY_REST_MINUTES: i64 = 45 * 60;
    const REDUCED_WEEKLY_REST_MINUTES: i64 = 24 * 60;

    let mut findings = Vec::new();
    let mut pending: Vec<OwedCompensation> = Vec::new();

    for (week_start, shifts) in weeks {
        let longest_rest = shifts
            .iter()
            .filter_map(|s| s.ending_rest)
            .map(|r| r.duration_minutes)
            .max()
            .unwrap_or(0);

        // Any rest beyond the regular 45h minimum is surplus available to
        // pay down the oldest outstanding compensation first.
        let mut surplus = (longest_rest - REGULAR_WEEKLY_REST_MINUTES).max(0);
        pending.retain_mut(|owed| {
            let applied = surplus.min(owed.owed_minutes);
            owed.owed_minutes -= applied;
            surplus -= applied;
            owed.owed_minutes > 0
        });

        // Expired-but-unpaid compensations are reported once, when their
        // deadline has passed, then dropped.
        pending.retain(|owed| {
            let expired = owed.due_by < *week_start;
            if expired {
                findings.push(infraction(
                    owed.incurred_week,
                    InfractionCategory::WeeklyRestCompensationMissing,
                    Severity::Serious,
                    format!("reduced weekly rest owed {} more minutes of compensation by {}", owed.owed_minutes, owed.due_by),
                ));
            }
            !expired
        });

        if longest_rest >= REDUCED_WEEKLY_REST_MINUTES && longest_rest < REGULAR_WEEKLY_REST_MINUTES {
            pending.push(OwedCompensation {
                incurred_week: *week_start,
                due_by: *week_start + Duration::weeks(3),
                owed_minutes: REGULAR_WEEKLY_REST_MINUTES - longest_rest,
            });
        }
    }

    findings
}

/// Sum each daily record's `day_distance_km` into its Monday-anchored week
/// (spec §6: `distance_km` is a mandated per-week aggregate, sourced from
/// the same daily records the activity timeline was built from).
fn distance_by_week(daily_records: &[DailyActivityRecord]) -> std::collections::HashMap<NaiveDate, u32> {
    let mut totals = std::collections::HashMap::new();
    for day in daily_records {
        let week_start = monday_of(day.day_timestamp.date_naive());
        *totals.entry(week_start).or_insert(0u32) += day.day_distance_km as u32;
    }
    totals
}

fn weekly_stats(weeks: &[(NaiveDate, Vec<&Shift>)], daily_records: &[DailyActivityRecord]) -> Vec<WeeklyStats> {
    let distances = distance_by_week(daily_records);
    weeks
        .iter()
        .map(|(week_start, shifts)| {
            let driving_minutes = shifts.iter().map(|s| s.driving_minutes()).sum();
            let breaks = shifts
                .iter()
                .flat_map(|s| s.activities.iter())
                .filter(|a| a.kind == ActivityKind::Rest && a.duration_minutes >= BREAK_MINUTES)
                .count();
            WeeklyStats {
                week_start: *week_start,
                driving_minutes,
                distance_km: distances.get(week_start).copied().unwrap_or(0),
                breaks,
                shifts: shifts.len(),
            }
        })
        .collect()
}

/// Run every 561/2006 evaluator over a built [`Activity`] timeline and
/// return the combined findings alongside per-week aggregates (spec §4.4 /
/// §6). `daily_records` is the same [`DailyActivityRecord`] slice the
/// timeline was built from (`TachographFile::activities`); its
/// `day_distance_km` is summed per Monday-week into `WeeklyStats::distance_km`.
pub fn evaluate(activities: &[Activity], daily_records: &[DailyActivityRecord]) -> ComplianceReport {
    let shifts = partition_shifts(activities);
    let weeks = group_by_week(&shifts);

    let mut infractions = check_continuous_driving(activities);
    infractions.extend(check_daily_driving(&weeks));
    infractions.extend(check_daily_rest(&shifts));
    infractions.extend(check_weekly_driving(&weeks));
    infractions.extend(check_weekly_rest(&weeks));
    infractions.sort_by_key(|i| i.date);

    debug!(shifts = shifts.len(), weeks = weeks.len(), infractions = infractions.len(), "compliance evaluation complete");

    ComplianceReport {
        infractions,
        weekly_stats: weekly_stats(&weeks, daily_records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Slot;

    fn activity(kind: ActivityKind, start_minute: i64, duration: i64) -> Activity {
        let base = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let start = base + Duration::minutes(start_minute);
        Activity {
            kind,
            start,
            end: start + Duration::minutes(duration),
            duration_minutes: duration,
            slot: Slot::Driver,
            card_inserted: true,
        }
    }

    /// Scenario 3 from spec §8: 300 consecutive minutes of DRIVING, no
    /// REST, produces exactly one NO_BREAK_AFTER_4H30 (SI).
    #[test]
    fn continuous_driving_without_break_is_one_infraction() {
        let activities = vec![activity(ActivityKind::Driving, 0, 300)];
        let findings = check_continuous_driving(&activities);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, InfractionCategory::NoBreakAfter4h30);
        assert_eq!(findings[0].severity, Severity::Serious);
    }

    /// Scenario 5: driving 270, REST 15, DRIVING 20, REST 30: the split
    /// break cures the overage even though 290 total minutes of driving
    /// elapsed before any single 45-minute REST.
    #[test]
    fn split_break_resets_even_after_exceeding_threshold() {
        let activities = vec![
            activity(ActivityKind::Driving, 0, 270),
            activity(ActivityKind::Rest, 270, 15),
            activity(ActivityKind::Driving, 285, 20),
            activity(ActivityKind::Rest, 305, 30),
        ];
        assert!(check_continuous_driving(&activities).is_empty());
    }

    /// Scenario 6: AVAILABILITY does not reset the driving accumulator.
    #[test]
    fn availability_does_not_count_as_a_break() {
        let activities = vec![
            activity(ActivityKind::Driving, 0, 270),
            activity(ActivityKind::Availability, 270, 60),
            activity(ActivityKind::Driving, 330, 10),
        ];
        let findings = check_continuous_driving(&activities);
        assert_eq!(findings.len(), 1);
    }

    fn shift_week_fixture(driving_minutes: &[i64]) -> Vec<Activity> {
        let mut activities = Vec::new();
        let mut cursor = 0i64;
        for &driving in driving_minutes {
            activities.push(activity(ActivityKind::Driving, cursor, driving));
            cursor += driving;
            activities.push(activity(ActivityKind::Rest, cursor, 11 * 60));
            cursor += 11 * 60;
        }
        activities
    }

    /// Scenario 4a: three shifts of 9h30 driving each in the same week
    /// produces exactly one EXTRA_DAILY_EXTENSION on the third.
    #[test]
    fn third_extension_in_a_week_is_flagged() {
        let activities = shift_week_fixture(&[9 * 60 + 30, 9 * 60 + 30, 9 * 60 + 30]);
        let shifts = partition_shifts(&activities);
        let weeks = group_by_week(&shifts);
        let findings = check_daily_driving(&weeks);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, InfractionCategory::ExtraDailyExtension);
    }

    /// Scenario 4b: [9h30, 9h30, 9h, 9h30] also produces exactly one —
    /// the 9h (540 min, not an extension) shift doesn't consume budget.
    #[test]
    fn non_extension_shift_does_not_consume_the_weekly_budget() {
        let activities = shift_week_fixture(&[9 * 60 + 30, 9 * 60 + 30, 9 * 60, 9 * 60 + 30]);
        let shifts = partition_shifts(&activities);
        let weeks = group_by_week(&shifts);
        let findings = check_daily_driving(&weeks);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn shift_partition_covers_every_activity_without_overlap_or_gap() {
        let activities = shift_week_fixture(&[8 * 60, 7 * 60]);
        let shifts = partition_shifts(&activities);
        let flattened: Vec<Activity> = shifts.iter().flat_map(|s| s.activities.iter().cloned()).collect();
        assert_eq!(flattened, activities);
    }

    #[test]
    fn over_600_minutes_driving_is_a_very_serious_daily_infraction() {
        let activities = shift_week_fixture(&[11 * 60]);
        let shifts = partition_shifts(&activities);
        let weeks = group_by_week(&shifts);
        let findings = check_daily_driving(&weeks);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, InfractionCategory::DailyDrivingOver10h);
        assert_eq!(findings[0].severity, Severity::VerySerious);
    }

    fn daily_record(day_ts: i64, day_distance_km: u16) -> DailyActivityRecord {
        let base = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        DailyActivityRecord {
            previous_length: 0,
            current_length: 0,
            day_timestamp: base + Duration::minutes(day_ts),
            daily_presence_counter: 1,
            day_distance_km,
            changes: Vec::new(),
        }
    }

    /// `WeeklyStats::distance_km` sums each day's `day_distance_km` into its
    /// Monday-anchored week rather than the hardcoded `0` it used to be.
    #[test]
    fn weekly_distance_sums_daily_distance_into_the_right_week() {
        let activities = shift_week_fixture(&[8 * 60]);
        let shifts = partition_shifts(&activities);
        let weeks = group_by_week(&shifts);

        // 2024-01-01 is a Monday; two days that week plus one day the next.
        let daily_records = vec![
            daily_record(0, 100),
            daily_record(24 * 60, 150),
            daily_record(7 * 24 * 60, 60),
        ];

        let stats = weekly_stats(&weeks, &daily_records);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].distance_km, 250);
    }
}
