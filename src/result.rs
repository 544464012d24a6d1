// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! The generation-neutral result model: what a `.ddd` file decodes into,
//! regardless of which of the three tachograph generations produced it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::primitives::{Nation, TimeReal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum Generation {
    G1,
    G2,
    #[strum(serialize = "G2_2")]
    G2_2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Licence {
    pub authority: String,
    pub nation: Option<Nation>,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub surname: String,
    pub first_names: String,
    pub birth_date: Option<NaiveDate>,
    /// Raw bytes of the birth-date field, kept alongside the attempted
    /// interpretation since its encoding (Datef vs TimeReal) varies in the
    /// wild — see spec §4.2 and §9.
    pub birth_date_raw: [u8; 4],
    pub card_number: String,
    pub card_expiry: Option<NaiveDate>,
    pub issuing_nation: Option<Nation>,
    pub preferred_language: String,
    pub licence: Licence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleUsedRecord {
    pub odometer_begin_km: u32,
    pub odometer_end_km: u32,
    pub first_use: TimeReal,
    pub last_use: TimeReal,
    pub nation: Nation,
    pub plate: String,
    pub vu_data_block_counter: Option<u32>,
    pub empty: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehiclePlate {
    pub nation: Nation,
    pub plate: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    Driver,
    CoDriver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    Rest,
    Availability,
    Work,
    Driving,
}

/// The 2-byte `ActivityChangeInfo` bitfield, decoded per spec §3. Kept as a
/// distinct type from the timeline's [`Activity`] so the cyclic-buffer
/// reconstruction can round-trip it independently of timeline semantics
/// (spec §8's `encode(decode(x)) == x` law).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityChangeInfo {
    pub slot: Slot,
    pub crew: bool,
    pub card_withdrawn: bool,
    pub activity: ActivityKind,
    pub minute_of_day: u16,
}

impl ActivityChangeInfo {
    pub fn decode(raw: u16) -> Self {
        let slot = if raw & 0x8000 != 0 {
            Slot::CoDriver
        } else {
            Slot::Driver
        };
        let crew = raw & 0x4000 != 0;
        let card_withdrawn = raw & 0x2000 != 0;
        let activity = match (raw >> 11) & 0b11 {
            0 => ActivityKind::Rest,
            1 => ActivityKind::Availability,
            2 => ActivityKind::Work,
            _ => ActivityKind::Driving,
        };
        let minute_of_day = raw & 0x07FF;
        Self {
            slot,
            crew,
            card_withdrawn,
            activity,
            minute_of_day,
        }
    }

    pub fn encode(&self) -> u16 {
        let mut raw = self.minute_of_day & 0x07FF;
        if self.slot == Slot::CoDriver {
            raw |= 0x8000;
        }
        if self.crew {
            raw |= 0x4000;
        }
        if self.card_withdrawn {
            raw |= 0x2000;
        }
        let activity_bits: u16 = match self.activity {
            ActivityKind::Rest => 0,
            ActivityKind::Availability => 1,
            ActivityKind::Work => 2,
            ActivityKind::Driving => 3,
        };
        raw |= activity_bits << 11;
        raw
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActivityRecord {
    pub previous_length: u16,
    pub current_length: u16,
    pub day_timestamp: TimeReal,
    pub daily_presence_counter: u32,
    pub day_distance_km: u16,
    pub changes: Vec<ActivityChangeInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum EventGroup {
    TimeOverlap,
    LastCardSession,
    PowerSupplyInterruption,
    CardConflict,
    TimeDifference,
    DrivingWithoutCard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum FaultGroup {
    CardFault,
    VuFault,
    CardInteractionFault,
    PrinterFault,
    SensorFault,
    InternalFault,
}

/// A timeline-built activity interval (spec §3): the output of
/// [`crate::timeline::build`], consumed by the compliance engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub start: TimeReal,
    pub end: TimeReal,
    pub duration_minutes: i64,
    pub slot: Slot,
    pub card_inserted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub group: EventGroup,
    pub type_code: u8,
    pub begin: TimeReal,
    pub end: TimeReal,
    pub vehicle: VehiclePlate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultRecord {
    pub group: FaultGroup,
    pub type_code: u8,
    pub begin: TimeReal,
    pub end: TimeReal,
    pub vehicle: VehiclePlate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub entry_time: TimeReal,
    pub entry_type: u8,
    pub daily_work_period_country: Nation,
    pub odometer_km: u32,
    pub gnss: Option<GnssPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GnssPoint {
    pub timestamp: TimeReal,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub layout_size: u16,
    pub raw: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureStatus {
    Paired,
    Orphan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureBlock {
    pub data_tag: u16,
    pub algorithm: Option<String>,
    pub signature_bytes: Vec<u8>,
    pub status: SignatureStatus,
}

/// Infraction severities (spec §4.4 / GLOSSARY): minor, serious, very
/// serious.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Serialize, Deserialize)]
pub enum Severity {
    #[strum(serialize = "MI")]
    Minor,
    #[strum(serialize = "SI")]
    Serious,
    #[strum(serialize = "MSI")]
    VerySerious,
}

/// The fixed catalogue of 561/2006 rule violations the compliance engine
/// can emit (spec §4.4). A typed enum rather than a bare string category,
/// matching [`Warning`]'s typed-variant treatment below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum InfractionCategory {
    #[strum(serialize = "NO_BREAK_AFTER_4H30")]
    NoBreakAfter4h30,
    #[strum(serialize = "DAILY_DRIVING_OVER_10H")]
    DailyDrivingOver10h,
    #[strum(serialize = "EXTRA_DAILY_EXTENSION")]
    ExtraDailyExtension,
    #[strum(serialize = "INSUFFICIENT_DAILY_REST")]
    InsufficientDailyRest,
    #[strum(serialize = "REDUCED_REST_OVERUSE")]
    ReducedRestOveruse,
    #[strum(serialize = "WEEKLY_DRIVING_OVER_56H")]
    WeeklyDrivingOver56h,
    #[strum(serialize = "BIWEEKLY_DRIVING_OVER_90H")]
    BiweeklyDrivingOver90h,
    #[strum(serialize = "WEEKLY_REST_COMPENSATION_MISSING")]
    WeeklyRestCompensationMissing,
}

/// A single compliance finding (spec §3/§4.4). `evidence_refs` are indices
/// into the `Activity` slice the engine was given, so a caller can resolve
/// exactly which activities triggered the finding without re-running the
/// evaluators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infraction {
    pub date: NaiveDate,
    pub category: InfractionCategory,
    pub severity: Severity,
    pub description: String,
    pub evidence_refs: Vec<usize>,
}

/// Aggregate per-week counters (spec §6's "Compliance output").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStats {
    pub week_start: NaiveDate,
    pub driving_minutes: i64,
    pub distance_km: u32,
    pub breaks: usize,
    pub shifts: usize,
}

/// The compliance engine's output: every finding plus the per-week
/// aggregates spec §6 asks for alongside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ComplianceReport {
    pub infractions: Vec<Infraction>,
    pub weekly_stats: Vec<WeeklyStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUnparsed {
    pub tag_hex: String,
    pub offset: usize,
    pub length: usize,
    pub bytes_hex: String,
}

/// Semantic warnings: ambiguities or anomalies that don't stop the decode
/// (spec §7, tier 3). Typed variants rather than bare strings so callers can
/// match on `WarningKind` without parsing prose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Warning {
    BirthDateFallbackToTimeReal { raw: [u8; 4] },
    MissingVin,
    OdometerNotMonotonic {
        record_index: usize,
        begin_km: u32,
        end_km: u32,
    },
    UnknownCalibrationLayout {
        size: usize,
    },
    HeuristicRecordSize {
        tag_hex: String,
        assumed_size: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TachographFile {
    pub generation: Option<Generation>,
    pub card_application: Option<String>,
    pub driver: Option<Driver>,
    pub vehicles_used: Vec<VehicleUsedRecord>,
    pub activities: Vec<DailyActivityRecord>,
    pub events: Vec<EventRecord>,
    pub faults: Vec<FaultRecord>,
    pub places: Vec<PlaceRecord>,
    pub gnss_points: Vec<GnssPoint>,
    pub calibration_records: Vec<CalibrationRecord>,
    pub signature_blocks: Vec<SignatureBlock>,
    pub raw_unparsed: Vec<RawUnparsed>,
    pub warnings: Vec<Warning>,
}

impl Default for Generation {
    fn default() -> Self {
        Generation::G1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[quickcheck_macros::quickcheck]
    fn activity_change_info_roundtrips(raw: u16) -> bool {
        ActivityChangeInfo::decode(raw).encode() == raw
    }

    #[test]
    fn activity_change_info_roundtrips_exhaustively() {
        for raw in 0u32..=u16::MAX as u32 {
            let raw = raw as u16;
            assert_eq!(ActivityChangeInfo::decode(raw).encode(), raw, "raw={raw:#06x}");
        }
    }
}
