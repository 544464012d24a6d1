// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Per-tag structural decoders. Each module owns one family of tags from
//! spec §4.2 and returns a tagged variant of [`DecodedRecord`] so the
//! aggregator can switch on the result exhaustively (spec §9's "Result
//! shape" design note) instead of threading loose key-value maps around.

pub mod activity;
pub mod calibration;
pub mod events;
pub mod faults;
pub mod identification;
pub mod places;
pub mod undocumented;
pub mod vehicles;

use crate::result::{
    CalibrationRecord, DailyActivityRecord, Driver, EventRecord, FaultRecord, GnssPoint,
    PlaceRecord, VehicleUsedRecord, Warning,
};

/// Sum type over every record decoder's output. The aggregator matches on
/// this exhaustively rather than stashing everything in a generic map.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedRecord {
    CardApplication(String),
    Driver(Box<Driver>),
    Licence(crate::result::Licence),
    Events(Vec<EventRecord>),
    Faults(Vec<FaultRecord>),
    Activities(Vec<DailyActivityRecord>),
    Vehicles(Vec<VehicleUsedRecord>),
    Places(Vec<PlaceRecord>),
    GnssPoints(Vec<GnssPoint>),
    Calibrations(Vec<CalibrationRecord>),
    /// Heuristically or opaquely handled payload; always paired with at
    /// least one entry appended to `warnings` or `raw_unparsed` by the
    /// caller (see `undocumented::decode`).
    Undocumented,
}

/// Convenience carrier so decoders can emit both a result and zero or more
/// semantic warnings without a shared mutable `Vec` parameter threaded
/// through every function signature.
pub struct Decoded {
    pub record: DecodedRecord,
    pub warnings: Vec<Warning>,
}

impl Decoded {
    pub fn new(record: DecodedRecord) -> Self {
        Self {
            record,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(record: DecodedRecord, warnings: Vec<Warning>) -> Self {
        Self { record, warnings }
    }
}
