// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! `0x0503` CardFaultData: six fixed-count arrays of 24-byte records,
//! analogous to [`super::events`] (spec §4.2). The fault-group catalogue
//! isn't itemized by spec beyond "analogous for faults", so each group is
//! given a single slot — an explicit, documented simplification, not a
//! guess at undocumented counts the way the events groups' real-world
//! sizes are.

use crate::primitives::{decode_padded_string, decode_time_real, Nation, TIME_REAL_EMPTY};
use crate::records::{Decoded, DecodedRecord};
use crate::result::{FaultGroup, FaultRecord, VehiclePlate};

pub const RECORD_SIZE: usize = 24;

pub const GROUPS: [FaultGroup; 6] = [
    FaultGroup::CardFault,
    FaultGroup::VuFault,
    FaultGroup::CardInteractionFault,
    FaultGroup::PrinterFault,
    FaultGroup::SensorFault,
    FaultGroup::InternalFault,
];

fn is_empty_slot(type_code: u8, begin_secs: u32) -> bool {
    type_code == 0xFF || TIME_REAL_EMPTY.contains(&begin_secs)
}

fn decode_slot(group: FaultGroup, bytes: &[u8]) -> Option<FaultRecord> {
    let type_code = bytes[0];
    let begin_secs = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    let end_secs = u32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);
    if is_empty_slot(type_code, begin_secs) {
        return None;
    }
    let nation = Nation::from_code(bytes[9]);
    let plate = decode_padded_string(&bytes[10..24]);
    Some(FaultRecord {
        group,
        type_code,
        begin: decode_time_real(begin_secs),
        end: decode_time_real(end_secs),
        vehicle: VehiclePlate { nation, plate },
    })
}

pub fn decode(payload: &[u8]) -> Decoded {
    let mut faults = Vec::new();
    let mut cursor = 0usize;

    for &group in &GROUPS {
        let Some(slot) = payload.get(cursor..cursor + RECORD_SIZE) else {
            return Decoded::new(DecodedRecord::Faults(faults));
        };
        if let Some(record) = decode_slot(group, slot) {
            faults.push(record);
        }
        cursor += RECORD_SIZE;
    }

    Decoded::new(DecodedRecord::Faults(faults))
}
