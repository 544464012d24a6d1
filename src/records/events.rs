// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! `0x0502` CardEventData: six fixed-count arrays of 24-byte records
//! (spec §4.2). Per-group counts aren't given by spec, which only states
//! the six group labels and the 24-byte record shape; the counts below
//! mirror the well-known Annex 1B `EF_Events_Data` group sizes and are
//! recorded as an assumption in DESIGN.md.

use crate::primitives::{decode_padded_string, decode_time_real, Nation, TIME_REAL_EMPTY};
use crate::records::{Decoded, DecodedRecord};
use crate::result::{EventGroup, EventRecord, VehiclePlate};

pub const RECORD_SIZE: usize = 24;

pub const GROUPS: [(EventGroup, usize); 6] = [
    (EventGroup::TimeOverlap, 6),
    (EventGroup::LastCardSession, 1),
    (EventGroup::PowerSupplyInterruption, 9),
    (EventGroup::CardConflict, 1),
    (EventGroup::TimeDifference, 1),
    (EventGroup::DrivingWithoutCard, 1),
];

pub fn total_record_count() -> usize {
    GROUPS.iter().map(|(_, n)| n).sum()
}

fn is_empty_slot(type_code: u8, begin_secs: u32) -> bool {
    type_code == 0xFF || TIME_REAL_EMPTY.contains(&begin_secs)
}

/// Decode one 24-byte slot: `type(1) + begin(4) + end(4) + nation(1) +
/// plate(14)`. Returns `None` for an empty sentinel slot.
fn decode_slot(group: EventGroup, bytes: &[u8]) -> Option<EventRecord> {
    let type_code = bytes[0];
    let begin_secs = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    let end_secs = u32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);
    if is_empty_slot(type_code, begin_secs) {
        return None;
    }
    let nation = Nation::from_code(bytes[9]);
    let plate = decode_padded_string(&bytes[10..24]);
    Some(EventRecord {
        group,
        type_code,
        begin: decode_time_real(begin_secs),
        end: decode_time_real(end_secs),
        vehicle: VehiclePlate { nation, plate },
    })
}

pub fn decode(payload: &[u8]) -> Decoded {
    let mut events = Vec::new();
    let mut cursor = 0usize;

    for &(group, count) in &GROUPS {
        for _ in 0..count {
            let Some(slot) = payload.get(cursor..cursor + RECORD_SIZE) else {
                // Truncated payload: stop, the framing reader already
                // folded the unreadable tail into raw_unparsed context.
                return Decoded::new(DecodedRecord::Events(events));
            };
            if let Some(record) = decode_slot(group, slot) {
                events.push(record);
            }
            cursor += RECORD_SIZE;
        }
    }

    Decoded::new(DecodedRecord::Events(events))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_slot() -> [u8; RECORD_SIZE] {
        [0xFF; RECORD_SIZE]
    }

    #[test]
    fn single_driving_without_card_event_decodes() {
        let mut payload = vec![0u8; total_record_count() * RECORD_SIZE];
        for chunk in payload.chunks_mut(RECORD_SIZE) {
            chunk.copy_from_slice(&empty_slot());
        }
        // Last group (DrivingWithoutCard) has a single slot at the tail.
        let last_slot_start = payload.len() - RECORD_SIZE;
        let mut slot = vec![0u8; RECORD_SIZE];
        slot[0] = 0x01; // type_code
        slot[1..5].copy_from_slice(&1_577_836_800u32.to_be_bytes()); // begin
        slot[5..9].copy_from_slice(&1_577_840_400u32.to_be_bytes()); // end
        slot[9] = 0x03; // nation
        slot[10..24].copy_from_slice(b"AB123CD\0\0\0\0\0\0\0");
        payload[last_slot_start..].copy_from_slice(&slot);

        let decoded = decode(&payload);
        let DecodedRecord::Events(events) = decoded.record else {
            panic!("expected Events variant");
        };
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].group, EventGroup::DrivingWithoutCard);
        assert_eq!(events[0].begin.timestamp(), 1_577_836_800);
        assert_eq!(events[0].end.timestamp(), 1_577_840_400);
    }
}
