// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! `0x0505` CardVehiclesUsed. Three record layouts are selected by size per
//! spec §4.2: 31 bytes (the binding/canonical layout), 29 bytes (no
//! `vu_data_block_counter`), and 48 bytes (the G2 form, expanded with a
//! VIN). A payload is a flat run of same-size records; the size is picked
//! once per payload by checking which candidate size evenly divides it.

use crate::primitives::{decode_bcd, decode_padded_string, decode_time_real, read_u24_be, Nation};
use crate::records::{Decoded, DecodedRecord};
use crate::result::{VehicleUsedRecord, Warning};

const SIZE_SHORT: usize = 29;
const SIZE_CANONICAL: usize = 31;
const SIZE_G2_VIN: usize = 48;

fn pick_record_size(len: usize) -> Option<usize> {
    for candidate in [SIZE_CANONICAL, SIZE_SHORT, SIZE_G2_VIN] {
        if len % candidate == 0 && len != 0 {
            return Some(candidate);
        }
    }
    None
}

/// Plate occupies `[15..29]` (14 bytes) in both the canonical and short G1
/// layouts. The 48-byte G2 form reorders/expands with a VIN per spec §4.2,
/// but its exact field order isn't specified; decoding the plate from the
/// same base offset is a documented best-effort fallback (DESIGN.md), not a
/// verified G2 layout.
const PLATE_OFFSET: usize = 15;
const PLATE_LEN: usize = 14;

fn decode_one(bytes: &[u8], record_size: usize) -> VehicleUsedRecord {
    let odometer_begin_km = read_u24_be(bytes, 0).unwrap_or(0);
    let odometer_end_km = read_u24_be(bytes, 3).unwrap_or(0);
    let first_use = decode_time_real(u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]));
    let last_use = decode_time_real(u32::from_be_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]));
    let nation_byte = bytes[14];
    let nation = Nation::from_code(nation_byte);
    let plate = decode_padded_string(&bytes[PLATE_OFFSET..PLATE_OFFSET + PLATE_LEN]);

    let vu_data_block_counter = match record_size {
        SIZE_CANONICAL => decode_bcd(&bytes[29..31]).filter(|_| bytes[29..31] != [0xFF, 0xFF]),
        SIZE_G2_VIN => decode_bcd(&bytes[46..48]).filter(|_| bytes[46..48] != [0xFF, 0xFF]),
        _ => None,
    };

    VehicleUsedRecord {
        odometer_begin_km,
        odometer_end_km,
        first_use,
        last_use,
        nation,
        plate,
        vu_data_block_counter,
        empty: nation_byte == 0xFF,
    }
}

pub fn decode(payload: &[u8]) -> Decoded {
    let mut warnings = Vec::new();
    let mut records = Vec::new();

    let Some(record_size) = pick_record_size(payload.len()) else {
        // Doesn't evenly divide any known layout; leave it for the caller
        // to fold into raw_unparsed rather than guess.
        return Decoded::new(DecodedRecord::Vehicles(records));
    };

    for (index, chunk) in payload.chunks(record_size).enumerate() {
        if chunk.len() < record_size {
            break;
        }
        let record = decode_one(chunk, record_size);
        if !record.empty && record.odometer_end_km < record.odometer_begin_km {
            warnings.push(Warning::OdometerNotMonotonic {
                record_index: index,
                begin_km: record.odometer_begin_km,
                end_km: record.odometer_end_km,
            });
        }
        records.push(record);
    }

    Decoded::with_warnings(DecodedRecord::Vehicles(records), warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario 1 from spec §8: a single canonical 31-byte record.
    #[test]
    fn g1_vehicles_used_ordering() {
        let bytes: Vec<u8> = vec![
            0x00, 0x27, 0x10, // odometer_begin = 10000
            0x00, 0x27, 0x21, // odometer_end = 10017
            0x5E, 0x00, 0x00, 0x00, // first_use = 1577836800
            0x5E, 0x00, 0x0E, 0x10, // last_use = 1577840400
            0x03, // nation = France
            b'A', b'B', b'1', b'2', b'3', b'C', b'D', 0, 0, 0, 0, 0, 0, 0, // plate
            0x00, 0x00, // vu_data_block_counter
        ];
        assert_eq!(bytes.len(), SIZE_CANONICAL);

        let decoded = decode(&bytes);
        let DecodedRecord::Vehicles(records) = decoded.record else {
            panic!("expected Vehicles variant");
        };
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.odometer_begin_km, 10000);
        assert_eq!(record.odometer_end_km, 10017);
        assert_eq!(record.first_use.timestamp(), 1_577_836_800);
        assert_eq!(record.nation, Nation::France);
        assert_eq!(record.plate, "AB123CD");
        assert_eq!(record.vu_data_block_counter, Some(0));
    }

    #[test]
    fn odometer_regression_is_warned_not_rejected() {
        let mut bytes = vec![0u8; SIZE_CANONICAL];
        bytes[0..3].copy_from_slice(&[0x00, 0x00, 0x10]); // begin = 16
        bytes[3..6].copy_from_slice(&[0x00, 0x00, 0x05]); // end = 5 (regressed)
        bytes[14] = 0x03;
        let decoded = decode(&bytes);
        assert_eq!(decoded.warnings.len(), 1);
    }
}
