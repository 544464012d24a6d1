// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! `0x050C` SpecificConditions/Calibration. Record size (105 or 161 bytes)
//! selects the layout per spec §4.2; since neither layout's internal
//! fields are specified, both decode to the raw record bytes tagged with
//! the layout size that was detected.

use crate::records::{Decoded, DecodedRecord};
use crate::result::{CalibrationRecord, Warning};

const LAYOUT_V1: usize = 105;
const LAYOUT_V2: usize = 161;

pub fn decode(payload: &[u8]) -> Decoded {
    let record_size = match payload.len() {
        len if len % LAYOUT_V2 == 0 && len != 0 => LAYOUT_V2,
        len if len % LAYOUT_V1 == 0 && len != 0 => LAYOUT_V1,
        _ => {
            return Decoded::with_warnings(
                DecodedRecord::Calibrations(Vec::new()),
                vec![Warning::UnknownCalibrationLayout { size: payload.len() }],
            )
        }
    };

    let records = payload
        .chunks(record_size)
        .filter(|c| c.len() == record_size)
        .map(|c| CalibrationRecord {
            layout_size: record_size as u16,
            raw: c.to_vec(),
        })
        .collect();

    Decoded::new(DecodedRecord::Calibrations(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_layout_by_size() {
        let payload = vec![0u8; LAYOUT_V1];
        let decoded = decode(&payload);
        let DecodedRecord::Calibrations(records) = decoded.record else {
            panic!("expected Calibrations variant");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].layout_size, LAYOUT_V1 as u16);
    }

    #[test]
    fn unknown_size_warns() {
        let payload = vec![0u8; 17];
        let decoded = decode(&payload);
        assert_eq!(decoded.warnings.len(), 1);
    }
}
