// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! `0x0504`/`0x0524` CardDriverActivity: the cyclic daily-activity buffer.
//! Represented as a flat byte slice plus modular index arithmetic per
//! spec §9's "Cyclic buffer walking" design note — no cyclic ownership
//! graph.

use crate::primitives::{decode_bcd, decode_time_real};
use crate::records::{Decoded, DecodedRecord};
use crate::result::{ActivityChangeInfo, DailyActivityRecord};

const DAY_RECORD_HEADER_LEN: usize = 12;

/// Read `len` bytes starting at `start` (mod `body.len()`), wrapping around
/// the end of the circular buffer as many times as needed.
fn read_wrapped(body: &[u8], start: usize, len: usize) -> Vec<u8> {
    let body_len = body.len();
    if body_len == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(len);
    let mut pos = start % body_len;
    for _ in 0..len {
        out.push(body[pos]);
        pos = (pos + 1) % body_len;
    }
    out
}

fn decode_day_record(body: &[u8], start: usize) -> Option<(DailyActivityRecord, u16)> {
    let header = read_wrapped(body, start, DAY_RECORD_HEADER_LEN);
    if header.len() < DAY_RECORD_HEADER_LEN {
        return None;
    }
    let previous_length = u16::from_be_bytes([header[0], header[1]]);
    let current_length = u16::from_be_bytes([header[2], header[3]]);
    let day_ts = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    let daily_presence_counter = decode_bcd(&header[8..10]).unwrap_or(0);
    let day_distance_km = u16::from_be_bytes([header[10], header[11]]);

    if (current_length as usize) < DAY_RECORD_HEADER_LEN {
        return None;
    }
    let changes_bytes_len = current_length as usize - DAY_RECORD_HEADER_LEN;
    let num_changes = changes_bytes_len / 2;
    let changes_bytes = read_wrapped(body, start + DAY_RECORD_HEADER_LEN, num_changes * 2);
    let changes = changes_bytes
        .chunks_exact(2)
        .map(|c| ActivityChangeInfo::decode(u16::from_be_bytes([c[0], c[1]])))
        .collect();

    let record = DailyActivityRecord {
        previous_length,
        current_length,
        day_timestamp: decode_time_real(day_ts),
        daily_presence_counter,
        day_distance_km,
        changes,
    };
    Some((record, previous_length))
}

/// Header: 2-byte oldest pointer + 2-byte newest pointer into the circular
/// body. Walk backward from `newest` using each record's `previous_length`
/// until `oldest` is reached, guarding against a corrupt buffer that never
/// reaches it by also tracking visited offsets (spec §8: "visits each
/// record exactly once").
pub fn decode(payload: &[u8]) -> Decoded {
    if payload.len() < 4 {
        return Decoded::new(DecodedRecord::Activities(Vec::new()));
    }
    let oldest_ptr = u16::from_be_bytes([payload[0], payload[1]]) as usize;
    let newest_ptr = u16::from_be_bytes([payload[2], payload[3]]) as usize;
    let body = &payload[4..];
    if body.is_empty() {
        return Decoded::new(DecodedRecord::Activities(Vec::new()));
    }

    let body_len = body.len();
    let mut records_newest_first = Vec::new();
    let mut visited = std::collections::HashSet::new();
    let mut pos = newest_ptr % body_len;

    loop {
        if !visited.insert(pos) {
            break; // would revisit a record: corrupt buffer, stop here.
        }
        let Some((record, previous_length)) = decode_day_record(body, pos) else {
            break;
        };
        records_newest_first.push(record);

        if pos == oldest_ptr % body_len {
            break;
        }
        if previous_length == 0 {
            break;
        }
        pos = (pos + body_len - (previous_length as usize % body_len)) % body_len;
    }

    records_newest_first.reverse();
    Decoded::new(DecodedRecord::Activities(records_newest_first))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_day(previous_length: u16, day_ts: u32, changes: &[u16]) -> Vec<u8> {
        let current_length = (DAY_RECORD_HEADER_LEN + changes.len() * 2) as u16;
        let mut out = Vec::new();
        out.extend_from_slice(&previous_length.to_be_bytes());
        out.extend_from_slice(&current_length.to_be_bytes());
        out.extend_from_slice(&day_ts.to_be_bytes());
        out.extend_from_slice(&[0x00, 0x01]); // daily_presence_counter BCD = 1
        out.extend_from_slice(&10u16.to_be_bytes()); // day_distance_km
        for &c in changes {
            out.extend_from_slice(&c.to_be_bytes());
        }
        out
    }

    #[test]
    fn walks_two_days_backward_from_newest() {
        let day0 = encode_day(0, 1_577_836_800, &[0x0000]);
        let day1 = encode_day(day0.len() as u16, 1_577_923_200, &[0x1000]);

        let mut body = Vec::new();
        body.extend_from_slice(&day0);
        let day1_start = body.len();
        body.extend_from_slice(&day1);

        let oldest_ptr = 0u16;
        let newest_ptr = day1_start as u16;
        let mut payload = Vec::new();
        payload.extend_from_slice(&oldest_ptr.to_be_bytes());
        payload.extend_from_slice(&newest_ptr.to_be_bytes());
        payload.extend_from_slice(&body);

        let decoded = decode(&payload);
        let DecodedRecord::Activities(records) = decoded.record else {
            panic!("expected Activities variant");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].day_timestamp.timestamp(), 1_577_836_800);
        assert_eq!(records[1].day_timestamp.timestamp(), 1_577_923_200);
    }

    #[test]
    fn corrupt_self_referencing_record_does_not_loop_forever() {
        // previous_length of 0 on a single record that isn't the oldest
        // pointer must terminate, not spin.
        let day = encode_day(0, 1_577_836_800, &[]);
        let mut payload = vec![0xFF, 0xFF, 0x00, 0x00]; // oldest_ptr != newest_ptr(0)
        payload.extend_from_slice(&day);
        let decoded = decode(&payload);
        let DecodedRecord::Activities(records) = decoded.record else {
            panic!("expected Activities variant");
        };
        assert_eq!(records.len(), 1);
    }
}
