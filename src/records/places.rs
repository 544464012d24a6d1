// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! `0x0506` CardPlaceDailyWorkPeriod (G1) and its GNSS-enhanced G2/G2.2
//! counterparts (`0x0225`/`0x0528`), plus the load/unload (`0x0226`/
//! `0x0526`) and border-crossing (`0x0228`/`0x052A`) records that carry a
//! timestamp and odometer/position but no dedicated data-model field of
//! their own beyond `places`/`gnss_points`.

use crate::primitives::{decode_time_real, read_i32_be_scaled, read_u24_be, Nation};
use crate::records::{Decoded, DecodedRecord};
use crate::result::{GnssPoint, PlaceRecord};

const BASE_RECORD_SIZE: usize = 10;
const GNSS_EXTENSION_SIZE: usize = 12;
const GNSS_RECORD_SIZE: usize = BASE_RECORD_SIZE + GNSS_EXTENSION_SIZE;

/// Base layout: `entryTime(4) + entryType(1) + country(1) + region(1) +
/// odometer(3)`.
fn decode_base(bytes: &[u8]) -> Option<PlaceRecord> {
    if bytes.len() < BASE_RECORD_SIZE {
        return None;
    }
    let entry_time = decode_time_real(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
    let entry_type = bytes[4];
    let daily_work_period_country = Nation::from_code(bytes[5]);
    let odometer_km = read_u24_be(bytes, 7)?;
    Some(PlaceRecord {
        entry_time,
        entry_type,
        daily_work_period_country,
        odometer_km,
        gnss: None,
    })
}

/// Base layout plus a trailing `timestamp(4) + lat(4) + lon(4)` GNSS block.
fn decode_gnss(bytes: &[u8]) -> Option<PlaceRecord> {
    let mut record = decode_base(bytes)?;
    if bytes.len() < GNSS_RECORD_SIZE {
        return Some(record);
    }
    let gnss_bytes = &bytes[BASE_RECORD_SIZE..GNSS_RECORD_SIZE];
    let timestamp = decode_time_real(u32::from_be_bytes([
        gnss_bytes[0],
        gnss_bytes[1],
        gnss_bytes[2],
        gnss_bytes[3],
    ]));
    let latitude_deg = read_i32_be_scaled(gnss_bytes, 4)?;
    let longitude_deg = read_i32_be_scaled(gnss_bytes, 8)?;
    record.gnss = Some(GnssPoint {
        timestamp,
        latitude_deg,
        longitude_deg,
    });
    Some(record)
}

pub fn decode_daily_work_period(payload: &[u8]) -> Decoded {
    decode_records(payload, BASE_RECORD_SIZE, decode_base)
}

pub fn decode_gnss_places(payload: &[u8]) -> Decoded {
    decode_records(payload, GNSS_RECORD_SIZE, decode_gnss)
}

fn decode_records(
    payload: &[u8],
    record_size: usize,
    decode_one: impl Fn(&[u8]) -> Option<PlaceRecord>,
) -> Decoded {
    let mut records = Vec::new();
    for chunk in payload.chunks(record_size) {
        if chunk.len() < record_size {
            break;
        }
        if let Some(record) = decode_one(chunk) {
            records.push(record);
        }
    }
    Decoded::new(DecodedRecord::Places(records))
}

/// Load/unload (`0x0226`/`0x0526`): timestamp + odometer, no GNSS.
pub fn decode_load_unload(payload: &[u8]) -> Decoded {
    decode_records(payload, BASE_RECORD_SIZE, decode_base)
}

/// Border crossings (`0x0228`/`0x052A`): timestamp + position, surfaced as
/// `gnss_points` since the data model has no dedicated crossing type.
pub fn decode_border_crossings(payload: &[u8]) -> Decoded {
    let mut points = Vec::new();
    for chunk in payload.chunks(GNSS_EXTENSION_SIZE) {
        if chunk.len() < GNSS_EXTENSION_SIZE {
            break;
        }
        let timestamp =
            decode_time_real(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        let Some(latitude_deg) = read_i32_be_scaled(chunk, 4) else {
            break;
        };
        let Some(longitude_deg) = read_i32_be_scaled(chunk, 8) else {
            break;
        };
        points.push(GnssPoint {
            timestamp,
            latitude_deg,
            longitude_deg,
        });
    }
    Decoded::new(DecodedRecord::GnssPoints(points))
}

/// GNSS-accumulated-driving (`0x0525`, G2.2 only): same shape as a border
/// crossing, one point per accumulation tick.
pub fn decode_gnss_accumulated_driving(payload: &[u8]) -> Decoded {
    decode_border_crossings(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_daily_work_period_records() {
        let mut bytes = vec![0u8; BASE_RECORD_SIZE];
        bytes[0..4].copy_from_slice(&1_577_836_800u32.to_be_bytes());
        bytes[4] = 1;
        bytes[5] = 0x03;
        bytes[7..10].copy_from_slice(&[0x00, 0x00, 0x64]); // odometer=100
        let decoded = decode_daily_work_period(&bytes);
        let DecodedRecord::Places(places) = decoded.record else {
            panic!("expected Places variant");
        };
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].odometer_km, 100);
        assert!(places[0].gnss.is_none());
    }

    #[test]
    fn decodes_gnss_enhanced_places_with_position() {
        let mut bytes = vec![0u8; GNSS_RECORD_SIZE];
        bytes[5] = 0x04;
        bytes[10..14].copy_from_slice(&1_577_836_800u32.to_be_bytes());
        bytes[14..18].copy_from_slice(&123_456_789i32.to_be_bytes());
        bytes[18..22].copy_from_slice(&(-98_765_432i32).to_be_bytes());
        let decoded = decode_gnss_places(&bytes);
        let DecodedRecord::Places(places) = decoded.record else {
            panic!("expected Places variant");
        };
        assert_eq!(places.len(), 1);
        let gnss = places[0].gnss.unwrap();
        assert!((gnss.latitude_deg - 12.3456789).abs() < 1e-9);
    }
}
