// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Wire-level primitive codecs shared by every record decoder: big-endian
//! integers, packed BCD, padded IA5/Latin-1 strings, `TimeReal` and `Datef`
//! timestamps, and the nation-code table.

use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// `TimeReal`: UInt32 big-endian seconds since 1970-01-01T00:00:00Z.
pub type TimeReal = DateTime<Utc>;

/// Sentinel values meaning "no timestamp" that appear interchangeably across
/// event/fault slots.
pub const TIME_REAL_EMPTY: [u32; 2] = [0, 0xFFFF_FFFF];

pub fn read_u8(bytes: &[u8], offset: usize) -> Option<u8> {
    bytes.get(offset).copied()
}

pub fn read_u16_be(bytes: &[u8], offset: usize) -> Option<u16> {
    let chunk = bytes.get(offset..offset + 2)?;
    Some(BigEndian::read_u16(chunk))
}

/// UInt24 big-endian, as used for odometer readings. `byteorder` has no
/// native 3-byte width, so the top byte is zero-filled before delegating to
/// `read_u32`.
pub fn read_u24_be(bytes: &[u8], offset: usize) -> Option<u32> {
    let chunk = bytes.get(offset..offset + 3)?;
    let mut widened = [0u8; 4];
    widened[1..].copy_from_slice(chunk);
    Some(BigEndian::read_u32(&widened))
}

pub fn read_u32_be(bytes: &[u8], offset: usize) -> Option<u32> {
    let chunk = bytes.get(offset..offset + 4)?;
    Some(BigEndian::read_u32(chunk))
}

/// Signed 32-bit big-endian GNSS coordinate component, scaled by `1e-7` to
/// decimal degrees (WGS84).
pub fn read_i32_be_scaled(bytes: &[u8], offset: usize) -> Option<f64> {
    let chunk = bytes.get(offset..offset + 4)?;
    Some(BigEndian::read_i32(chunk) as f64 * 1e-7)
}

/// Decode `TimeReal`: seconds since the Unix epoch, UTC. Out-of-range values
/// (there are none representable by u32 for `chrono`'s supported range) are
/// infallible; the sentinel values are left for callers to interpret.
pub fn decode_time_real(seconds: u32) -> TimeReal {
    Utc.timestamp_opt(seconds as i64, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap())
}

/// Decode a single packed-BCD byte (`0xAB` -> `10*A + B`), returning `None`
/// if either nibble isn't a decimal digit.
fn bcd_byte(byte: u8) -> Option<u32> {
    let hi = byte >> 4;
    let lo = byte & 0x0F;
    if hi > 9 || lo > 9 {
        return None;
    }
    Some((hi * 10 + lo) as u32)
}

/// Decode a run of packed-BCD bytes into the decimal integer they spell out,
/// most-significant byte first.
pub fn decode_bcd(bytes: &[u8]) -> Option<u32> {
    let mut value = 0u32;
    for &byte in bytes {
        value = value.checked_mul(100)?.checked_add(bcd_byte(byte)?)?;
    }
    Some(value)
}

/// `Datef`: packed-BCD `YYYYMMDD` in 4 bytes. Validates month in `1..=12`
/// and day in `1..=31` per spec §4.2 so callers can fall back to the
/// `TimeReal` interpretation on mismatch (CardHolderBirthDate heuristic).
pub fn decode_datef(bytes: &[u8; 4]) -> Option<NaiveDate> {
    let year = decode_bcd(&bytes[0..2])?;
    let month = decode_bcd(&bytes[2..3])?;
    let day = decode_bcd(&bytes[3..4])?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    NaiveDate::from_ymd_opt(year as i32, month, day)
}

/// Strip trailing padding (`0x00` or `0xFF`) and trailing ASCII spaces, then
/// decode the remainder as Latin-1/IA5 (both are byte-for-byte identical in
/// the printable ASCII range this format uses).
pub fn decode_padded_string(bytes: &[u8]) -> String {
    let trimmed_end = bytes
        .iter()
        .rposition(|&b| b != 0x00 && b != 0xFF && b != b' ')
        .map(|pos| pos + 1)
        .unwrap_or(0);
    bytes[..trimmed_end].iter().map(|&b| b as char).collect()
}

/// Nation code table (ISO-ish tachograph numbering). Only the codes that
/// appear in the worked examples are named; everything else decodes to
/// `Nation::Other`, never an error — an unrecognized nation byte is not a
/// decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Nation {
    Austria,
    Belgium,
    France,
    Germany,
    Italy,
    Netherlands,
    Spain,
    UnitedKingdom,
    Other(u8),
}

impl Nation {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => Nation::Austria,
            0x02 => Nation::Belgium,
            0x03 => Nation::France,
            0x04 => Nation::Germany,
            0x05 => Nation::Italy,
            0x06 => Nation::Netherlands,
            0x07 => Nation::Spain,
            0x1C => Nation::UnitedKingdom,
            other => Nation::Other(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Nation::Austria => 0x01,
            Nation::Belgium => 0x02,
            Nation::France => 0x03,
            Nation::Germany => 0x04,
            Nation::Italy => 0x05,
            Nation::Netherlands => 0x06,
            Nation::Spain => 0x07,
            Nation::UnitedKingdom => 0x1C,
            Nation::Other(code) => *code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_roundtrip() {
        assert_eq!(decode_bcd(&[0x20, 0x26, 0x01, 0x15]), Some(20260115));
        assert_eq!(decode_bcd(&[0xAB]), None);
    }

    #[test]
    fn datef_validates_month_and_day() {
        assert_eq!(
            decode_datef(&[0x19, 0x85, 0x03, 0x12]),
            NaiveDate::from_ymd_opt(1985, 3, 12)
        );
        assert_eq!(decode_datef(&[0x19, 0x85, 0x13, 0x12]), None);
        assert_eq!(decode_datef(&[0x19, 0x85, 0x03, 0x32]), None);
    }

    #[test]
    fn padded_string_strips_space_and_ff() {
        assert_eq!(decode_padded_string(b"AB123CD\0\0\0\0\0\0\0"), "AB123CD");
        assert_eq!(decode_padded_string(&[0xFF; 4]), "");
        assert_eq!(decode_padded_string(b"AB  "), "AB");
    }

    #[test]
    fn u24_reads_three_bytes_big_endian() {
        assert_eq!(read_u24_be(&[0x00, 0x27, 0x10], 0), Some(10000));
    }

    #[test]
    fn gnss_scaling() {
        let bytes = 123_456_789i32.to_be_bytes();
        let deg = read_i32_be_scaled(&bytes, 0).unwrap();
        assert!((deg - 12.3456789).abs() < 1e-9);
    }
}
