// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Byte-cursor framing: generation detection, STAP (G1) and BER-TLV
//! (G2/G2.2) header decode, container recursion, and the malformed-length
//! recovery path described in spec §4.1.

use tracing::{debug, warn};

use crate::result::{Generation, RawUnparsed};

/// A leaf (non-container) tag event, with its payload and absolute offset
/// into the original file — needed so the aggregator can assert the
/// covering property from spec §8 in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedRecord {
    pub tag: u16,
    pub payload: Vec<u8>,
    pub offset: usize,
}

/// First two bytes of the file select the generation (spec §4.1). Pure
/// function of those two bytes, per spec §8's "Laws".
pub fn detect_generation(bytes: &[u8]) -> Generation {
    match bytes.get(0..2) {
        Some([0x76, 0x21]) => Generation::G2,
        Some([0x76, 0x31]) => Generation::G2_2,
        _ => Generation::G1,
    }
}

/// Decode a 5-byte STAP header: 2-byte tag + 1-byte record type + 2-byte
/// length. Returns `(tag, length, header_len)`.
fn decode_stap_header(bytes: &[u8]) -> Option<(u16, usize, usize)> {
    if bytes.len() < 5 {
        return None;
    }
    let tag = u16::from_be_bytes([bytes[0], bytes[1]]);
    let length = u16::from_be_bytes([bytes[3], bytes[4]]) as usize;
    Some((tag, length, 5))
}

/// Decode a BER-TLV length field starting at `bytes[0]`: short form (high
/// bit clear, value is the length) or long form (high bit set, low 7 bits
/// are the number of following big-endian length bytes).
fn decode_ber_length(bytes: &[u8]) -> Option<(usize, usize)> {
    let first = *bytes.first()?;
    if first & 0x80 == 0 {
        return Some((first as usize, 1));
    }
    let num_len_bytes = (first & 0x7F) as usize;
    if num_len_bytes == 0 || num_len_bytes > 4 {
        // Indefinite form, or a length wider than this format ever uses.
        return None;
    }
    let len_bytes = bytes.get(1..1 + num_len_bytes)?;
    let mut length = 0usize;
    for &b in len_bytes {
        length = (length << 8) | b as usize;
    }
    Some((length, 1 + num_len_bytes))
}

/// Decode a BER-TLV header: 2-byte tag, then a BER length field. Returns
/// `(tag, length, header_len)`.
fn decode_ber_tlv_header(bytes: &[u8]) -> Option<(u16, usize, usize)> {
    if bytes.len() < 3 {
        return None;
    }
    let tag = u16::from_be_bytes([bytes[0], bytes[1]]);
    let (length, len_field_len) = decode_ber_length(&bytes[2..])?;
    Some((tag, length, 2 + len_field_len))
}

/// Fallback framing heuristic (spec §4.1): tried in order at a container
/// boundary where the generation's primary framing failed to bracket a
/// record. The first attempt whose declared length fits the remaining
/// bytes wins.
fn fallback_framing(bytes: &[u8], remaining: usize) -> Option<(u16, usize, usize)> {
    // 1. BER-TLV multi-byte (long-form) length.
    if let Some((tag, length, header_len)) = decode_ber_tlv_header(bytes) {
        if length + header_len <= remaining && bytes.get(2).is_some_and(|b| b & 0x80 != 0) {
            return Some((tag, length, header_len));
        }
    }
    // 2. 2-byte tag + 2-byte length (no record-type byte).
    if bytes.len() >= 4 {
        let tag = u16::from_be_bytes([bytes[0], bytes[1]]);
        let length = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        if length + 4 <= remaining {
            return Some((tag, length, 4));
        }
    }
    // 3. BER-TLV short-form length.
    if let Some((tag, length, header_len)) = decode_ber_tlv_header(bytes) {
        if length + header_len <= remaining {
            return Some((tag, length, header_len));
        }
    }
    None
}

/// Recursively walk `bytes` (a whole file, or a container's payload),
/// emitting leaf `FramedRecord`s and folding malformed regions into
/// `raw_unparsed`. `base_offset` is this slice's absolute offset in the
/// original file.
pub fn walk(
    bytes: &[u8],
    generation: Generation,
    base_offset: usize,
    raw_unparsed: &mut Vec<RawUnparsed>,
) -> Vec<FramedRecord> {
    let mut records = Vec::new();
    let mut cursor = 0usize;

    while cursor < bytes.len() {
        let remaining = &bytes[cursor..];
        let header = match generation {
            Generation::G1 => decode_stap_header(remaining),
            Generation::G2 | Generation::G2_2 => decode_ber_tlv_header(remaining),
        };

        let (tag, length, header_len) = match header.filter(|(_, len, hl)| len + hl <= remaining.len()) {
            Some(ok) => ok,
            None => match fallback_framing(remaining, remaining.len()) {
                Some(ok) => ok,
                None => {
                    warn!(
                        offset = base_offset + cursor,
                        remaining = remaining.len(),
                        "malformed record length, recovering remainder as raw_unparsed"
                    );
                    raw_unparsed.push(RawUnparsed {
                        tag_hex: String::new(),
                        offset: base_offset + cursor,
                        length: remaining.len(),
                        bytes_hex: hex::encode(remaining),
                    });
                    break;
                }
            },
        };

        let payload_start = cursor + header_len;
        let payload_end = payload_start + length;
        let payload = &bytes[payload_start..payload_end];
        let record_offset = base_offset + cursor;

        if is_padded_container(tag) {
            debug!(tag_hex = format!("{tag:#06x}"), offset = record_offset, "recursing into container");
            let inner = strip_container_padding(payload);
            let inner_offset = base_offset + payload_start + (payload.len() - inner.len());
            records.extend(walk(inner, generation, inner_offset, raw_unparsed));
        } else {
            debug!(tag_hex = format!("{tag:#06x}"), offset = record_offset, length, "dispatching leaf record");
            records.push(FramedRecord {
                tag,
                payload: payload.to_vec(),
                offset: record_offset,
            });
        }

        cursor = payload_end;
    }

    records
}

fn is_padded_container(tag: u16) -> bool {
    crate::registry::is_container(tag)
}

/// `0x7621`/`0x7631` containers prepend a 2-byte padding word when the
/// first byte is `0x00` (spec §4.1).
fn strip_container_padding(payload: &[u8]) -> &[u8] {
    if payload.first() == Some(&0x00) && payload.len() >= 2 {
        &payload[2..]
    } else {
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Generation detection is a pure function of the first two bytes
    /// (spec §8's "Laws"): any tail bytes, however they vary, must never
    /// change the verdict.
    #[quickcheck_macros::quickcheck]
    fn generation_detection_is_a_pure_function_of_the_first_two_bytes(first: u8, second: u8, tail: Vec<u8>) -> bool {
        let mut a = vec![first, second];
        a.extend_from_slice(&tail);
        let mut b = vec![first, second];
        b.extend(tail.iter().rev());
        detect_generation(&a) == detect_generation(&b)
    }

    #[test]
    fn detects_generations_from_first_two_bytes() {
        assert_eq!(detect_generation(&[0x76, 0x21, 0, 0]), Generation::G2);
        assert_eq!(detect_generation(&[0x76, 0x31, 0, 0]), Generation::G2_2);
        assert_eq!(detect_generation(&[0x05, 0x01, 0, 0]), Generation::G1);
        assert_eq!(detect_generation(&[]), Generation::G1);
    }

    #[test]
    fn stap_header_decodes_fixed_five_bytes() {
        let bytes = [0x05, 0x01, 0x00, 0x00, 0x1F];
        assert_eq!(decode_stap_header(&bytes), Some((0x0501, 31, 5)));
    }

    #[test]
    fn ber_tlv_short_form_length() {
        let bytes = [0x02, 0x01, 0x05, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA];
        assert_eq!(decode_ber_tlv_header(&bytes), Some((0x0201, 5, 3)));
    }

    #[test]
    fn ber_tlv_long_form_length() {
        let bytes = [0x02, 0x01, 0x82, 0x01, 0x00];
        assert_eq!(decode_ber_tlv_header(&bytes), Some((0x0201, 256, 5)));
    }

    #[test]
    fn walk_recovers_malformed_record_into_raw_unparsed() {
        let bytes = [0x05, 0x01, 0x00, 0xFF, 0xFF]; // claims 65535-byte payload
        let mut raw = Vec::new();
        let records = walk(&bytes, Generation::G1, 0, &mut raw);
        assert!(records.is_empty());
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].length, bytes.len());
    }

    #[test]
    fn walk_covers_every_byte_of_the_payload() {
        // One well-formed STAP record of 4 payload bytes, nothing else.
        let mut bytes = vec![0x05, 0x01, 0x00, 0x00, 0x04];
        bytes.extend_from_slice(&[1, 2, 3, 4]);
        let mut raw = Vec::new();
        let records = walk(&bytes, Generation::G1, 0, &mut raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].offset, 0);
        assert_eq!(records[0].payload, vec![1, 2, 3, 4]);
        assert!(raw.is_empty());
    }
}
