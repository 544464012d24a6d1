// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Fields still undocumented at the byte level (spec's Non-goals: "full
//! bit-exact support of still-undocumented G2.2 fields"). Used for
//! `TrailerRegistrations` and `LoadSensor`, which have no dedicated
//! data-model field. Under `permit_g2_2_heuristics`, chunks the payload at
//! the documented fallback record size (13 bytes, spec §9) so a later,
//! better-informed pass could still find record boundaries; otherwise
//! reports the whole block as a single opaque chunk.

use crate::result::{RawUnparsed, Warning};

const HEURISTIC_RECORD_SIZE: usize = 13;

pub struct UndocumentedResult {
    pub raw_chunks: Vec<RawUnparsed>,
    pub warnings: Vec<Warning>,
}

pub fn decode(tag: u16, payload: &[u8], offset: usize, permit_heuristics: bool) -> UndocumentedResult {
    let tag_hex = format!("{tag:#06x}");

    if permit_heuristics && !payload.is_empty() && payload.len() % HEURISTIC_RECORD_SIZE == 0 {
        let raw_chunks = payload
            .chunks(HEURISTIC_RECORD_SIZE)
            .enumerate()
            .map(|(i, chunk)| RawUnparsed {
                tag_hex: tag_hex.clone(),
                offset: offset + i * HEURISTIC_RECORD_SIZE,
                length: chunk.len(),
                bytes_hex: hex::encode(chunk),
            })
            .collect();
        return UndocumentedResult {
            raw_chunks,
            warnings: vec![Warning::HeuristicRecordSize {
                tag_hex,
                assumed_size: HEURISTIC_RECORD_SIZE,
            }],
        };
    }

    UndocumentedResult {
        raw_chunks: vec![RawUnparsed {
            tag_hex,
            offset,
            length: payload.len(),
            bytes_hex: hex::encode(payload),
        }],
        warnings: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_at_heuristic_size_when_permitted_and_divisible() {
        let payload = vec![0u8; HEURISTIC_RECORD_SIZE * 3];
        let result = decode(0x0527, &payload, 100, true);
        assert_eq!(result.raw_chunks.len(), 3);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn single_opaque_chunk_in_strict_mode() {
        let payload = vec![0u8; HEURISTIC_RECORD_SIZE * 3];
        let result = decode(0x0527, &payload, 100, false);
        assert_eq!(result.raw_chunks.len(), 1);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn non_divisible_length_falls_back_to_opaque_even_when_permitted() {
        let payload = vec![0u8; HEURISTIC_RECORD_SIZE * 3 + 1];
        let result = decode(0x0527, &payload, 0, true);
        assert_eq!(result.raw_chunks.len(), 1);
    }
}
