// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Associates each signed data block with its signature block (spec §4.5).
//! Cryptographic verification itself is delegated to a collaborator (spec
//! §6's "Boundary to signature verifier"); this module only locates and
//! pairs the byte ranges.

use crate::framing::FramedRecord;
use crate::registry::{data_tag_for_signature, is_signature_tag};
use crate::result::{SignatureBlock, SignatureStatus};

/// Pair every signature-tagged leaf record with the data tag it signs.
/// Pairing is tried by adjacency first (the signature block immediately
/// follows its data block in framing order), then by identical tag parity
/// (any earlier occurrence of the implied data tag); unmatched signatures
/// are retained but marked [`SignatureStatus::Orphan`].
pub fn pair_blocks(records: &[FramedRecord]) -> Vec<SignatureBlock> {
    let mut blocks = Vec::new();
    let mut seen_data_tags: Vec<u16> = Vec::new();

    for (index, record) in records.iter().enumerate() {
        if !is_signature_tag(record.tag) {
            seen_data_tags.push(record.tag);
            continue;
        }

        let implied_data_tag = data_tag_for_signature(record.tag);
        let adjacent_match = index > 0 && records[index - 1].tag == implied_data_tag;
        let parity_match = seen_data_tags.contains(&implied_data_tag);
        let status = if adjacent_match || parity_match {
            SignatureStatus::Paired
        } else {
            SignatureStatus::Orphan
        };

        blocks.push(SignatureBlock {
            data_tag: implied_data_tag,
            algorithm: None,
            signature_bytes: record.payload.clone(),
            status,
        });
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(tag: u16, payload: &[u8]) -> FramedRecord {
        FramedRecord {
            tag,
            payload: payload.to_vec(),
            offset: 0,
        }
    }

    #[test]
    fn pairs_adjacent_signature_with_preceding_data_block() {
        let records = vec![rec(0x0501, &[1, 2, 3]), rec(0x8501, &[0xAA; 16])];
        let blocks = pair_blocks(&records);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].data_tag, 0x0501);
        assert_eq!(blocks[0].status, SignatureStatus::Paired);
    }

    #[test]
    fn pairs_by_parity_when_not_adjacent() {
        let records = vec![
            rec(0x0501, &[1, 2, 3]),
            rec(0x0502, &[4, 5, 6]),
            rec(0x8501, &[0xAA; 16]),
        ];
        let blocks = pair_blocks(&records);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].status, SignatureStatus::Paired);
    }

    #[test]
    fn unmatched_signature_is_orphan() {
        let records = vec![rec(0x8599, &[0xAA; 16])];
        let blocks = pair_blocks(&records);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].status, SignatureStatus::Orphan);
    }
}
