// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

/// Decode-time policy knobs. Threaded explicitly through [`crate::decode`]
/// rather than read from global/thread-local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeConfig {
    /// When a G2.2 record's declared length doesn't match any known layout,
    /// fall back to the `len % 13 == 0 => rec_size = 13` heuristic (see
    /// `records::activity`) instead of surfacing the block as
    /// `raw_unparsed`. Default on, per spec §9.
    pub permit_g2_2_heuristics: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            permit_g2_2_heuristics: true,
        }
    }
}

impl DecodeConfig {
    /// Strict mode: unknown layouts always surface as `raw_unparsed`.
    pub fn strict() -> Self {
        Self {
            permit_g2_2_heuristics: false,
        }
    }
}
