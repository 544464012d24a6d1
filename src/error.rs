// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Structural decode failure: the file cannot be treated as a tachograph
/// download at all. Recoverable per-record problems never produce this —
/// see [`crate::result::Warning`] and `raw_unparsed` for those.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DecodeError {
    #[error("malformed file at offset {offset}: {reason}")]
    MalformedFile { offset: usize, reason: String },

    #[error("file is empty")]
    EmptyFile,
}

impl DecodeError {
    pub fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedFile {
            offset,
            reason: reason.into(),
        }
    }
}
