// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Decoder for European digital tachograph (`.ddd`) download files — G1
//! (Annex 1B), G2 (Annex 1C), and G2.2 (Reg. 2023/980) — and an EU Reg.
//! 561/2006 driving/rest-time compliance engine.
//!
//! The pipeline is a pure function of the input bytes: [`framing`] walks
//! the file's STAP (G1) or BER-TLV (G2/G2.2) framing into `(tag, payload)`
//! pairs, [`registry`] dispatches each pair to its decoder in [`records`],
//! [`aggregator`] folds the results into a generation-neutral
//! [`result::TachographFile`], [`timeline`] turns the decoded activity
//! buffer into a contiguous [`result::Activity`] sequence, and
//! [`compliance`] evaluates that sequence against 561/2006. No step
//! performs I/O or holds state across files — see the crate's
//! "Concurrency & resource model" in its design notes, and [`decode_many`]
//! for the optional fleet-level fan-out.

pub mod aggregator;
pub mod compliance;
pub mod config;
pub mod error;
pub mod framing;
pub mod primitives;
pub mod records;
pub mod registry;
pub mod result;
pub mod signature;
pub mod timeline;

pub use config::DecodeConfig;
pub use error::DecodeError;
pub use result::{Activity, ComplianceReport, Generation, Infraction, TachographFile};

/// Minimum bytes needed to even attempt reading one record header: a STAP
/// header is 5 bytes, a BER-TLV header is at least 3 (2-byte tag + 1-byte
/// short-form length).
fn min_header_len(generation: Generation) -> usize {
    match generation {
        Generation::G1 => 5,
        Generation::G2 | Generation::G2_2 => 3,
    }
}

/// Decode a `.ddd` byte buffer into a generation-neutral [`TachographFile`]
/// (spec §6). Per-record problems never fail the whole decode — they're
/// folded into `raw_unparsed` or `warnings` on the result (spec §7 tiers 1
/// and 3). Only the two structural failures in spec §7 tier 2 — an empty
/// file, or a file too short to contain even one record header — produce
/// an `Err`.
pub fn decode(bytes: &[u8], config: &DecodeConfig) -> Result<TachographFile, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::EmptyFile);
    }

    let generation = framing::detect_generation(bytes);
    let min_header = min_header_len(generation);
    if bytes.len() < min_header {
        return Err(DecodeError::malformed(
            0,
            format!("file of {} bytes is shorter than a single {generation} record header ({min_header} bytes)", bytes.len()),
        ));
    }

    let mut raw_unparsed = Vec::new();
    let records = framing::walk(bytes, generation, 0, &mut raw_unparsed);
    let mut file = aggregator::aggregate(&records, generation, config);
    file.raw_unparsed.extend(raw_unparsed);
    Ok(file)
}

/// Build the contiguous driving/rest timeline from a decoded file's
/// activity records (spec §4.3).
pub fn build_timeline(file: &TachographFile) -> Vec<Activity> {
    timeline::build(&file.activities)
}

/// Evaluate a built timeline against EU Reg. 561/2006 (spec §4.4).
/// `daily_records` (typically `&file.activities`, the same slice
/// [`build_timeline`] was built from) supplies the `day_distance_km`
/// figures summed into `ComplianceReport`'s per-week `distance_km`
/// aggregate (spec §6).
pub fn evaluate_compliance(activities: &[Activity], daily_records: &[result::DailyActivityRecord]) -> ComplianceReport {
    compliance::evaluate(activities, daily_records)
}

/// Fleet-level orchestration (spec §5): decode a batch of independent files
/// across a `rayon` thread pool. Each file still goes through the same
/// single-threaded, non-suspending [`decode`] — no state is shared between
/// files, so no locking is required.
#[cfg(feature = "parallel")]
pub fn decode_many(files: &[Vec<u8>], config: &DecodeConfig) -> Vec<Result<TachographFile, DecodeError>> {
    use rayon::prelude::*;
    files.par_iter().map(|bytes| decode(bytes, config)).collect()
}
