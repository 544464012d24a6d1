// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! The `(generation, tag)` → decoder table. Dispatch is an explicit match,
//! never reflection or a trait-object lookup — see spec §9's "Dynamic
//! dispatch by tag" design note.

use crate::result::Generation;

/// Which record decoder a leaf tag routes to. The framing reader only needs
/// to know whether a tag is a container (to recurse); the aggregator uses
/// the full `TagKind` to call the right decoder in `records::*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    DriverCardApplicationIdentification,
    CardEventData,
    CardFaultData,
    CardDriverActivity,
    CardVehiclesUsed,
    CardPlaceDailyWorkPeriod,
    Calibration,
    CardIdentification,
    CardDrivingLicenceInformation,
    DriverCardHolderIdentification,
    GnssPlaces,
    LoadUnload,
    TrailerRegistrations,
    BorderCrossings,
    LoadSensor,
    GnssAccumulatedDriving,
}

#[derive(Debug, Clone, Copy)]
pub struct TagInfo {
    pub name: &'static str,
    pub kind: TagKind,
}

/// The two container tags that prepend an optional 2-byte padding word
/// (spec §4.1) and recurse back through the framing reader.
pub const CONTAINER_TAGS: [u16; 2] = [0x7621, 0x7631];

pub fn is_container(tag: u16) -> bool {
    CONTAINER_TAGS.contains(&tag)
}

/// Look up the decoder a `(generation, tag)` pair routes to. Returns `None`
/// for unknown tags, which the aggregator folds into `raw_unparsed` rather
/// than treating as an error (spec §7, tier 1).
///
/// Mapping is deliberately NOT shared between generations for the
/// identification tags: `0x0501`/`0x0502`/`0x0520` must not collapse onto a
/// single "identification" decoder the way the original Python source did
/// (spec §9's "Open question" — Annex-1B mapping here is authoritative).
pub fn lookup(generation: Generation, tag: u16) -> Option<TagInfo> {
    use Generation::*;
    use TagKind::*;
    let (name, kind) = match (generation, tag) {
        (G1, 0x0501) => ("DriverCardApplicationIdentification", DriverCardApplicationIdentification),
        (G1, 0x0502) => ("CardEventData", CardEventData),
        (G1, 0x0503) => ("CardFaultData", CardFaultData),
        (G1, 0x0504) => ("CardDriverActivity", CardDriverActivity),
        (G1, 0x0505) => ("CardVehiclesUsed", CardVehiclesUsed),
        (G1, 0x0506) => ("CardPlaceDailyWorkPeriod", CardPlaceDailyWorkPeriod),
        (G1, 0x050C) => ("SpecificConditions", Calibration),
        (G1, 0x0520) => ("CardIdentification", CardIdentification),
        (G1, 0x0521) => ("CardDrivingLicenceInformation", CardDrivingLicenceInformation),

        (G2 | G2_2, 0x0201) => ("DriverCardHolderIdentification", DriverCardHolderIdentification),
        (G2 | G2_2, 0x0225) => ("GnssPlaces", GnssPlaces),
        (G2 | G2_2, 0x0226) => ("LoadUnload", LoadUnload),
        (G2 | G2_2, 0x0227) => ("TrailerRegistrations", TrailerRegistrations),
        (G2 | G2_2, 0x0228) => ("BorderCrossings", BorderCrossings),
        (G2 | G2_2, 0x0524) => ("CardDriverActivity", CardDriverActivity),

        (G2_2, 0x0525) => ("GnssAccumulatedDriving", GnssAccumulatedDriving),
        (G2_2, 0x0526) => ("LoadUnload", LoadUnload),
        (G2_2, 0x0527) => ("TrailerRegistrations", TrailerRegistrations),
        (G2_2, 0x0528) => ("GnssPlaces", GnssPlaces),
        (G2_2, 0x0529) => ("LoadSensor", LoadSensor),
        (G2_2, 0x052A) => ("BorderCrossings", BorderCrossings),

        // G1's CardEventData/CardVehiclesUsed/CardPlaceDailyWorkPeriod tag
        // numbers are also accepted verbatim in a G2/G2.2 file's legacy
        // block if present, since several VU vendors reuse them unchanged.
        (G2 | G2_2, 0x0502) => ("CardEventData", CardEventData),
        (G2 | G2_2, 0x0503) => ("CardFaultData", CardFaultData),
        (G2 | G2_2, 0x0505) => ("CardVehiclesUsed", CardVehiclesUsed),
        (G2 | G2_2, 0x0506) => ("CardPlaceDailyWorkPeriod", CardPlaceDailyWorkPeriod),
        (G2 | G2_2, 0x050C) => ("SpecificConditions", Calibration),
        (G2 | G2_2, 0x0521) => ("CardDrivingLicenceInformation", CardDrivingLicenceInformation),

        _ => return None,
    };
    Some(TagInfo { name, kind })
}

/// The BER-TLV class/construction bit (top bit of the tag's first byte).
/// We model spec §4.5's "signature-marker bit" as this bit: none of the
/// registered data tags (all `< 0x8000`) set it, so `data_tag | 0x8000`
/// can never collide with a real data tag the way an arithmetic
/// low-bit-toggle would among this format's densely packed tag numbers.
pub const SIGNATURE_MARKER_BIT: u16 = 0x8000;

/// The companion signature tag for a signed data tag (spec §4.5).
/// Adjacency is tried first by `signature::pair_blocks`; matching on this
/// computed tag is only the "identical tag parity" fallback.
pub fn signature_tag_for(data_tag: u16) -> u16 {
    data_tag | SIGNATURE_MARKER_BIT
}

pub fn is_signature_tag(tag: u16) -> bool {
    tag & SIGNATURE_MARKER_BIT != 0
}

pub fn data_tag_for_signature(signature_tag: u16) -> u16 {
    signature_tag & !SIGNATURE_MARKER_BIT
}
