// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Decoders for `0x0501` (DriverCardApplicationIdentification), `0x0520`/
//! `0x0201` (CardIdentification + DriverCardHolderIdentification), and
//! `0x0521` (CardDrivingLicenceInformation).
//!
//! The application-identification record's internal fields aren't
//! described by spec §4.2 beyond naming the tag, so it's surfaced as its
//! hex payload rather than invented sub-fields.

use crate::primitives::{decode_datef, decode_padded_string, decode_time_real, Nation};
use crate::records::{Decoded, DecodedRecord};
use crate::result::{Driver, Licence, Warning};

pub fn decode_card_application(payload: &[u8]) -> Decoded {
    Decoded::new(DecodedRecord::CardApplication(hex::encode(payload)))
}

const IDENTIFICATION_ISSUING_NATION: usize = 0;
const IDENTIFICATION_CARD_NUMBER: std::ops::Range<usize> = 1..17;
const IDENTIFICATION_CARD_EXPIRY: std::ops::Range<usize> = 17..21;
const IDENTIFICATION_SURNAME: std::ops::Range<usize> = 21..57;
const IDENTIFICATION_FIRST_NAMES: std::ops::Range<usize> = 57..93;
const IDENTIFICATION_BIRTH_DATE: std::ops::Range<usize> = 93..97;
const IDENTIFICATION_PREFERRED_LANGUAGE: std::ops::Range<usize> = 97..99;

/// Decode `CardIdentification` + `DriverCardHolderIdentification`. Per
/// spec §4.2's open question, this tag is dispatched here and *only* here —
/// never folded into the vehicle or event decoders the way the original
/// Python source collapsed `0x0501`/`0x0502`/`0x0520` together.
pub fn decode_identification(payload: &[u8]) -> Decoded {
    let mut warnings = Vec::new();

    let issuing_nation = payload
        .get(IDENTIFICATION_ISSUING_NATION)
        .map(|&b| Nation::from_code(b));
    let card_number = payload
        .get(IDENTIFICATION_CARD_NUMBER)
        .map(decode_padded_string)
        .unwrap_or_default();
    let card_expiry = payload
        .get(IDENTIFICATION_CARD_EXPIRY)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .and_then(|b| decode_datef(&b));
    let surname = payload
        .get(IDENTIFICATION_SURNAME)
        .map(decode_padded_string)
        .unwrap_or_default();
    let first_names = payload
        .get(IDENTIFICATION_FIRST_NAMES)
        .map(decode_padded_string)
        .unwrap_or_default();

    let birth_date_raw: [u8; 4] = payload
        .get(IDENTIFICATION_BIRTH_DATE)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .unwrap_or([0, 0, 0, 0]);
    let birth_date = decode_birth_date(birth_date_raw, &mut warnings);

    let preferred_language = payload
        .get(IDENTIFICATION_PREFERRED_LANGUAGE)
        .map(decode_padded_string)
        .unwrap_or_default();

    let driver = Driver {
        surname,
        first_names,
        birth_date,
        birth_date_raw,
        card_number,
        card_expiry,
        issuing_nation,
        preferred_language,
        licence: Licence::default(),
    };

    Decoded::with_warnings(DecodedRecord::Driver(Box::new(driver)), warnings)
}

/// CardHolderBirthDate decoding per spec §4.2/§9: attempt `Datef` first
/// (validated month/day), fall back to `TimeReal` interpretation, record
/// both the attempted value and the raw bytes.
fn decode_birth_date(raw: [u8; 4], warnings: &mut Vec<Warning>) -> Option<chrono::NaiveDate> {
    if let Some(date) = decode_datef(&raw) {
        return Some(date);
    }
    warnings.push(Warning::BirthDateFallbackToTimeReal { raw });
    let seconds = u32::from_be_bytes(raw);
    Some(decode_time_real(seconds).date_naive())
}

const LICENCE_NATION: usize = 0;
const LICENCE_AUTHORITY: std::ops::Range<usize> = 1..37;
const LICENCE_NUMBER: std::ops::Range<usize> = 37..53;

pub fn decode_licence(payload: &[u8]) -> Decoded {
    let nation = payload.get(LICENCE_NATION).map(|&b| Nation::from_code(b));
    let authority = payload
        .get(LICENCE_AUTHORITY)
        .map(decode_padded_string)
        .unwrap_or_default();
    let number = payload
        .get(LICENCE_NUMBER)
        .map(decode_padded_string)
        .unwrap_or_default();

    Decoded::new(DecodedRecord::Licence(Licence {
        authority,
        nation,
        number,
    }))
}
