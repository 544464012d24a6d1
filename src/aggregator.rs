// Copyright 2024-2026 tachodd Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Accumulates decoded records into the generation-neutral [`TachographFile`].
//! Owns the result exclusively during the decode pass (spec §3's
//! "Lifecycles").

use tracing::warn;

use crate::config::DecodeConfig;
use crate::framing::FramedRecord;
use crate::records::{self, DecodedRecord};
use crate::registry::{self, TagKind};
use crate::result::{Generation, RawUnparsed, TachographFile};
use crate::signature;

pub fn aggregate(records: &[FramedRecord], generation: Generation, config: &DecodeConfig) -> TachographFile {
    let mut file = TachographFile {
        generation: Some(generation),
        ..Default::default()
    };

    for record in records {
        if registry::is_signature_tag(record.tag) {
            continue; // handled by signature::pair_blocks below.
        }

        let Some(info) = registry::lookup(generation, record.tag) else {
            warn!(tag_hex = format!("{:#06x}", record.tag), offset = record.offset, "unknown tag, recovering as raw_unparsed");
            file.raw_unparsed.push(RawUnparsed {
                tag_hex: format!("{:#06x}", record.tag),
                offset: record.offset,
                length: record.payload.len(),
                bytes_hex: hex::encode(&record.payload),
            });
            continue;
        };

        let decoded = dispatch(info.kind, record, config);
        file.warnings.extend(decoded.warnings);

        match decoded.record {
            DecodedRecord::CardApplication(app) => file.card_application = Some(app),
            DecodedRecord::Driver(mut driver) => {
                // A licence (0x0521) may have arrived first and stashed a
                // bare shell; preserve it rather than clobbering it with
                // this record's default-empty licence.
                if let Some(existing) = file.driver.as_ref() {
                    driver.licence = existing.licence.clone();
                }
                file.driver = Some(*driver);
            }
            DecodedRecord::Licence(licence) => {
                if let Some(driver) = file.driver.as_mut() {
                    driver.licence = licence;
                } else {
                    // Licence tag arrived before identification; stash a
                    // bare driver shell so the licence isn't lost.
                    file.driver = Some(crate::result::Driver {
                        surname: String::new(),
                        first_names: String::new(),
                        birth_date: None,
                        birth_date_raw: [0; 4],
                        card_number: String::new(),
                        card_expiry: None,
                        issuing_nation: None,
                        preferred_language: String::new(),
                        licence,
                    });
                }
            }
            DecodedRecord::Events(mut events) => file.events.append(&mut events),
            DecodedRecord::Faults(mut faults) => file.faults.append(&mut faults),
            DecodedRecord::Activities(mut activities) => file.activities.append(&mut activities),
            DecodedRecord::Vehicles(mut vehicles) => file.vehicles_used.append(&mut vehicles),
            DecodedRecord::Places(mut places) => file.places.append(&mut places),
            DecodedRecord::GnssPoints(mut points) => file.gnss_points.append(&mut points),
            DecodedRecord::Calibrations(mut cals) => file.calibration_records.append(&mut cals),
            DecodedRecord::Undocumented => {
                let result = records::undocumented::decode(
                    record.tag,
                    &record.payload,
                    record.offset,
                    config.permit_g2_2_heuristics,
                );
                file.raw_unparsed.extend(result.raw_chunks);
                file.warnings.extend(result.warnings);
            }
        }
    }

    file.signature_blocks = signature::pair_blocks(records);
    file
}

fn dispatch(kind: TagKind, record: &FramedRecord, config: &DecodeConfig) -> records::Decoded {
    use records::*;
    match kind {
        TagKind::DriverCardApplicationIdentification => identification::decode_card_application(&record.payload),
        TagKind::CardEventData => events::decode(&record.payload),
        TagKind::CardFaultData => faults::decode(&record.payload),
        TagKind::CardDriverActivity => activity::decode(&record.payload),
        TagKind::CardVehiclesUsed => vehicles::decode(&record.payload),
        TagKind::CardPlaceDailyWorkPeriod => places::decode_daily_work_period(&record.payload),
        TagKind::Calibration => calibration::decode(&record.payload),
        TagKind::CardIdentification | TagKind::DriverCardHolderIdentification => {
            identification::decode_identification(&record.payload)
        }
        TagKind::CardDrivingLicenceInformation => identification::decode_licence(&record.payload),
        TagKind::GnssPlaces => places::decode_gnss_places(&record.payload),
        TagKind::LoadUnload => places::decode_load_unload(&record.payload),
        TagKind::BorderCrossings => places::decode_border_crossings(&record.payload),
        TagKind::GnssAccumulatedDriving => places::decode_gnss_accumulated_driving(&record.payload),
        TagKind::TrailerRegistrations | TagKind::LoadSensor => {
            let _ = config; // heuristic gating happens where Undocumented is handled.
            Decoded::new(DecodedRecord::Undocumented)
        }
    }
}
