//! Facility flat-file parser
//!
//! The FCC file has one facility per line, pipe separated, and every line is
//! terminated by `^|`.

use super::types::{FacilityRecord, FacilityService, LICENSED_STATUS};
use crate::error::{TunerError, TunerResult};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;

pub const COLUMNS: [&str; 31] = [
    "comm_city",
    "comm_state",
    "eeo_rpt_ind",
    "fac_address1",
    "fac_address2",
    "fac_callsign",
    "fac_channel",
    "fac_city",
    "fac_country",
    "fac_frequency",
    "fac_service",
    "fac_state",
    "fac_status_date",
    "fac_type",
    "facility_id",
    "lic_expiration_date",
    "fac_status",
    "fac_zip1",
    "fac_zip2",
    "station_type",
    "assoc_facility_id",
    "callsign_eff_date",
    "tsid_ntsc",
    "tsid_dtv",
    "digital_status",
    "sat_tv",
    "network_affil",
    "nielsen_dma",
    "tv_virtual_channel",
    "last_change_date",
    "end_of_record",
];

// The trailing `|` after the end-of-record marker yields one extra empty field
const FIELDS_PER_LINE: usize = COLUMNS.len() + 1;

const COMM_CITY: usize = 0;
const COMM_STATE: usize = 1;
const FAC_CALLSIGN: usize = 5;
const FAC_CHANNEL: usize = 6;
const FAC_SERVICE: usize = 10;
const FACILITY_ID: usize = 14;
const LIC_EXPIRATION_DATE: usize = 15;
const FAC_STATUS: usize = 16;
const NETWORK_AFFIL: usize = 26;
const NIELSEN_DMA: usize = 27;
const TV_VIRTUAL_CHANNEL: usize = 28;

const DATE_FORMAT: &str = "%m/%d/%Y";

/// Result of one parse pass
#[derive(Debug, Clone, Default)]
pub struct ParsedFacilities {
    /// Licensed, unexpired TV facilities in file order
    pub facilities: Vec<FacilityRecord>,

    /// Market names of every licensed TV facility, expired or not
    pub markets: BTreeSet<String>,

    pub lines: u64,
}

/// Parse the facility file, keeping facilities whose license is valid at `now`.
///
/// Any line with the wrong column count aborts the whole parse.
pub fn parse_facilities(content: &str, now: NaiveDateTime) -> TunerResult<ParsedFacilities> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut parsed = ParsedFacilities::default();
    let mut expired = 0usize;

    for result in reader.records() {
        let record = result.map_err(|e| TunerError::Archive(format!("unreadable facility data: {}", e)))?;
        let line = record.position().map_or(parsed.lines + 1, |p| p.line());
        parsed.lines += 1;

        if record.len() != FIELDS_PER_LINE {
            return Err(TunerError::MalformedFacilityLine {
                line,
                expected: FIELDS_PER_LINE,
                found: record.len(),
            });
        }

        let field = |index: usize| record.get(index).unwrap_or_default();

        let expiration = field(LIC_EXPIRATION_DATE);
        if expiration.is_empty() || field(FAC_STATUS) != LICENSED_STATUS {
            continue;
        }
        let Some(service) = FacilityService::from_code(field(FAC_SERVICE)) else {
            continue;
        };

        let market = field(NIELSEN_DMA);
        if !market.is_empty() {
            parsed.markets.insert(market.to_string());
        }

        let license_expiration = NaiveDate::parse_from_str(expiration, DATE_FORMAT).map_err(|_| {
            TunerError::InvalidExpirationDate {
                line,
                value: expiration.to_string(),
            }
        })?;

        let facility = FacilityRecord {
            facility_id: field(FACILITY_ID).to_string(),
            callsign: strip_callsign_suffix(field(FAC_CALLSIGN)).to_string(),
            channel: non_empty(field(FAC_CHANNEL)),
            virtual_channel: non_empty(field(TV_VIRTUAL_CHANNEL)),
            market: market.to_string(),
            service,
            license_expiration,
            city: field(COMM_CITY).to_string(),
            state: field(COMM_STATE).to_string(),
            network: non_empty(field(NETWORK_AFFIL)),
        };

        if facility.is_licensed_at(now) {
            parsed.facilities.push(facility);
        } else {
            expired += 1;
        }
    }

    tracing::debug!(
        "Parsed {} facility lines: {} kept, {} expired, {} markets",
        parsed.lines,
        parsed.facilities.len(),
        expired,
        parsed.markets.len()
    );

    Ok(parsed)
}

/// "KWWT-TV" -> "KWWT"
fn strip_callsign_suffix(callsign: &str) -> &str {
    callsign.split('-').next().unwrap_or(callsign)
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
