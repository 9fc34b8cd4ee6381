use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Facility status of a licensed station
pub const LICENSED_STATUS: &str = "LICEN";

/// TV service types kept in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacilityService {
    /// Digital television
    DT,
    /// TV translator
    TX,
    /// Analog television
    TV,
    /// TV booster
    TB,
    /// Low power digital
    LD,
    /// Digital Class A
    DC,
}

impl FacilityService {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "DT" => Some(Self::DT),
            "TX" => Some(Self::TX),
            "TV" => Some(Self::TV),
            "TB" => Some(Self::TB),
            "LD" => Some(Self::LD),
            "DC" => Some(Self::DC),
            _ => None,
        }
    }
}

/// One licensed broadcast facility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub facility_id: String,
    /// Callsign with any "-TV"-style suffix removed
    pub callsign: String,
    /// Physical broadcast channel ("fac_channel")
    pub channel: Option<String>,
    /// Virtual channel; present for digital facilities only
    pub virtual_channel: Option<String>,
    /// Nielsen DMA name
    pub market: String,
    pub service: FacilityService,
    pub license_expiration: NaiveDate,
    pub city: String,
    pub state: String,
    pub network: Option<String>,
}

impl FacilityRecord {
    pub fn is_digital(&self) -> bool {
        self.virtual_channel.is_some()
    }

    /// Last instant the license is valid: 23:59:59 on the expiration date
    pub fn license_valid_until(&self) -> NaiveDateTime {
        self.license_expiration.and_time(end_of_day())
    }

    pub fn is_licensed_at(&self, now: NaiveDateTime) -> bool {
        now <= self.license_valid_until()
    }

    /// Channel number as reported to the HTTP layer: the virtual channel for
    /// digital facilities, the broadcast channel otherwise
    pub fn channel_lookup(&self) -> Option<ChannelLookup> {
        match (&self.virtual_channel, &self.channel) {
            (Some(virtual_channel), _) => Some(ChannelLookup {
                channel: virtual_channel.clone(),
                analog: false,
            }),
            (None, Some(channel)) => Some(ChannelLookup {
                channel: channel.clone(),
                analog: true,
            }),
            (None, None) => None,
        }
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default()
}

/// Channel number answer for a (market, callsign) lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLookup {
    pub channel: String,
    pub analog: bool,
}
