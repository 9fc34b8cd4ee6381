//! Broadcast facility registry
//!
//! Downloads the FCC CDBS facility archive, keeps it cached on disk, and
//! indexes licensed TV facilities by (registry market, callsign).
//!
//! ## Main Components
//! - `FacilityRegistry`: refresh cycle, on-disk cache, atomic index swap
//! - `FacilityIndex`: immutable lookup table published by each refresh
//! - `parse_facilities`: flat-file parser and license filter

mod types;
pub use types::{ChannelLookup, FacilityRecord, FacilityService, LICENSED_STATUS};

mod parser;
pub use parser::{COLUMNS, ParsedFacilities, parse_facilities};

mod source;
pub use source::{FACILITIES_URL, FacilitySource, HttpFacilitySource, unzip_facilities};

mod registry;
pub use registry::{
    CHECK_INTERVAL, FacilityIndex, FacilityRegistry, MAX_CACHE_AGE, RefreshOutcome, RegistryStats,
};
