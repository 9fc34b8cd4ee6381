//! Station channel resolution
//!
//! Turns raw streaming-service station records into stations carrying a
//! broadcast channel number, and keeps the resolved list cached per market.
//!
//! ## Main Components
//! - `CallsignParser`: callsign and subchannel extraction from station labels
//! - `ChannelResolver`: per-station channel numbering against the registry
//! - `StationCache`: periodically refreshed station list for one market

mod types;
pub use types::Station;

mod callsign;
pub use callsign::{CallsignParser, ParsedCallsign, direct_channel};

mod resolver;
pub use resolver::{ChannelDirectory, ChannelResolver, SYNTHETIC_CHANNEL_START};

mod cache;
pub use cache::{StationCache, StationSource};
