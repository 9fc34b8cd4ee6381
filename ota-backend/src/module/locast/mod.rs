//! Streaming service API client
//!
//! ## Main Components
//! - `AuthSession`: shared login token, refreshed lazily
//! - `LocastClient`: market list, location lookup, station guide and stream URLs
//! - `MarketBinding`: the market a location resolved to

mod types;
pub use types::{Geo, GeoResponse, MarketBinding, UserInfo};

mod session;
pub use session::{AuthSession, TOKEN_LIFETIME, validate_user};

mod playlist;
pub use playlist::{Variant, best_variant, parse_variants};

mod client;
pub use client::{API_BASE_URL, LocastClient, geo_url, stations_url, watch_url};
