//! Market mapping - bridges streaming-service market IDs to registry market names
//!
//! The streaming service identifies markets by numeric ID and its own naming,
//! while the facility registry uses Nielsen DMA names. The mapper matches the
//! two by fuzzy partial-ratio comparison.

mod types;
pub use types::{MarketId, MarketMapping, StreamingMarket};

mod mapper;
pub use mapper::{
    FIRST_WORD_MARKET_ID, MarketMapper, MarketSource, PERFECT_MATCH, map_markets, partial_ratio,
};
