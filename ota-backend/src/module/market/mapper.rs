//! Market mapper - fuzzy matching of streaming market names to registry names
//!
//! Handles the mapping between:
//! - Streaming markets (e.g. 506 "Boston", 539 "Tampa Bay")
//! - Registry market names (e.g. "BOSTON (MANCHESTER)", "TAMPA-ST. PETE (SARASOTA)")

use super::types::{MarketId, MarketMapping, StreamingMarket};
use crate::error::{TunerError, TunerResult};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use strsim::normalized_levenshtein;
use tokio::sync::OnceCell;

/// Score of a full substring match
pub const PERFECT_MATCH: u8 = 100;

/// Market whose streaming name carries an extra word the registry lacks
/// ("Tampa Bay" vs "TAMPA-ST. PETE"); only its first word is matched.
pub const FIRST_WORD_MARKET_ID: MarketId = 539;

/// Source of the streaming-service market list
#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn fetch_markets(&self) -> TunerResult<Vec<StreamingMarket>>;
}

/// Market mapper
pub struct MarketMapper {
    source: Arc<dyn MarketSource>,

    /// Streaming market list, fetched once for the process lifetime
    markets: OnceCell<Vec<StreamingMarket>>,
}

impl MarketMapper {
    pub fn new(source: Arc<dyn MarketSource>) -> Self {
        Self {
            source,
            markets: OnceCell::new(),
        }
    }

    /// Streaming markets, fetched on first use
    pub async fn markets(&self) -> TunerResult<&[StreamingMarket]> {
        let markets = self
            .markets
            .get_or_try_init(|| async {
                let markets = self.source.fetch_markets().await?;
                tracing::info!("Loaded {} streaming markets", markets.len());
                Ok::<_, TunerError>(markets)
            })
            .await?;
        Ok(markets.as_slice())
    }

    /// Build the mapping against the given registry market names.
    ///
    /// Every streaming market must match; the first unmatched market aborts
    /// the build.
    pub async fn build(&self, registry_markets: &BTreeSet<String>) -> TunerResult<MarketMapping> {
        let markets = self.markets().await?;
        map_markets(markets, registry_markets)
    }
}

/// Match each streaming market to the first registry name (in sorted order)
/// with a perfect partial ratio.
pub fn map_markets(
    markets: &[StreamingMarket],
    registry_markets: &BTreeSet<String>,
) -> TunerResult<MarketMapping> {
    let mut mapping = MarketMapping::default();

    for market in markets {
        let target = match_target(market);

        let matched = registry_markets
            .iter()
            .find(|candidate| partial_ratio(&target, &candidate.to_lowercase()) == PERFECT_MATCH);

        match matched {
            Some(registry_name) => {
                tracing::debug!(
                    "Market {} '{}' -> '{}'",
                    market.id,
                    market.name,
                    registry_name
                );
                mapping.insert(market.id, registry_name.clone());
            }
            None => {
                tracing::error!(
                    "No registry market matches {} '{}'",
                    market.id,
                    market.name
                );
                return Err(TunerError::UnmatchedMarket {
                    id: market.id,
                    name: market.name.clone(),
                });
            }
        }
    }

    tracing::info!(
        "Mapped {} streaming markets onto {} registry markets",
        mapping.len(),
        registry_markets.len()
    );

    Ok(mapping)
}

/// Lower-cased string the market is matched by
fn match_target(market: &StreamingMarket) -> String {
    let name = if market.id == FIRST_WORD_MARKET_ID {
        market.name.split_whitespace().next().unwrap_or_default()
    } else {
        market.name.as_str()
    };
    name.to_lowercase()
}

/// Partial ratio (0-100) of the shorter string against every same-length
/// window of the longer one. Only a true substring scores 100.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };

    if shorter.is_empty() {
        return 0;
    }
    if longer.contains(shorter) {
        return PERFECT_MATCH;
    }

    let short_len = shorter.chars().count();
    let long_chars: Vec<char> = longer.chars().collect();

    let best = (0..=long_chars.len() - short_len)
        .map(|start| {
            let window: String = long_chars[start..start + short_len].iter().collect();
            normalized_levenshtein(shorter, &window)
        })
        .fold(0.0_f64, f64::max);

    ((best * 100.0).round() as u8).min(PERFECT_MATCH - 1)
}
