//! Read entry points used by the device-emulation HTTP layer

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{TunerError, TunerResult};
use crate::module::fcc::{ChannelLookup, FacilityRegistry};
use crate::module::locast::MarketBinding;
use crate::module::market::MarketId;
use crate::module::scheduled::ScheduledTaskManager;
use crate::module::station::{Station, StationCache};

/// Bound markets and the shared facility registry
pub struct TunerService {
    registry: Arc<FacilityRegistry>,
    markets: BTreeMap<MarketId, Arc<StationCache>>,
}

impl TunerService {
    pub fn new(registry: Arc<FacilityRegistry>) -> Self {
        Self {
            registry,
            markets: BTreeMap::new(),
        }
    }

    /// Start the cache and register it. A market that is already bound keeps
    /// its first cache; the new one is never started and `Ok(false)` is
    /// returned.
    pub async fn bind(
        &mut self,
        cache: Arc<StationCache>,
        tasks: &mut ScheduledTaskManager,
    ) -> TunerResult<bool> {
        let market_id = cache.binding().market_id;
        if self.contains(market_id) {
            tracing::warn!(
                "{} resolves to already bound market {}, skipping",
                cache.binding().city,
                market_id
            );
            return Ok(false);
        }

        cache.start(tasks).await?;
        self.markets.insert(market_id, cache);
        Ok(true)
    }

    pub fn contains(&self, market_id: MarketId) -> bool {
        self.markets.contains_key(&market_id)
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    pub fn bindings(&self) -> Vec<&MarketBinding> {
        self.markets.values().map(|cache| cache.binding()).collect()
    }

    pub async fn get_stations(&self, market_id: MarketId) -> TunerResult<Arc<Vec<Station>>> {
        let cache = self
            .markets
            .get(&market_id)
            .ok_or(TunerError::UnknownMarket(market_id))?;
        cache.get_stations().await
    }

    pub async fn channel_lookup(&self, market_id: MarketId, callsign: &str) -> Option<ChannelLookup> {
        self.registry.channel_lookup(market_id, callsign).await
    }
}
