//! Station cache - resolved station list of one bound market
//!
//! With caching enabled the list is refreshed in the background and reads
//! return the current snapshot. With caching disabled every read fetches and
//! resolves the list again.

use super::resolver::ChannelResolver;
use super::types::Station;
use crate::error::TunerResult;
use crate::module::locast::MarketBinding;
use crate::module::scheduled::ScheduledTaskManager;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Source of the raw station list for a market
#[async_trait]
pub trait StationSource: Send + Sync {
    async fn fetch_stations(&self, binding: &MarketBinding) -> TunerResult<Vec<Station>>;
}

pub struct StationCache {
    binding: MarketBinding,
    source: Arc<dyn StationSource>,
    resolver: Arc<ChannelResolver>,
    enabled: bool,
    interval: Duration,

    /// Last resolved list; replaced wholesale on refresh
    stations: RwLock<Arc<Vec<Station>>>,
}

impl StationCache {
    pub fn new(
        binding: MarketBinding,
        source: Arc<dyn StationSource>,
        resolver: Arc<ChannelResolver>,
        enabled: bool,
        interval: Duration,
    ) -> Self {
        Self {
            binding,
            source,
            resolver,
            enabled,
            interval,
            stations: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub fn binding(&self) -> &MarketBinding {
        &self.binding
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Initial fill and periodic refresh. Does nothing when caching is off.
    pub async fn start(self: &Arc<Self>, tasks: &mut ScheduledTaskManager) -> TunerResult<()> {
        if !self.enabled {
            tracing::info!(
                "Station caching disabled for market {}, lists are fetched per read",
                self.binding.market_id
            );
            return Ok(());
        }

        self.refresh().await?;

        let cache = Arc::clone(self);
        tasks.spawn_periodic(
            format!("station-cache-{}", self.binding.market_id),
            self.interval,
            move || {
                let cache = cache.clone();
                async move { cache.refresh().await }
            },
        );

        Ok(())
    }

    /// Fetch, resolve and publish a new list. On failure the previous list
    /// stays in place and the error is returned to the caller to report.
    pub async fn refresh(&self) -> TunerResult<()> {
        let stations = self.fetch_resolved().await?;

        tracing::info!(
            "Cached {} stations for market {} ({})",
            stations.len(),
            self.binding.market_id,
            self.binding.city
        );

        *self.stations.write().await = Arc::new(stations);
        Ok(())
    }

    pub async fn get_stations(&self) -> TunerResult<Arc<Vec<Station>>> {
        if self.enabled {
            return Ok(self.stations.read().await.clone());
        }
        Ok(Arc::new(self.fetch_resolved().await?))
    }

    async fn fetch_resolved(&self) -> TunerResult<Vec<Station>> {
        let stations = self.source.fetch_stations(&self.binding).await?;
        Ok(self.resolver.resolve(&self.binding, stations).await)
    }
}
