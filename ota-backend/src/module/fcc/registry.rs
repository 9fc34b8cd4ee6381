//! Facility registry - refresh cycle and indexed lookups
//!
//! Each refresh builds a complete new `FacilityIndex` off-lock and publishes it
//! with a single swap, so readers see either the old or the new index.

use super::parser::parse_facilities;
use super::source::{FacilitySource, unzip_facilities};
use super::types::{ChannelLookup, FacilityRecord};
use crate::error::{TunerError, TunerResult};
use crate::module::market::{MarketId, MarketMapper, MarketMapping};
use crate::module::scheduled::ScheduledTaskManager;
use crate::module::station::ChannelDirectory;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

/// Cached archive older than this is downloaded again
pub const MAX_CACHE_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// How often the cache age is checked
pub const CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

const CACHE_FILE: &str = "facilities.zip";

/// Immutable facility lookup table
#[derive(Debug, Default)]
pub struct FacilityIndex {
    /// (registry market, callsign) -> facility
    facilities: HashMap<(String, String), FacilityRecord>,
    mapping: MarketMapping,
    built_at: Option<DateTime<Local>>,
}

impl FacilityIndex {
    /// Index facilities by (market, callsign). A later facility with the same
    /// key replaces an earlier one.
    pub fn build(facilities: Vec<FacilityRecord>, mapping: MarketMapping) -> Self {
        let mut index = HashMap::with_capacity(facilities.len());
        let mut replaced = 0usize;

        for facility in facilities {
            let key = (facility.market.clone(), facility.callsign.clone());
            if let Some(previous) = index.insert(key, facility) {
                replaced += 1;
                tracing::debug!(
                    "Facility {} replaced earlier entry for {} in {}",
                    previous.facility_id,
                    previous.callsign,
                    previous.market
                );
            }
        }

        if replaced > 0 {
            tracing::warn!(
                "{} facilities shared a (market, callsign) key with an earlier one; kept the latest",
                replaced
            );
        }

        Self {
            facilities: index,
            mapping,
            built_at: Some(Local::now()),
        }
    }

    /// Facility for (market, callsign) whose license is still valid at `now`.
    /// Licenses that lapse after the index was built are filtered here.
    pub fn lookup(
        &self,
        market: MarketId,
        callsign: &str,
        now: NaiveDateTime,
    ) -> Option<&FacilityRecord> {
        let market_name = self.mapping.registry_name(market)?;
        self.facilities
            .get(&(market_name.to_string(), callsign.to_string()))
            .filter(|facility| facility.is_licensed_at(now))
    }

    pub fn market_name(&self, market: MarketId) -> Option<&str> {
        self.mapping.registry_name(market)
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }

    /// False only for the placeholder published before the first build
    pub fn is_built(&self) -> bool {
        self.built_at.is_some()
    }
}

/// What a refresh call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new archive was downloaded and indexed
    Downloaded,
    /// The index was built from the fresh on-disk cache
    LoadedFromCache,
    /// Cache is fresh and already indexed
    Unchanged,
    /// Download failed; the previous (stale) data stays in use
    KeptStale,
}

#[derive(Debug, Clone)]
pub struct RegistryStats {
    pub facilities: usize,
    pub markets: usize,
    pub built_at: Option<DateTime<Local>>,
}

impl std::fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Facilities: {}, Markets: {}, Built: {}",
            self.facilities,
            self.markets,
            self.built_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "never".to_string())
        )
    }
}

/// Facility registry
pub struct FacilityRegistry {
    source: Arc<dyn FacilitySource>,
    mapper: MarketMapper,
    cache_file: PathBuf,
    max_cache_age: Duration,

    /// Published index; replaced wholesale on rebuild
    index: RwLock<Arc<FacilityIndex>>,

    /// Serializes refresh cycles
    refresh_lock: Mutex<()>,
}

impl FacilityRegistry {
    pub fn new(
        source: Arc<dyn FacilitySource>,
        mapper: MarketMapper,
        data_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            source,
            mapper,
            cache_file: data_dir.as_ref().join(CACHE_FILE),
            max_cache_age: MAX_CACHE_AGE,
            index: RwLock::new(Arc::new(FacilityIndex::default())),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_max_cache_age(mut self, max_cache_age: Duration) -> Self {
        self.max_cache_age = max_cache_age;
        self
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// Current index; cheap to clone and safe to hold across awaits
    pub async fn snapshot(&self) -> Arc<FacilityIndex> {
        self.index.read().await.clone()
    }

    pub async fn lookup(&self, market: MarketId, callsign: &str) -> Option<FacilityRecord> {
        self.lookup_at(market, callsign, Local::now().naive_local()).await
    }

    pub async fn lookup_at(
        &self,
        market: MarketId,
        callsign: &str,
        now: NaiveDateTime,
    ) -> Option<FacilityRecord> {
        self.snapshot().await.lookup(market, callsign, now).cloned()
    }

    pub async fn channel_lookup(&self, market: MarketId, callsign: &str) -> Option<ChannelLookup> {
        self.channel_lookup_at(market, callsign, Local::now().naive_local())
            .await
    }

    pub async fn channel_lookup_at(
        &self,
        market: MarketId,
        callsign: &str,
        now: NaiveDateTime,
    ) -> Option<ChannelLookup> {
        self.snapshot()
            .await
            .lookup(market, callsign, now)
            .and_then(FacilityRecord::channel_lookup)
    }

    pub async fn stats(&self) -> RegistryStats {
        let index = self.snapshot().await;
        RegistryStats {
            facilities: index.len(),
            markets: index.mapping.len(),
            built_at: index.built_at,
        }
    }

    pub async fn refresh(&self) -> TunerResult<RefreshOutcome> {
        self.refresh_at(Local::now().naive_local()).await
    }

    /// One refresh cycle, judging license expiry against `now`.
    ///
    /// Downloads when the cache file is missing or too old. A failed download
    /// is an error only when there is no data at all to fall back on.
    pub async fn refresh_at(&self, now: NaiveDateTime) -> TunerResult<RefreshOutcome> {
        let _guard = self.refresh_lock.lock().await;

        let cache_age = self.cache_age().await;
        let stale = cache_age.is_none_or(|age| age >= self.max_cache_age);

        if stale {
            match self.source.download().await {
                Ok(data) => {
                    // Only an archive that indexed cleanly is cached
                    self.rebuild(data.clone(), now).await?;
                    if let Err(e) = self.write_cache_file(&data).await {
                        tracing::warn!("Failed to cache facilities: {}", e);
                    }
                    return Ok(RefreshOutcome::Downloaded);
                }
                Err(e) => {
                    let indexed = self.snapshot().await.is_built();
                    if !indexed && cache_age.is_none() {
                        tracing::error!("Facility download failed and no cache exists: {}", e);
                        return Err(e);
                    }

                    tracing::warn!("Facility download failed, keeping stale data: {}", e);
                    if !indexed {
                        let data = self.read_cache_file().await?;
                        self.rebuild(data, now).await?;
                    }
                    return Ok(RefreshOutcome::KeptStale);
                }
            }
        }

        if !self.snapshot().await.is_built() {
            tracing::info!("Using cached file: {:?}", self.cache_file);
            let data = self.read_cache_file().await?;
            self.rebuild(data, now).await?;
            return Ok(RefreshOutcome::LoadedFromCache);
        }

        tracing::debug!("Facility cache is fresh, nothing to do");
        Ok(RefreshOutcome::Unchanged)
    }

    /// Check the cache every `CHECK_INTERVAL`
    pub fn schedule(self: &Arc<Self>, tasks: &mut ScheduledTaskManager) {
        let registry = Arc::clone(self);
        tasks.spawn_periodic("facility-registry", CHECK_INTERVAL, move || {
            let registry = registry.clone();
            async move {
                let outcome = registry.refresh().await?;
                tracing::info!("Facility registry check: {:?}", outcome);
                Ok(())
            }
        });
    }

    async fn rebuild(&self, data: Vec<u8>, now: NaiveDateTime) -> TunerResult<()> {
        tracing::info!("Unzipping and parsing facilities...");

        let parsed = tokio::task::spawn_blocking(move || {
            let content = unzip_facilities(&data)?;
            parse_facilities(&content, now)
        })
        .await
        .map_err(|e| TunerError::Archive(format!("facility parse task failed: {}", e)))??;

        let mapping = self.mapper.build(&parsed.markets).await?;
        let index = FacilityIndex::build(parsed.facilities, mapping);

        tracing::info!(
            "Indexed {} facilities across {} registry markets",
            index.len(),
            parsed.markets.len()
        );

        *self.index.write().await = Arc::new(index);
        Ok(())
    }

    async fn cache_age(&self) -> Option<Duration> {
        let modified = fs::metadata(&self.cache_file).await.ok()?.modified().ok()?;
        Some(SystemTime::now().duration_since(modified).unwrap_or_default())
    }

    async fn read_cache_file(&self) -> TunerResult<Vec<u8>> {
        fs::read(&self.cache_file)
            .await
            .map_err(|e| TunerError::io(&self.cache_file, e))
    }

    async fn write_cache_file(&self, data: &[u8]) -> TunerResult<()> {
        if let Some(dir) = self.cache_file.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| TunerError::io(dir, e))?;
        }
        fs::write(&self.cache_file, data)
            .await
            .map_err(|e| TunerError::io(&self.cache_file, e))?;
        tracing::info!("Cached facilities at {:?}", self.cache_file);
        Ok(())
    }
}

#[async_trait]
impl ChannelDirectory for FacilityRegistry {
    async fn lookup(&self, market: MarketId, callsign: &str) -> Option<FacilityRecord> {
        FacilityRegistry::lookup(self, market, callsign).await
    }
}
