use ota_backend::config::TunerConfig;
use ota_backend::error::TunerError;
use ota_backend::logging;
use ota_backend::module::fcc::{FacilityRegistry, HttpFacilitySource};
use ota_backend::module::locast::{API_BASE_URL, AuthSession, LocastClient};
use ota_backend::module::market::MarketMapper;
use ota_backend::module::scheduled::ScheduledTaskManager;
use ota_backend::module::station::{ChannelResolver, StationCache};
use ota_backend::service::TunerService;

use anyhow::{Context, Result, bail};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = TunerConfig::from_file(&config_path)?;

    let _logging_guard = logging::init_logging(&config.log_dir, "ota-backend", &config.log_level)?;

    tracing::info!("OTA backend starting...");

    let session = Arc::new(
        AuthSession::new(API_BASE_URL, &config.username, &config.password)
            .context("Failed to create streaming session")?,
    );
    session.connect().await.context("Initial login failed")?;

    let client = Arc::new(LocastClient::new(session.clone(), API_BASE_URL, config.days));

    // Facility registry
    let registry = Arc::new(FacilityRegistry::new(
        Arc::new(HttpFacilitySource::new()?),
        MarketMapper::new(client.clone()),
        &config.data_dir,
    ));
    let outcome = registry
        .refresh()
        .await
        .context("Failed to load facility registry")?;
    tracing::info!("Facility registry ready ({:?}): {}", outcome, registry.stats().await);

    let mut tasks = ScheduledTaskManager::new();
    registry.schedule(&mut tasks);

    // Market bindings
    let resolver = Arc::new(ChannelResolver::new(registry.clone()));
    let mut service = TunerService::new(registry.clone());

    for geo in config.geos()? {
        let binding = match client.locate(&geo).await {
            Ok(binding) => binding,
            Err(e) => {
                log_binding_failure(&geo.to_string(), &e);
                continue;
            }
        };

        let cache = Arc::new(StationCache::new(
            binding,
            client.clone(),
            resolver.clone(),
            config.cache_stations,
            config.cache_interval(),
        ));
        if let Err(e) = service.bind(cache, &mut tasks).await {
            log_binding_failure(&geo.to_string(), &e);
        }
    }

    if service.is_empty() {
        tasks.shutdown().await;
        bail!("No market could be bound");
    }

    tracing::info!("Bound markets:");
    tracing::info!("  {:<24} {:<8} {:<8} {}", "City", "Zip", "Market", "Timezone");
    for binding in service.bindings() {
        tracing::info!(
            "  {:<24} {:<8} {:<8} {}",
            binding.city,
            binding.zipcode.as_deref().unwrap_or("-"),
            binding.market_id,
            binding.timezone.as_deref().unwrap_or("-")
        );
    }

    tracing::info!("OTA backend running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutdown requested");
    tasks.shutdown().await;

    Ok(())
}

fn log_binding_failure(geo: &str, error: &TunerError) {
    match error {
        TunerError::UserInvalid(_) | TunerError::LocationInvalid(_) => {
            tracing::error!("Dropping binding for {}: {}", geo, error)
        }
        _ => tracing::error!("Binding for {} failed: {}", geo, error),
    }
}
