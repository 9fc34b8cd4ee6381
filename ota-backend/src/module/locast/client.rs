use super::playlist::best_variant;
use super::session::AuthSession;
use super::types::{Geo, GeoResponse, MarketBinding, WatchResponse};
use crate::error::{TunerError, TunerResult};
use crate::module::market::{MarketId, MarketSource, StreamingMarket};
use crate::module::station::{Station, StationSource};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::StatusCode;
use std::sync::Arc;

pub const API_BASE_URL: &str = "https://api.locastnet.org/api";

/// The watch endpoint only hands out stream URLs to known player agents
const WATCH_USER_AGENT: &str = "curl/7.64.1";

/// Location lookup URL for a geo
pub fn geo_url(base_url: &str, geo: &Geo) -> String {
    match geo {
        Geo::Coordinates {
            latitude,
            longitude,
        } => format!("{}/watch/dma/{}/{}", base_url, latitude, longitude),
        Geo::Zipcode(zip) => format!("{}/watch/dma/zip/{}", base_url, zip),
        Geo::Ip => format!("{}/watch/dma/ip", base_url),
    }
}

/// Guide URL covering `days` days from midnight UTC of `today`
pub fn stations_url(base_url: &str, market: MarketId, today: NaiveDate, days: u32) -> String {
    format!(
        "{}/watch/epg/{}?startTime={}T00:00:00-00:00&hours={}",
        base_url,
        market,
        today.format("%Y-%m-%d"),
        days * 24
    )
}

/// Stream lookup URL for a station seen from the binding's coordinates
pub fn watch_url(base_url: &str, binding: &MarketBinding, station_id: &str) -> String {
    format!(
        "{}/watch/station/{}/{}/{}",
        base_url, station_id, binding.latitude, binding.longitude
    )
}

/// Streaming service client
pub struct LocastClient {
    session: Arc<AuthSession>,
    base_url: String,
    days: u32,
}

impl LocastClient {
    pub fn new(session: Arc<AuthSession>, base_url: impl Into<String>, days: u32) -> Self {
        Self {
            session,
            base_url: base_url.into(),
            days,
        }
    }

    /// Resolve a location to the market serving it
    pub async fn locate(&self, geo: &Geo) -> TunerResult<MarketBinding> {
        let url = geo_url(&self.base_url, geo);
        tracing::debug!("Looking up market for {} at {}", geo, url);

        let response = self
            .session
            .client()
            .get(&url)
            .send()
            .await
            .map_err(|e| TunerError::LocationInvalid(format!("{}: {}", geo, e)))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Err(TunerError::LocationInvalid(format!("no market found for {}", geo)));
        }
        if !status.is_success() {
            return Err(TunerError::LocationInvalid(format!("{}: HTTP {}", geo, status)));
        }

        let body: GeoResponse = response
            .json()
            .await
            .map_err(|e| TunerError::LocationInvalid(format!("{}: {}", geo, e)))?;

        let binding = MarketBinding::from_response(geo, body)?;
        tracing::info!(
            "{} is served by market {} ({})",
            geo,
            binding.market_id,
            binding.city
        );
        Ok(binding)
    }
}

impl LocastClient {
    /// Playable URL for a station. When the service returns a master playlist
    /// the highest resolution variant is chosen.
    pub async fn stream_url(&self, binding: &MarketBinding, station_id: &str) -> TunerResult<String> {
        let token = self.session.token().await?;
        let what = format!("stream for station {}", station_id);

        let response = self
            .session
            .client()
            .get(watch_url(&self.base_url, binding, station_id))
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, WATCH_USER_AGENT)
            .send()
            .await
            .map_err(|e| TunerError::fetch(&what, e))?;

        if !response.status().is_success() {
            return Err(TunerError::fetch(
                &what,
                format!("HTTP error {}", response.status()),
            ));
        }

        let watch: WatchResponse = response
            .json()
            .await
            .map_err(|e| TunerError::fetch(&what, e))?;

        let playlist = self
            .session
            .client()
            .get(&watch.stream_url)
            .header(reqwest::header::USER_AGENT, WATCH_USER_AGENT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| TunerError::fetch(&what, e))?
            .text()
            .await
            .map_err(|e| TunerError::fetch(&what, e))?;

        match best_variant(&watch.stream_url, &playlist) {
            Some(variant) => {
                tracing::debug!("Station {} streams from variant {}", station_id, variant);
                Ok(variant)
            }
            None => Ok(watch.stream_url),
        }
    }
}

#[async_trait]
impl MarketSource for LocastClient {
    async fn fetch_markets(&self) -> TunerResult<Vec<StreamingMarket>> {
        let url = format!("{}/dma", self.base_url);

        let response = self
            .session
            .client()
            .get(&url)
            .send()
            .await
            .map_err(|e| TunerError::fetch("market list", e))?;

        if !response.status().is_success() {
            return Err(TunerError::fetch(
                "market list",
                format!("HTTP error {}", response.status()),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| TunerError::fetch("market list", e))
    }
}

#[async_trait]
impl StationSource for LocastClient {
    async fn fetch_stations(&self, binding: &MarketBinding) -> TunerResult<Vec<Station>> {
        let token = self.session.token().await?;
        let url = stations_url(
            &self.base_url,
            binding.market_id,
            Utc::now().date_naive(),
            self.days,
        );
        let what = format!("stations for market {}", binding.market_id);

        let response = self
            .session
            .client()
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| TunerError::fetch(&what, e))?;

        if !response.status().is_success() {
            return Err(TunerError::fetch(
                &what,
                format!("HTTP error {}", response.status()),
            ));
        }

        let stations: Vec<Station> = response
            .json()
            .await
            .map_err(|e| TunerError::fetch(&what, e))?;

        tracing::debug!("Fetched {} {}", stations.len(), what);
        Ok(stations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_urls() {
        let geo = Geo::Coordinates {
            latitude: 40.7128,
            longitude: -74.006,
        };
        assert_eq!(
            geo_url(API_BASE_URL, &geo),
            "https://api.locastnet.org/api/watch/dma/40.7128/-74.006"
        );
        assert_eq!(
            geo_url(API_BASE_URL, &Geo::Zipcode("33602".to_string())),
            "https://api.locastnet.org/api/watch/dma/zip/33602"
        );
        assert_eq!(
            geo_url(API_BASE_URL, &Geo::Ip),
            "https://api.locastnet.org/api/watch/dma/ip"
        );
    }

    #[test]
    fn test_stations_url() {
        let today = NaiveDate::from_ymd_opt(2021, 1, 5).unwrap();
        assert_eq!(
            stations_url(API_BASE_URL, 539, today, 8),
            "https://api.locastnet.org/api/watch/epg/539?startTime=2021-01-05T00:00:00-00:00&hours=192"
        );
    }

    #[test]
    fn test_watch_url() {
        let binding = MarketBinding {
            market_id: 501,
            city: "New York".to_string(),
            latitude: 40.7128,
            longitude: -74.006,
            timezone: None,
            zipcode: None,
        };
        assert_eq!(
            watch_url(API_BASE_URL, &binding, "104473"),
            "https://api.locastnet.org/api/watch/station/104473/40.7128/-74.006"
        );
    }

    #[tokio::test]
    async fn test_unreachable_location_service_is_location_error() {
        let session = Arc::new(AuthSession::new("http://127.0.0.1:9", "user", "pass").unwrap());
        let client = LocastClient::new(session, "http://127.0.0.1:9", 8);

        let err = client.locate(&Geo::Ip).await.unwrap_err();
        assert!(matches!(err, TunerError::LocationInvalid(_)));
    }
}
