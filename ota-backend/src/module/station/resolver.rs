//! Channel resolver - assigns a broadcast channel number to every station

use super::callsign::{CallsignParser, ParsedCallsign, direct_channel};
use super::types::Station;
use crate::module::fcc::FacilityRecord;
use crate::module::locast::MarketBinding;
use crate::module::market::MarketId;
use async_trait::async_trait;
use std::sync::Arc;

/// First channel number handed to stations that cannot be resolved
pub const SYNTHETIC_CHANNEL_START: u32 = 1000;

/// Facility lookup the resolver consults
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    async fn lookup(&self, market: MarketId, callsign: &str) -> Option<FacilityRecord>;
}

/// Channel resolver
pub struct ChannelResolver {
    directory: Arc<dyn ChannelDirectory>,
}

impl ChannelResolver {
    pub fn new(directory: Arc<dyn ChannelDirectory>) -> Self {
        Self { directory }
    }

    /// Set `channel`, `city` and `timezone` on each station of the binding's
    /// market. Unresolvable stations are numbered from
    /// `SYNTHETIC_CHANNEL_START` in input order.
    pub async fn resolve(&self, binding: &MarketBinding, mut stations: Vec<Station>) -> Vec<Station> {
        let mut next_synthetic = SYNTHETIC_CHANNEL_START;

        for station in stations.iter_mut() {
            let channel = match self.resolve_channel(binding.market_id, station).await {
                Some(channel) => channel,
                None => {
                    let channel = next_synthetic.to_string();
                    next_synthetic += 1;
                    tracing::warn!(
                        "Could not resolve channel for '{}' ({}) in market {}, using {}",
                        station.name,
                        station.call_sign,
                        binding.market_id,
                        channel
                    );
                    channel
                }
            };

            station.channel = Some(channel);
            station.city = Some(binding.city.clone());
            station.timezone = binding.timezone.clone();
        }

        tracing::debug!(
            "Resolved {} stations for market {} ({} synthetic)",
            stations.len(),
            binding.market_id,
            next_synthetic - SYNTHETIC_CHANNEL_START
        );

        stations
    }

    async fn resolve_channel(&self, market: MarketId, station: &Station) -> Option<String> {
        if let Some(channel) = direct_channel(&station.call_sign) {
            return Some(channel.to_string());
        }

        // Display name wins over the callsign field
        let parsed = CallsignParser::parse_first([station.name.as_str(), station.call_sign.as_str()])?;
        let facility = self.directory.lookup(market, &parsed.callsign).await?;

        channel_number(&facility, &parsed)
    }
}

/// Analog facilities use their broadcast channel and drop any subchannel;
/// digital ones use "virtual.subchannel" with subchannel defaulting to 1
fn channel_number(facility: &FacilityRecord, parsed: &ParsedCallsign) -> Option<String> {
    let lookup = facility.channel_lookup()?;
    if lookup.analog {
        Some(lookup.channel)
    } else {
        let subchannel = parsed.subchannel.as_deref().unwrap_or("1");
        Some(format!("{}.{}", lookup.channel, subchannel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::fcc::FacilityService;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeDirectory {
        facilities: HashMap<(MarketId, String), FacilityRecord>,
        lookups: AtomicUsize,
    }

    impl FakeDirectory {
        fn with(mut self, market: MarketId, facility: FacilityRecord) -> Self {
            self.facilities.insert((market, facility.callsign.clone()), facility);
            self
        }
    }

    #[async_trait]
    impl ChannelDirectory for FakeDirectory {
        async fn lookup(&self, market: MarketId, callsign: &str) -> Option<FacilityRecord> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.facilities.get(&(market, callsign.to_string())).cloned()
        }
    }

    fn facility(callsign: &str, channel: &str, virtual_channel: Option<&str>) -> FacilityRecord {
        FacilityRecord {
            facility_id: "1".to_string(),
            callsign: callsign.to_string(),
            channel: Some(channel.to_string()),
            virtual_channel: virtual_channel.map(str::to_string),
            market: "TYLER-LONGVIEW(LFKN&NCGD)".to_string(),
            service: FacilityService::DT,
            license_expiration: NaiveDate::from_ymd_opt(2030, 8, 1).unwrap(),
            city: "TYLER".to_string(),
            state: "TX".to_string(),
            network: None,
        }
    }

    fn binding() -> MarketBinding {
        MarketBinding {
            market_id: 709,
            city: "Tyler".to_string(),
            latitude: 32.35,
            longitude: -95.3,
            timezone: Some("America/Chicago".to_string()),
            zipcode: None,
        }
    }

    async fn resolve(directory: FakeDirectory, stations: Vec<Station>) -> (Vec<Station>, usize) {
        let directory = Arc::new(directory);
        let resolver = ChannelResolver::new(directory.clone());
        let stations = resolver.resolve(&binding(), stations).await;
        (stations, directory.lookups.load(Ordering::SeqCst))
    }

    fn channels(stations: &[Station]) -> Vec<&str> {
        stations.iter().filter_map(|s| s.channel.as_deref()).collect()
    }

    #[tokio::test]
    async fn test_direct_channel_skips_lookup() {
        let (stations, lookups) = resolve(
            FakeDirectory::default(),
            vec![Station::new(1, "CBS", "2.1 CBS")],
        )
        .await;

        assert_eq!(channels(&stations), vec!["2.1"]);
        assert_eq!(lookups, 0);
    }

    #[tokio::test]
    async fn test_analog_drops_subchannel() {
        let directory = FakeDirectory::default().with(709, facility("KLTV", "5", None));
        let (stations, _) = resolve(directory, vec![Station::new(1, "KLTV2", "KLTV2")]).await;

        assert_eq!(channels(&stations), vec!["5"]);
    }

    #[tokio::test]
    async fn test_digital_defaults_subchannel() {
        let directory = FakeDirectory::default().with(709, facility("KLTV", "7", Some("5")));
        let (stations, _) = resolve(
            directory,
            vec![Station::new(1, "KLTV", "KLTV"), Station::new(2, "KLTV3", "KLTV3")],
        )
        .await;

        assert_eq!(channels(&stations), vec!["5.1", "5.3"]);
    }

    #[tokio::test]
    async fn test_name_takes_priority_over_callsign() {
        let directory = FakeDirectory::default()
            .with(709, facility("KLTV", "7", Some("7")))
            .with(709, facility("KTRE", "9", Some("9")));
        let (stations, lookups) =
            resolve(directory, vec![Station::new(1, "KTRE2", "KLTV1")]).await;

        assert_eq!(channels(&stations), vec!["9.2"]);
        assert_eq!(lookups, 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_callsign_field() {
        let directory = FakeDirectory::default().with(709, facility("KLTV", "7", Some("7")));
        let (stations, _) = resolve(directory, vec![Station::new(1, "Bounce TV", "KLTVDT4")]).await;

        assert_eq!(channels(&stations), vec!["7.4"]);
    }

    #[tokio::test]
    async fn test_unresolvable_stations_numbered_in_order() {
        let directory = FakeDirectory::default().with(709, facility("KLTV", "7", Some("7")));
        let (stations, _) = resolve(
            directory,
            vec![
                Station::new(1, "Bounce TV", "Bounce"),
                Station::new(2, "KLTV", "KLTV"),
                Station::new(3, "WXYZ", "WXYZ"),
                Station::new(4, "Grit", "Grit"),
            ],
        )
        .await;

        assert_eq!(channels(&stations), vec!["1000", "7.1", "1001", "1002"]);
    }

    #[tokio::test]
    async fn test_wrong_market_is_unresolved() {
        let directory = FakeDirectory::default().with(501, facility("KLTV", "7", Some("7")));
        let (stations, _) = resolve(directory, vec![Station::new(1, "KLTV", "KLTV")]).await;

        assert_eq!(channels(&stations), vec!["1000"]);
    }

    #[tokio::test]
    async fn test_binding_fields_denormalized() {
        let (stations, _) = resolve(
            FakeDirectory::default(),
            vec![Station::new(1, "CBS", "2.1 CBS"), Station::new(2, "Grit", "Grit")],
        )
        .await;

        for station in &stations {
            assert_eq!(station.city.as_deref(), Some("Tyler"));
            assert_eq!(station.timezone.as_deref(), Some("America/Chicago"));
        }
    }
}
