use crate::error::{TunerError, TunerResult};
use crate::module::market::MarketId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Location a market binding is requested for
#[derive(Debug, Clone, PartialEq)]
pub enum Geo {
    Coordinates { latitude: f64, longitude: f64 },
    Zipcode(String),
    /// Whatever location the service derives from the caller's IP
    Ip,
}

impl Geo {
    pub fn zipcode(&self) -> Option<&str> {
        match self {
            Geo::Zipcode(zip) => Some(zip),
            _ => None,
        }
    }
}

impl fmt::Display for Geo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geo::Coordinates {
                latitude,
                longitude,
            } => write!(f, "coordinates {},{}", latitude, longitude),
            Geo::Zipcode(zip) => write!(f, "zip {}", zip),
            Geo::Ip => write!(f, "IP location"),
        }
    }
}

/// Location lookup response
#[derive(Debug, Clone, Deserialize)]
pub struct GeoResponse {
    pub latitude: f64,
    pub longitude: f64,
    /// Market ID; sent as a number or a numeric string
    #[serde(rename = "DMA")]
    pub dma: Value,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl GeoResponse {
    pub fn market_id(&self) -> TunerResult<MarketId> {
        let id = match &self.dma {
            Value::Number(n) => n.as_u64().and_then(|n| MarketId::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        id.ok_or_else(|| TunerError::LocationInvalid(format!("unusable market ID {}", self.dma)))
    }
}

/// A location resolved to a streaming market
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketBinding {
    pub market_id: MarketId,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
    pub zipcode: Option<String>,
}

impl MarketBinding {
    /// Build a binding from a lookup response; inactive markets are rejected
    pub fn from_response(geo: &Geo, response: GeoResponse) -> TunerResult<Self> {
        if !response.active {
            return Err(TunerError::LocationInvalid(format!(
                "service not available in {}",
                response.name
            )));
        }

        Ok(Self {
            market_id: response.market_id()?,
            city: response.name,
            latitude: response.latitude,
            longitude: response.longitude,
            timezone: response.timezone,
            zipcode: geo.zipcode().map(str::to_string),
        })
    }
}

/// Account record returned after login
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    #[serde(rename = "didDonate", default)]
    pub did_donate: bool,

    /// Epoch milliseconds
    #[serde(rename = "donationExpire", default)]
    pub donation_expire: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WatchResponse {
    #[serde(rename = "streamUrl")]
    pub stream_url: String,
}
