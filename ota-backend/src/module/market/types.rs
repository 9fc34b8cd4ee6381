use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Streaming-service market identifier (the service calls it a DMA)
pub type MarketId = u32;

/// One market as listed by the streaming service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingMarket {
    pub id: MarketId,
    pub name: String,
}

impl StreamingMarket {
    pub fn new(id: MarketId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Streaming market ID -> registry market name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketMapping {
    names: HashMap<MarketId, String>,
}

impl MarketMapping {
    pub fn insert(&mut self, id: MarketId, registry_name: String) {
        self.names.insert(id, registry_name);
    }

    pub fn registry_name(&self, id: MarketId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
