use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Station record from the streaming service's guide.
///
/// Fields the resolver does not read are carried through untouched in `extra`
/// so the HTTP layer sees the full upstream object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: Value,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "callSign", default)]
    pub call_sign: String,

    /// Resolved channel number ("N.M" or a bare integer)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Station {
    pub fn new(id: impl Into<Value>, name: impl Into<String>, call_sign: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            call_sign: call_sign.into(),
            channel: None,
            city: None,
            timezone: None,
            extra: Map::new(),
        }
    }
}
