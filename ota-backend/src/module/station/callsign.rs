//! Callsign extraction from free-text station labels

use regex::Regex;
use std::sync::LazyLock;

/// K/W prefix and 2-3 letter core, up to two ignored type letters, up to two
/// subchannel digits
static CALLSIGN_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([KW][A-Z]{2,3})[A-Z]{0,2}(\d{0,2})$").ok());

/// "4.1 CBS" style labels that already carry their channel number
static DIRECT_CHANNEL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d+\.\d+) .+").ok());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCallsign {
    pub callsign: String,
    pub subchannel: Option<String>,
}

impl ParsedCallsign {
    /// Subchannel as a string, empty when none was present
    pub fn subchannel_or_empty(&self) -> &str {
        self.subchannel.as_deref().unwrap_or_default()
    }
}

pub struct CallsignParser;

impl CallsignParser {
    /// "WLTV1" -> ("WLTV", "1"), "KLTVAA1" -> ("KLTV", "1"), "KLTV" -> ("KLTV", "")
    pub fn parse(label: &str) -> Option<ParsedCallsign> {
        let captures = CALLSIGN_PATTERN.as_ref()?.captures(label.trim())?;

        let callsign = captures.get(1)?.as_str().to_string();
        let subchannel = captures
            .get(2)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Some(ParsedCallsign {
            callsign,
            subchannel,
        })
    }

    /// First label that parses, in the order given
    pub fn parse_first<'a>(labels: impl IntoIterator<Item = &'a str>) -> Option<ParsedCallsign> {
        labels.into_iter().find_map(Self::parse)
    }
}

/// Channel number carried verbatim in a "N.M name" label
pub fn direct_channel(label: &str) -> Option<&str> {
    DIRECT_CHANNEL_PATTERN
        .as_ref()?
        .captures(label)?
        .get(1)
        .map(|m| m.as_str())
}
