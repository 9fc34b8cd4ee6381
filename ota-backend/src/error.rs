//! Error taxonomy for the tuner backend.
//!
//! Fatal errors (unmatched markets, malformed registry data) abort the refresh
//! or startup step that raised them. Transient errors keep the last known good
//! data in place. User and location errors fail a single market binding.

use std::path::PathBuf;

use crate::module::market::MarketId;

/// Result type for tuner operations.
pub type TunerResult<T> = Result<T, TunerError>;

#[derive(Debug, thiserror::Error)]
pub enum TunerError {
    /// A streaming market could not be matched to any registry market name.
    #[error("can't find registry market for {id}, {name}")]
    UnmatchedMarket { id: MarketId, name: String },

    /// A registry line did not have the fixed column count.
    #[error("malformed facility line {line}: expected {expected} columns, found {found}")]
    MalformedFacilityLine {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// A retained registry line carried an unreadable license expiration date.
    #[error("invalid license expiration date '{value}' on facility line {line}")]
    InvalidExpirationDate { line: u64, value: String },

    /// The registry archive could not be opened or did not contain the data file.
    #[error("facility archive error: {0}")]
    Archive(String),

    /// Network, HTTP status, or payload decoding failure talking to an upstream.
    #[error("failed to fetch {what}: {reason}")]
    Fetch { what: String, reason: String },

    /// Login or entitlement failure.
    #[error("user invalid: {0}")]
    UserInvalid(String),

    /// The streaming service does not serve the requested location.
    #[error("location invalid: {0}")]
    LocationInvalid(String),

    /// A read was made for a market that was never bound.
    #[error("market {0} is not bound")]
    UnknownMarket(MarketId),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TunerError {
    pub fn fetch(what: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Fetch {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that indicate a systemic data or configuration problem.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnmatchedMarket { .. }
                | Self::MalformedFacilityLine { .. }
                | Self::InvalidExpirationDate { .. }
                | Self::Archive(_)
        )
    }

    /// Errors worth retrying on the next scheduled cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let unmatched = TunerError::UnmatchedMarket {
            id: 501,
            name: "New York".to_string(),
        };
        assert!(unmatched.is_fatal());
        assert!(!unmatched.is_transient());

        let fetch = TunerError::fetch("market list", "connection refused");
        assert!(fetch.is_transient());
        assert!(!fetch.is_fatal());

        let user = TunerError::UserInvalid("donation expired".to_string());
        assert!(!user.is_fatal());
        assert!(!user.is_transient());
    }

    #[test]
    fn test_unmatched_message_names_market() {
        let err = TunerError::UnmatchedMarket {
            id: 539,
            name: "Tampa Bay".to_string(),
        };
        assert_eq!(err.to_string(), "can't find registry market for 539, Tampa Bay");
    }
}
