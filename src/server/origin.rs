//! Handshake origin policy.
//!
//! Browsers send an `Origin` header on WebSocket upgrades. The policy either
//! accepts any origin or a fixed allow-list compared by ASCII serialization
//! (`scheme://host[:port]`). Requests without an `Origin` header come from
//! non-browser clients and are accepted.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// OriginPolicy
// ============================================================================

/// Which `Origin` header values may open a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginPolicy {
    /// Accept every origin.
    #[default]
    Any,
    /// Accept only these serialized origins.
    Allow(Vec<String>),
}

impl OriginPolicy {
    /// Builds an allow-list, normalizing each entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an entry is not a URL with a host.
    pub fn allow<I, S>(origins: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        origins
            .into_iter()
            .map(|origin| normalize(origin.as_ref()))
            .collect::<Result<Vec<_>>>()
            .map(Self::Allow)
    }

    /// Checks a request's `Origin` header value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OriginRejected`] if the origin is not allowed.
    pub fn check(&self, origin: Option<&str>) -> Result<()> {
        let (Self::Allow(allowed), Some(origin)) = (self, origin) else {
            return Ok(());
        };

        match normalize(origin) {
            Ok(normalized) if allowed.contains(&normalized) => Ok(()),
            _ => Err(Error::origin_rejected(origin)),
        }
    }

    /// Normalizes every entry of an allow-list read from configuration.
    pub(crate) fn validated(self) -> Result<Self> {
        match self {
            Self::Any => Ok(Self::Any),
            Self::Allow(origins) => Self::allow(origins),
        }
    }
}

/// Reduces a URL-ish string to its origin serialization.
fn normalize(origin: &str) -> Result<String> {
    let url = Url::parse(origin.trim())
        .map_err(|e| Error::config(format!("invalid origin '{origin}': {e}")))?;

    if url.host_str().is_none() {
        return Err(Error::config(format!("origin '{origin}' has no host")));
    }

    Ok(url.origin().ascii_serialization())
}

// ============================================================================
// Tests
// ============================================================================
