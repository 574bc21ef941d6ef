use serde::{Deserialize, Serialize};
use std::fmt;

/// Public gateway that resolves content identifiers for third parties
pub const DEFAULT_GATEWAY_BASE: &str = "https://ipfs.filebase.io";

/// Resolvable URL of immutable content, recorded as the token URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageLocator(String);

impl StorageLocator {
    /// Template a content identifier into `<gateway_base>/ipfs/<cid>`
    pub fn from_cid(gateway_base: &str, cid: &str) -> Self {
        Self(format!("{}/ipfs/{}", gateway_base.trim_end_matches('/'), cid))
    }

    /// Wrap an already-resolved URL
    pub fn from_url(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The content identifier, i.e. the last path segment
    pub fn cid(&self) -> Option<&str> {
        self.0
            .rsplit_once("/ipfs/")
            .map(|(_, cid)| cid)
            .filter(|cid| !cid.is_empty())
    }
}

impl fmt::Display for StorageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
