//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::record::RecordId;

/// Id of the document root record seeded on cold start.
pub const DEFAULT_DOCUMENT_ID: &str = "document:document";
/// Id of the default page seeded on cold start.
pub const DEFAULT_PAGE_ID: &str = "page:page";
/// Name of the default page.
pub const DEFAULT_PAGE_NAME: &str = "Page 1";
/// Fractional index of the default page.
pub const DEFAULT_PAGE_INDEX: &str = "a1";
/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Configuration for the sync engine and its scaffold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub document_id: String,
    pub page_id: String,
    pub page_name: String,
    pub page_index: String,
    pub autosave_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            document_id: DEFAULT_DOCUMENT_ID.to_string(),
            page_id: DEFAULT_PAGE_ID.to_string(),
            page_name: DEFAULT_PAGE_NAME.to_string(),
            page_index: DEFAULT_PAGE_INDEX.to_string(),
            autosave_interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
        }
    }
}

impl SyncConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn document_id(&self) -> RecordId {
        RecordId::new(self.document_id.clone())
    }

    pub fn page_id(&self) -> RecordId {
        RecordId::new(self.page_id.clone())
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SyncConfig::from_json(r#"{ "page_name": "Sketch" }"#).unwrap();
        assert_eq!(config.page_name, "Sketch");
        assert_eq!(config.page_id, DEFAULT_PAGE_ID);
        assert_eq!(config.autosave_interval(), Duration::from_secs(30));
    }
}
