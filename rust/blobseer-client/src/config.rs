use std::time::Duration;

use blobseer_metadata::TreeOptions;
use blobseer_storage::{DEFAULT_SECRET, DEFAULT_TTL};
use serde::{Deserialize, Serialize};

use crate::ClientError;

/// Settings of the DHT holding the metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DhtConfig {
    /// Lifetime of tree records in seconds; 0 keeps them forever
    pub ttl_secs: u64,
    /// Secret guarding provider lists
    pub secret: String,
    /// Number of records kept in the client's read cache
    pub cache_size: usize,
}

impl Default for DhtConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL.as_secs(),
            secret: DEFAULT_SECRET.to_string(),
            cache_size: 1 << 16,
        }
    }
}

/// Client configuration. Every field is optional in serialized form.
///
/// ```rust
/// use blobseer_client::Config;
///
/// let config = Config::from_json(r#"{ "deduplicate": false, "dht": { "ttl_secs": 60 } }"#).unwrap();
///
/// assert!(!config.deduplicate);
/// assert_eq!(config.dht.ttl_secs, 60);
/// assert_eq!(config.read_retries, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// DHT settings
    pub dht: DhtConfig,
    /// Key pages by their content hash, so that identical pages are stored
    /// once. Otherwise pages are keyed by the version and offset that wrote
    /// them.
    pub deduplicate: bool,
    /// Replicas to try per page before a read fails
    pub read_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dht: DhtConfig::default(),
            deduplicate: true,
            read_retries: 3,
        }
    }
}

impl Config {
    /// Parse a JSON document
    pub fn from_json(json: &str) -> Result<Self, ClientError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The options applied to every tree record
    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            ttl: Duration::from_secs(self.dht.ttl_secs),
            secret: self.dht.secret.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_fills_in_defaults() -> Result<(), ClientError> {
        let config = Config::from_json("{}")?;

        assert_eq!(config, Config::default());
        assert_eq!(config.tree_options(), TreeOptions::default());

        Ok(())
    }

    #[test]
    fn it_rejects_malformed_documents() {
        assert!(matches!(
            Config::from_json(r#"{ "read_retries": "many" }"#),
            Err(ClientError::Config(_))
        ));
    }
}
