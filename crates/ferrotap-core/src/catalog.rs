//! Discovery output: one catalog entry per stream definition.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::streams::{StreamDefinition, STREAMS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicationMethod {
    Incremental,
    FullTable,
}

/// Per-stream and per-property selection metadata, Singer style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub breadcrumb: Vec<String>,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub tap_stream_id: String,
    pub stream: String,
    pub schema: Value,
    pub key_properties: Vec<String>,
    pub replication_key: Option<String>,
    pub replication_method: ReplicationMethod,
    pub metadata: Vec<MetadataEntry>,
}

impl CatalogEntry {
    pub fn from_definition(definition: &StreamDefinition) -> Self {
        let schema = definition.schema();
        let replication_method = if definition.is_incremental() {
            ReplicationMethod::Incremental
        } else {
            ReplicationMethod::FullTable
        };

        let mut metadata = vec![MetadataEntry {
            breadcrumb: Vec::new(),
            metadata: serde_json::json!({
                "inclusion": "available",
                "selected": true,
                "table-key-properties": definition.primary_keys,
                "valid-replication-keys": definition.replication_key.into_iter().collect::<Vec<_>>(),
                "forced-replication-method": replication_method,
            }),
        }];

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for name in properties.keys() {
                let automatic = definition.primary_keys.contains(&name.as_str())
                    || definition.replication_key == Some(name.as_str());
                metadata.push(MetadataEntry {
                    breadcrumb: vec![String::from("properties"), name.clone()],
                    metadata: serde_json::json!({
                        "inclusion": if automatic { "automatic" } else { "available" },
                    }),
                });
            }
        }

        Self {
            tap_stream_id: definition.name.to_owned(),
            stream: definition.name.to_owned(),
            schema,
            key_properties: definition
                .primary_keys
                .iter()
                .map(|key| (*key).to_owned())
                .collect(),
            replication_key: definition.replication_key.map(str::to_owned),
            replication_method,
            metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    /// Catalog of every known stream, in sync order.
    pub fn discover() -> Self {
        Self {
            streams: STREAMS
                .iter()
                .map(|definition| CatalogEntry::from_definition(definition))
                .collect(),
        }
    }

    pub fn entry(&self, tap_stream_id: &str) -> Option<&CatalogEntry> {
        self.streams
            .iter()
            .find(|entry| entry.tap_stream_id == tap_stream_id)
    }
}
