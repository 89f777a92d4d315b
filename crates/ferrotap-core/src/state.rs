//! Persisted bookmarks in the partitioned Singer state layout.
//!
//! ```json
//! {"bookmarks": {"trades": {"partitions": [
//!     {"context": {"book": "btc_mxn"}, "replication_key": "tid", "replication_key_value": 55845}
//! ]}}}
//! ```
//!
//! Streams without partitions may also be stored flat, with
//! `replication_key` and `replication_key_value` directly under the stream.
//! Those are read as the unscoped partition and written back partitioned.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pagination::Cursor;
use crate::partition::PartitionContext;

/// Last replication value seen for one (stream, context) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionBookmark {
    pub context: PartitionContext,
    pub replication_key: String,
    pub replication_key_value: Cursor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredStreamBookmarks")]
pub struct StreamBookmarks {
    pub partitions: Vec<PartitionBookmark>,
}

/// On-disk form of [`StreamBookmarks`], accepting both layouts.
#[derive(Deserialize)]
struct StoredStreamBookmarks {
    #[serde(default)]
    partitions: Vec<PartitionBookmark>,
    #[serde(default)]
    replication_key: Option<String>,
    #[serde(default)]
    replication_key_value: Option<Cursor>,
}

impl From<StoredStreamBookmarks> for StreamBookmarks {
    fn from(stored: StoredStreamBookmarks) -> Self {
        let mut partitions = stored.partitions;
        let unscoped = PartitionContext::unscoped();

        if let (Some(replication_key), Some(replication_key_value)) =
            (stored.replication_key, stored.replication_key_value)
        {
            if !partitions.iter().any(|partition| partition.context == unscoped) {
                partitions.push(PartitionBookmark {
                    context: unscoped,
                    replication_key,
                    replication_key_value,
                });
            }
        }

        Self { partitions }
    }
}

/// Bookmarks for every stream, keyed by stream name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TapState {
    #[serde(default)]
    pub bookmarks: BTreeMap<String, StreamBookmarks>,
}

impl TapState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|error| ConfigError::Parse {
            path: origin.to_owned(),
            message: error.to_string(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.display().to_string(),
            message: error.to_string(),
        })?;
        Self::from_json_str(&raw, &path.display().to_string())
    }

    /// Stored bookmark for `stream` in `context`, if any.
    pub fn bookmark(&self, stream: &str, context: &PartitionContext) -> Option<&Cursor> {
        self.bookmarks
            .get(stream)?
            .partitions
            .iter()
            .find(|partition| &partition.context == context)
            .map(|partition| &partition.replication_key_value)
    }

    /// Insert or replace the bookmark for `stream` in `context`.
    pub fn set_bookmark(
        &mut self,
        stream: &str,
        context: &PartitionContext,
        replication_key: &str,
        value: Cursor,
    ) {
        let partitions = &mut self.bookmarks.entry(stream.to_owned()).or_default().partitions;
        match partitions
            .iter_mut()
            .find(|partition| &partition.context == context)
        {
            Some(existing) => {
                existing.replication_key = replication_key.to_owned();
                existing.replication_key_value = value;
            }
            None => partitions.push(PartitionBookmark {
                context: context.clone(),
                replication_key: replication_key.to_owned(),
                replication_key_value: value,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.values().all(|stream| stream.partitions.is_empty())
    }
}
