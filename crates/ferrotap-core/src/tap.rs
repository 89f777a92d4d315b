//! Tap orchestrator: runs every selected stream over its partitions.

use std::sync::Arc;

use crate::catalog::{Catalog, CatalogEntry};
use crate::config::TapConfig;
use crate::engine::{PartitionOutcome, RecordSink, StreamEngine};
use crate::error::{ConfigError, SyncError, SyncErrorKind};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::partition::{plan_partitions, PartitionContext};
use crate::state::TapState;
use crate::streams::{find_stream, StreamDefinition, STREAMS};

/// Result of a full sync. Failed partitions do not stop the others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSummary {
    pub partitions: Vec<PartitionOutcome>,
    pub failures: Vec<SyncError>,
}

impl SyncSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn records(&self) -> u64 {
        self.partitions.iter().map(|outcome| outcome.records).sum()
    }
}

pub struct Tap {
    config: TapConfig,
    engine: StreamEngine,
    streams: Vec<&'static StreamDefinition>,
}

impl Tap {
    /// Validate `config` and wire the engine onto `client`. All streams start selected.
    pub fn new(config: TapConfig, client: Arc<dyn HttpClient>) -> Result<Self, ConfigError> {
        let engine = StreamEngine::from_config(&config, client)?;
        Ok(Self {
            config,
            engine,
            streams: STREAMS.to_vec(),
        })
    }

    pub fn with_reqwest(config: TapConfig) -> Result<Self, ConfigError> {
        Self::new(config, Arc::new(ReqwestHttpClient::new()))
    }

    /// Catalog of every stream the tap knows.
    pub fn discover() -> Catalog {
        Catalog::discover()
    }

    /// Catalog restricted to the selected streams.
    pub fn catalog(&self) -> Catalog {
        Catalog {
            streams: self
                .streams
                .iter()
                .map(|definition| CatalogEntry::from_definition(definition))
                .collect(),
        }
    }

    /// Restrict the sync to `names`, keeping the canonical stream order.
    pub fn select_streams<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self, ConfigError> {
        for name in names {
            if find_stream(name.as_ref()).is_none() {
                return Err(ConfigError::UnknownStream {
                    name: name.as_ref().to_owned(),
                });
            }
        }

        self.streams = STREAMS
            .iter()
            .copied()
            .filter(|definition| names.iter().any(|name| name.as_ref() == definition.name))
            .collect();
        Ok(self)
    }

    pub fn streams(&self) -> &[&'static StreamDefinition] {
        &self.streams
    }

    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    pub fn engine(&self) -> &StreamEngine {
        &self.engine
    }

    /// Every (stream, context) pair in sync order.
    pub fn plan(&self) -> Vec<(&'static StreamDefinition, PartitionContext)> {
        self.streams
            .iter()
            .flat_map(|definition| {
                plan_partitions(definition, &self.config.books)
                    .into_iter()
                    .map(move |context| (*definition, context))
            })
            .collect()
    }

    /// Sync every selected stream, partition by partition.
    ///
    /// A failing partition is logged and recorded in the summary and the sync
    /// moves on. Only sink failures abort the whole run.
    pub async fn sync(
        &self,
        state: &mut TapState,
        sink: &mut dyn RecordSink,
    ) -> Result<SyncSummary, SyncError> {
        let mut summary = SyncSummary::default();

        for definition in self.streams.iter().copied() {
            sink.write_schema(definition)?;

            let contexts = plan_partitions(definition, &self.config.books);
            if contexts.is_empty() {
                tracing::warn!(stream = definition.name, "no books configured, skipping stream");
                continue;
            }

            for context in contexts {
                match self
                    .engine
                    .sync_partition(definition, &context, state, sink)
                    .await
                {
                    Ok(outcome) => summary.partitions.push(outcome),
                    Err(error) if error.kind() == SyncErrorKind::Sink => return Err(error),
                    Err(error) => {
                        tracing::error!(
                            stream = definition.name,
                            context = %context,
                            code = error.code(),
                            status = ?error.status(),
                            attempts = error.attempts(),
                            body = error.body_excerpt().unwrap_or_default(),
                            "partition failed: {}",
                            error.message()
                        );
                        summary.failures.push(error);
                    }
                }
            }
        }

        sink.write_state(state)?;

        tracing::info!(
            partitions = summary.partitions.len(),
            failures = summary.failures.len(),
            records = summary.records(),
            "sync finished"
        );
        Ok(summary)
    }
}
