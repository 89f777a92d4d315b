//! Stream engine: signed, paginated and retried extraction of one partition.
//!
//! A [`PartitionPager`] walks the pages of one (stream, context) pair as an
//! explicit state machine. [`StreamEngine::sync_partition`] drains a pager
//! into a [`RecordSink`] and keeps the partition bookmark current.

use std::sync::Arc;

use crate::auth::RequestSigner;
use crate::config::TapConfig;
use crate::error::{ConfigError, SyncError};
use crate::http_client::HttpClient;
use crate::pagination::{extract_records, next_page_token, Cursor, Record};
use crate::partition::PartitionContext;
use crate::request::RequestDescriptor;
use crate::retry::RetryConfig;
use crate::state::TapState;
use crate::streams::StreamDefinition;

/// Page size requested from incremental endpoints.
pub const PAGE_SIZE: u32 = 100;

/// Consumer of schemas, records and bookmarks.
pub trait RecordSink: Send {
    fn write_schema(&mut self, stream: &StreamDefinition) -> Result<(), SyncError>;

    /// Called once per record, in server order.
    fn write_record(&mut self, stream: &StreamDefinition, record: Record) -> Result<(), SyncError>;

    fn write_state(&mut self, state: &TapState) -> Result<(), SyncError>;
}

/// Request-shaping settings shared by every partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub base_url: String,
    pub user_agent: Option<String>,
    pub timeout_ms: u64,
    pub page_size: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_url: String::from("https://api.bitso.com"),
            user_agent: None,
            timeout_ms: 30_000,
            page_size: PAGE_SIZE,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &TapConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            user_agent: config.user_agent.clone(),
            timeout_ms: config.request_timeout_ms,
            page_size: PAGE_SIZE,
        }
    }
}

/// Where a pager is in its page sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum PaginationState {
    /// No request issued yet; the first page starts from the bookmark, if any.
    Start,
    /// A request is in flight.
    Fetching,
    /// The previous page produced a continuation token.
    HasMore(Cursor),
    Done,
}

/// Summary of one finished partition.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionOutcome {
    pub stream: &'static str,
    pub context: PartitionContext,
    pub pages: u32,
    pub records: u64,
    pub bookmark: Option<Cursor>,
}

/// Builds, signs and sends page requests for any stream.
#[derive(Clone)]
pub struct StreamEngine {
    client: Arc<dyn HttpClient>,
    signer: RequestSigner,
    retry: RetryConfig,
    settings: EngineSettings,
}

impl StreamEngine {
    pub fn new(
        client: Arc<dyn HttpClient>,
        signer: RequestSigner,
        retry: RetryConfig,
        settings: EngineSettings,
    ) -> Self {
        Self {
            client,
            signer,
            retry,
            settings,
        }
    }

    pub fn from_config(config: &TapConfig, client: Arc<dyn HttpClient>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            client,
            RequestSigner::new(config.credentials()?),
            config.retry_config(),
            EngineSettings::from_config(config),
        ))
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// Unsigned request for one page.
    ///
    /// Query order is `marker`, `limit`, `sort`, `book`; `limit` and `sort`
    /// only for streams with a replication key, `book` only for book-based ones.
    pub fn descriptor(
        &self,
        stream: &StreamDefinition,
        context: &PartitionContext,
        marker: Option<&Cursor>,
    ) -> RequestDescriptor {
        let mut descriptor = RequestDescriptor::get(self.settings.base_url.as_str(), stream.path);

        if let Some(marker) = marker {
            descriptor = descriptor.with_query("marker", marker.as_marker());
        }
        if stream.is_incremental() {
            descriptor = descriptor
                .with_query("limit", self.settings.page_size.to_string())
                .with_query("sort", "asc");
        }
        if stream.book_based {
            if let Some(book) = &context.book {
                descriptor = descriptor.with_query("book", book.as_str());
            }
        }
        if let Some(user_agent) = &self.settings.user_agent {
            descriptor = descriptor.with_header("User-Agent", user_agent.as_str());
        }

        descriptor
    }

    /// Pager over `stream` in `context`, resuming after `bookmark` when given.
    pub fn pager(
        &self,
        stream: &'static StreamDefinition,
        context: PartitionContext,
        bookmark: Option<Cursor>,
    ) -> PartitionPager<'_> {
        PartitionPager {
            engine: self,
            stream,
            context,
            bookmark,
            start_token: None,
            state: PaginationState::Start,
            requests: 0,
        }
    }

    async fn fetch_page(
        &self,
        stream: &StreamDefinition,
        context: &PartitionContext,
        marker: Option<&Cursor>,
    ) -> Result<Vec<Record>, SyncError> {
        let descriptor = self.descriptor(stream, context, marker);
        let timeout_ms = self.settings.timeout_ms;

        let response = self
            .retry
            .execute(self.client.as_ref(), || {
                self.signer.sign(descriptor.clone(), timeout_ms)
            })
            .await?;

        extract_records(&response.body, stream.records)
    }

    /// Sync one partition: every record goes to `sink` in server order and
    /// the bookmark in `state` moves to the last record of each page.
    pub async fn sync_partition(
        &self,
        stream: &'static StreamDefinition,
        context: &PartitionContext,
        state: &mut TapState,
        sink: &mut dyn RecordSink,
    ) -> Result<PartitionOutcome, SyncError> {
        let label = context.label();
        let bookmark = stream
            .replication_key
            .and_then(|_| state.bookmark(stream.name, context).cloned());

        tracing::info!(
            stream = stream.name,
            context = %label,
            bookmark = %bookmark.as_ref().map(Cursor::as_marker).unwrap_or_default(),
            "syncing partition"
        );

        let mut outcome = PartitionOutcome {
            stream: stream.name,
            context: context.clone(),
            pages: 0,
            records: 0,
            bookmark: bookmark.clone(),
        };
        let mut pager = self.pager(stream, context.clone(), bookmark);

        while let Some(records) = pager
            .next_page()
            .await
            .map_err(|error| error.in_partition(stream.name, label.as_str()))?
        {
            outcome.pages += 1;
            let page_len = records.len();
            let last_seen = stream
                .replication_key
                .and_then(|key| records.last()?.get(key))
                .and_then(Cursor::from_value);

            for record in records {
                sink.write_record(stream, record)
                    .map_err(|error| error.in_partition(stream.name, label.as_str()))?;
                outcome.records += 1;
            }

            tracing::debug!(
                stream = stream.name,
                context = %label,
                page = outcome.pages,
                records = page_len,
                "page received"
            );

            if let (Some(key), Some(value)) = (stream.replication_key, last_seen) {
                if outcome.bookmark.as_ref() != Some(&value) {
                    state.set_bookmark(stream.name, context, key, value.clone());
                    sink.write_state(state)
                        .map_err(|error| error.in_partition(stream.name, label.as_str()))?;
                    outcome.bookmark = Some(value);
                }
            }
        }

        tracing::info!(
            stream = stream.name,
            context = %label,
            pages = outcome.pages,
            records = outcome.records,
            requests = pager.requests(),
            "partition complete"
        );
        Ok(outcome)
    }
}

/// Page-by-page walk over one (stream, context) pair.
///
/// Each `next_page` call issues exactly one request; records come back in
/// server order and nothing is fetched ahead.
pub struct PartitionPager<'a> {
    engine: &'a StreamEngine,
    stream: &'static StreamDefinition,
    context: PartitionContext,
    bookmark: Option<Cursor>,
    start_token: Option<Cursor>,
    state: PaginationState,
    requests: u32,
}

impl PartitionPager<'_> {
    /// Start from `token` instead of the bookmark.
    #[must_use]
    pub fn with_start_token(mut self, token: Option<Cursor>) -> Self {
        self.start_token = token;
        self
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    /// Requests issued so far, counting one per page regardless of retries.
    pub const fn requests(&self) -> u32 {
        self.requests
    }

    /// Fetch the next page, or `None` once pagination is over.
    ///
    /// Any error also moves the pager to `Done`.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Record>>, SyncError> {
        let marker = match std::mem::replace(&mut self.state, PaginationState::Fetching) {
            PaginationState::Start => self.start_token.clone().or_else(|| self.bookmark.clone()),
            PaginationState::HasMore(token) => Some(token),
            PaginationState::Done => {
                self.state = PaginationState::Done;
                return Ok(None);
            }
            PaginationState::Fetching => {
                self.state = PaginationState::Done;
                return Err(SyncError::transport(
                    "previous page fetch was interrupted before completing",
                ));
            }
        };

        self.requests += 1;
        match self.fetch(marker).await {
            Ok((records, next)) => {
                self.state = match next {
                    Some(token) => PaginationState::HasMore(token),
                    None => PaginationState::Done,
                };
                Ok(Some(records))
            }
            Err(error) => {
                self.state = PaginationState::Done;
                Err(error)
            }
        }
    }

    async fn fetch(&self, marker: Option<Cursor>) -> Result<(Vec<Record>, Option<Cursor>), SyncError> {
        let records = self
            .engine
            .fetch_page(self.stream, &self.context, marker.as_ref())
            .await?;

        let next = match self.stream.replication_key {
            Some(key) => next_page_token(&records, key)?,
            None => None,
        };

        if let (Some(previous), Some(next)) = (&marker, &next) {
            if previous == next {
                return Err(SyncError::malformed_response(format!(
                    "pagination did not advance past marker {previous}"
                )));
            }
        }

        Ok((records, next))
    }
}
