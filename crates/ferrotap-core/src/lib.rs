//! # Ferrotap Core
//!
//! Extraction engine for the Bitso REST API.
//!
//! ## Overview
//!
//! This crate turns authenticated Bitso endpoints into named record streams:
//!
//! - **Request signing** with the `Bitso key:nonce:signature` scheme
//! - **Marker pagination** driven by each stream's replication key
//! - **Book partitions** for book-scoped endpoints
//! - **Retry with constant backoff** for throttling and transient faults
//! - **Bookmarks** in the partitioned Singer state layout
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`auth`] | Credentials and request signer |
//! | [`catalog`] | Discovery catalog |
//! | [`config`] | Tap configuration |
//! | [`engine`] | Stream engine, partition pager and record sink |
//! | [`error`] | Configuration and sync errors |
//! | [`http_client`] | HTTP client abstraction |
//! | [`pagination`] | Record extraction and page tokens |
//! | [`partition`] | Partition contexts and planner |
//! | [`request`] | Request descriptors |
//! | [`retry`] | Retry controller |
//! | [`state`] | Persisted bookmarks |
//! | [`streams`] | Stream definitions |
//! | [`tap`] | Orchestrator |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ferrotap_core::{Tap, TapConfig, TapState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TapConfig::from_path("config.json")?.with_env_overrides();
//!     let tap = Tap::with_reqwest(config)?;
//!
//!     let mut state = TapState::new();
//!     let summary = tap.sync(&mut state, &mut my_sink).await?;
//!     println!("{} records", summary.records());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Tap            │──── plan_partitions(stream, books)
//! └────────┬────────┘
//!          │ (stream, context)
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Stream Engine   │────▶│ Request Signer   │
//! │ (pager)         │     └──────────────────┘
//! └────────┬────────┘
//!          │ signed request per attempt
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Retry Config    │────▶│ HTTP Client      │
//! └─────────────────┘     │ (reqwest/fake)   │
//!          │              └──────────────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Record Sink     │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Sync failures carry a [`SyncErrorKind`]:
//!
//! ```rust
//! use ferrotap_core::{SyncError, SyncErrorKind};
//!
//! fn describe(error: &SyncError) -> &'static str {
//!     match error.kind() {
//!         SyncErrorKind::RetriableTransport => "gave up after retrying",
//!         SyncErrorKind::FatalApi => "rejected by the exchange",
//!         SyncErrorKind::MalformedResponse => "unexpected payload",
//!         _ => "other",
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - The API secret never appears in `Debug` output or logs
//! - Every request is signed with a fresh millisecond nonce

pub mod auth;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod http_client;
pub mod pagination;
pub mod partition;
pub mod request;
pub mod retry;
pub mod state;
pub mod streams;
pub mod tap;

// Signing
pub use auth::{Credentials, RequestSigner};

// Catalog
pub use catalog::{Catalog, CatalogEntry, ReplicationMethod};

// Configuration
pub use config::TapConfig;

// Engine
pub use engine::{
    EngineSettings, PaginationState, PartitionOutcome, PartitionPager, RecordSink, StreamEngine,
};

// Error types
pub use error::{ConfigError, SyncError, SyncErrorKind};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Pagination
pub use pagination::{Cursor, Record};

// Partitions
pub use partition::{plan_partitions, PartitionContext};

pub use request::RequestDescriptor;

// Retry logic
pub use retry::{Backoff, RetryConfig};

pub use state::TapState;

pub use streams::{find_stream, RecordsPath, StreamDefinition, STREAMS};

pub use tap::{SyncSummary, Tap};
