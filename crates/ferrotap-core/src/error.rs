use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Maximum number of response-body characters kept on a fatal API error.
pub const BODY_EXCERPT_LIMIT: usize = 512;

/// Configuration and credential errors, fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required credential '{field}'")]
    MissingCredential { field: &'static str },
    #[error("base_url must start with http:// or https://: '{value}'")]
    InvalidBaseUrl { value: String },
    #[error("book name at index {index} is empty")]
    EmptyBook { index: usize },
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("unknown stream '{name}'")]
    UnknownStream { name: String },
    #[error("failed to read '{path}': {message}")]
    Read { path: String, message: String },
    #[error("failed to parse '{path}': {message}")]
    Parse { path: String, message: String },
}

/// Sync error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// Missing or invalid credentials or settings.
    Configuration,
    /// Transient network fault or retriable status, surfaced once the retry budget is spent.
    RetriableTransport,
    /// Transport failure that retrying cannot fix (e.g. an unbuildable request).
    Transport,
    /// Non-retriable HTTP error status.
    FatalApi,
    /// Payload missing the record array or the replication-key field.
    MalformedResponse,
    /// The record sink refused a message.
    Sink,
}

/// Structured error raised while syncing one stream partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncError {
    kind: SyncErrorKind,
    message: String,
    status: Option<u16>,
    body_excerpt: Option<String>,
    attempts: u32,
    stream: Option<String>,
    context: Option<String>,
}

impl SyncError {
    fn new(kind: SyncErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            body_excerpt: None,
            attempts: 0,
            stream: None,
            context: None,
        }
    }

    pub fn configuration(error: ConfigError) -> Self {
        Self::new(SyncErrorKind::Configuration, error.to_string())
    }

    pub fn retriable_transport(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::RetriableTransport, message)
    }

    /// A retriable status code; keeps status and body so exhaustion can report them.
    pub fn retriable_status(status: u16, reason: &str, body: &str) -> Self {
        let mut error = Self::new(
            SyncErrorKind::RetriableTransport,
            format!("retriable status {status} {reason}").trim_end().to_owned(),
        );
        error.status = Some(status);
        error.body_excerpt = Some(excerpt(body));
        error
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Transport, message)
    }

    pub fn fatal_api(status: u16, body: &str) -> Self {
        let mut error = Self::new(SyncErrorKind::FatalApi, format!("upstream returned status {status}"));
        error.status = Some(status);
        error.body_excerpt = Some(excerpt(body));
        error
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::MalformedResponse, message)
    }

    pub fn sink(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Sink, message)
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Attach the stream name and partition label the error happened in.
    pub fn in_partition(mut self, stream: impl Into<String>, context: impl Into<String>) -> Self {
        self.stream = Some(stream.into());
        self.context = Some(context.into());
        self
    }

    pub const fn kind(&self) -> SyncErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn body_excerpt(&self) -> Option<&str> {
        self.body_excerpt.as_deref()
    }

    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn stream(&self) -> Option<&str> {
        self.stream.as_deref()
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub const fn retryable(&self) -> bool {
        matches!(self.kind, SyncErrorKind::RetriableTransport)
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SyncErrorKind::Configuration => "sync.configuration",
            SyncErrorKind::RetriableTransport => "sync.retriable_transport",
            SyncErrorKind::Transport => "sync.transport",
            SyncErrorKind::FatalApi => "sync.fatal_api",
            SyncErrorKind::MalformedResponse => "sync.malformed_response",
            SyncErrorKind::Sink => "sync.sink",
        }
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(stream) = &self.stream {
            write!(f, "[{stream}")?;
            if let Some(context) = self.context.as_deref().filter(|c| !c.is_empty()) {
                write!(f, " {context}")?;
            }
            f.write_str("] ")?;
        }
        write!(f, "{} ({})", self.message, self.code())?;
        if self.attempts > 1 {
            write!(f, " after {} attempts", self.attempts)?;
        }
        if let Some(body) = &self.body_excerpt {
            write!(f, ": {body}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SyncError {}

impl From<ConfigError> for SyncError {
    fn from(error: ConfigError) -> Self {
        Self::configuration(error)
    }
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT_LIMIT) {
        Some((index, _)) => format!("{}...", &body[..index]),
        None => body.to_owned(),
    }
}
