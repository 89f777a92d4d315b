//! # Singer message output
//!
//! Every message is one JSON object on its own line:
//!
//! | Type | Emitted |
//! |------|---------|
//! | `SCHEMA` | once per stream, before its records |
//! | `RECORD` | once per record, with `time_extracted` |
//! | `STATE` | after each page that moved a bookmark, and once at the end |
//!
//! `STATE` lines are flushed immediately so a downstream target can persist
//! them even if the tap is killed afterwards.

use std::io::Write;

use ferrotap_core::{Catalog, Record, RecordSink, StreamDefinition, SyncError, TapState};
use serde::Serialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::CliError;

/// One Singer protocol message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SingerMessage {
    Schema {
        stream: String,
        schema: Value,
        key_properties: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        bookmark_properties: Vec<String>,
    },
    Record {
        stream: String,
        record: Record,
        time_extracted: String,
    },
    State {
        value: TapState,
    },
}

/// Writes Singer messages as NDJSON.
pub struct SingerWriter<W: Write> {
    writer: W,
    records_written: u64,
}

impl<W: Write> SingerWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            records_written: 0,
        }
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn emit(&mut self, message: &SingerMessage) -> Result<(), CliError> {
        serde_json::to_writer(&mut self.writer, message)?;
        self.writer.write_all(b"\n")?;
        if matches!(message, SingerMessage::State { .. }) {
            self.writer.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), CliError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> RecordSink for SingerWriter<W> {
    fn write_schema(&mut self, stream: &StreamDefinition) -> Result<(), SyncError> {
        let message = SingerMessage::Schema {
            stream: stream.name.to_owned(),
            schema: stream.schema(),
            key_properties: stream.primary_keys.iter().map(|key| (*key).to_owned()).collect(),
            bookmark_properties: stream.replication_key.into_iter().map(str::to_owned).collect(),
        };
        self.emit(&message).map_err(sink_error)
    }

    fn write_record(&mut self, stream: &StreamDefinition, record: Record) -> Result<(), SyncError> {
        let message = SingerMessage::Record {
            stream: stream.name.to_owned(),
            record,
            time_extracted: now_rfc3339(),
        };
        self.emit(&message).map_err(sink_error)?;
        self.records_written += 1;
        Ok(())
    }

    fn write_state(&mut self, state: &TapState) -> Result<(), SyncError> {
        self.emit(&SingerMessage::State {
            value: state.clone(),
        })
        .map_err(sink_error)
    }
}

/// Pretty-print the discovery catalog.
pub fn render_catalog<W: Write>(mut writer: W, catalog: &Catalog) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut writer, catalog)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn sink_error(error: CliError) -> SyncError {
    SyncError::sink(format!("failed to write to stdout: {error}"))
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}
