//! Record extraction and page-token derivation.

use std::fmt::{Display, Formatter};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SyncError;
use crate::streams::RecordsPath;

/// One emitted row.
pub type Record = Map<String, Value>;

/// A replication-key value: the next-page marker and the persisted bookmark.
///
/// Deserializing rejects anything [`Cursor::from_value`] would not accept.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Cursor(Value);

impl Cursor {
    /// Accepts non-empty strings and numbers; anything else ends pagination.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) if !text.is_empty() => Some(Self(value.clone())),
            Value::Number(_) => Some(Self(value.clone())),
            _ => None,
        }
    }

    /// Marker query-parameter rendering.
    pub fn as_marker(&self) -> String {
        match &self.0 {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).ok_or_else(|| {
            de::Error::custom(format!(
                "replication value must be a non-empty string or a number, got {value}"
            ))
        })
    }
}

impl From<i64> for Cursor {
    fn from(value: i64) -> Self {
        Self(Value::from(value))
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self(Value::from(value))
    }
}

impl Display for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_marker())
    }
}

/// Parse a response body and pull the records out of `payload`.
pub fn extract_records(body: &str, path: RecordsPath) -> Result<Vec<Record>, SyncError> {
    let mut document: Value = serde_json::from_str(body).map_err(|error| {
        SyncError::malformed_response(format!("response is not valid JSON: {error}"))
    })?;

    let payload = match document.get_mut("payload") {
        Some(payload) => payload.take(),
        None => {
            return Err(SyncError::malformed_response(
                "response has no 'payload' field",
            ))
        }
    };

    match (path, payload) {
        (RecordsPath::PayloadArray, Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(record) => Ok(record),
                other => Err(SyncError::malformed_response(format!(
                    "payload[{index}] is not an object: {other}"
                ))),
            })
            .collect(),
        (RecordsPath::PayloadObject, Value::Object(record)) => Ok(vec![record]),
        (RecordsPath::PayloadArray, other) => Err(SyncError::malformed_response(format!(
            "expected 'payload' to be an array, got {}",
            kind_name(&other)
        ))),
        (RecordsPath::PayloadObject, other) => Err(SyncError::malformed_response(format!(
            "expected 'payload' to be an object, got {}",
            kind_name(&other)
        ))),
    }
}

/// Next page token: the replication-key value of the last record.
///
/// An empty page, or a null or empty value, ends pagination. A last record
/// without the field at all is a malformed response.
pub fn next_page_token(records: &[Record], replication_key: &str) -> Result<Option<Cursor>, SyncError> {
    let Some(last) = records.last() else {
        return Ok(None);
    };

    match last.get(replication_key) {
        Some(value) => Ok(Cursor::from_value(value)),
        None => Err(SyncError::malformed_response(format!(
            "last record has no '{replication_key}' field to paginate on"
        ))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncErrorKind;
    use serde_json::json;

    #[test]
    fn extracts_payload_array_in_server_order() {
        let body = json!({
            "success": true,
            "payload": [{ "tid": 3 }, { "tid": 1 }, { "tid": 2 }]
        })
        .to_string();

        let records = extract_records(&body, RecordsPath::PayloadArray).expect("valid payload");
        let tids: Vec<i64> = records.iter().map(|r| r["tid"].as_i64().unwrap_or_default()).collect();
        assert_eq!(tids, vec![3, 1, 2]);
    }

    #[test]
    fn extracts_single_ticker_object() {
        let body = json!({ "success": true, "payload": { "book": "btc_mxn", "last": "1" } }).to_string();
        let records = extract_records(&body, RecordsPath::PayloadObject).expect("valid payload");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["book"], json!("btc_mxn"));
    }

    #[test]
    fn missing_payload_is_malformed() {
        let error = extract_records("{\"success\":true}", RecordsPath::PayloadArray)
            .expect_err("no payload");
        assert_eq!(error.kind(), SyncErrorKind::MalformedResponse);

        let error = extract_records("not json", RecordsPath::PayloadArray).expect_err("bad json");
        assert_eq!(error.kind(), SyncErrorKind::MalformedResponse);

        let error = extract_records("{\"payload\":{}}", RecordsPath::PayloadArray)
            .expect_err("object instead of array");
        assert!(error.message().contains("an object"));
    }

    #[test]
    fn token_comes_from_last_record() {
        let records: Vec<Record> = vec![
            json!({ "eid": "a1" }).as_object().cloned().unwrap_or_default(),
            json!({ "eid": "b2" }).as_object().cloned().unwrap_or_default(),
        ];
        assert_eq!(next_page_token(&records, "eid").expect("token"), Some(Cursor::from("b2")));
        assert_eq!(next_page_token(&[], "eid").expect("empty page"), None);
    }

    #[test]
    fn null_token_ends_but_missing_field_fails() {
        let null_last: Vec<Record> = vec![json!({ "tid": null }).as_object().cloned().unwrap_or_default()];
        assert_eq!(next_page_token(&null_last, "tid").expect("null ends"), None);

        let missing: Vec<Record> = vec![json!({ "price": "1" }).as_object().cloned().unwrap_or_default()];
        let error = next_page_token(&missing, "tid").expect_err("missing field");
        assert_eq!(error.kind(), SyncErrorKind::MalformedResponse);
    }

    #[test]
    fn cursor_renders_markers_and_rejects_non_scalars() {
        assert_eq!(Cursor::from(55845).as_marker(), "55845");
        assert_eq!(Cursor::from("c4a1").as_marker(), "c4a1");

        let parsed: Cursor = serde_json::from_value(json!(12)).expect("number");
        assert_eq!(parsed, Cursor::from(12));
        for bad in [json!(null), json!(""), json!(true), json!([1]), json!({ "tid": 1 })] {
            let error = serde_json::from_value::<Cursor>(bad.clone()).expect_err("not a cursor");
            assert!(error.to_string().contains("non-empty string or a number"), "{bad}");
        }
    }
}
