//! Scripted transport and collecting sink shared by the behaviour tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use ferrotap_core::{
    HttpClient, HttpError, HttpRequest, HttpResponse, Record, RecordSink, StreamDefinition,
    SyncError, TapState,
};
use serde_json::{json, Value};

/// Replies from a fixed script, optionally per URL path, and records every request.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    script: Mutex<VecDeque<(Option<String>, Result<HttpResponse, HttpError>)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next request.
    pub fn then(self, reply: Result<HttpResponse, HttpError>) -> Self {
        self.push(None, reply);
        self
    }

    /// Queue a reply for the next request whose URL contains `fragment`.
    pub fn then_for(self, fragment: &str, reply: Result<HttpResponse, HttpError>) -> Self {
        self.push(Some(fragment.to_owned()), reply);
        self
    }

    pub fn then_page(self, payload: Value) -> Self {
        self.then(Ok(page(payload)))
    }

    fn push(&self, fragment: Option<String>, reply: Result<HttpResponse, HttpError>) {
        self.script
            .lock()
            .expect("script should not be poisoned")
            .push_back((fragment, reply));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|request| request.url).collect()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().expect("script should not be poisoned").len()
    }

    fn next_reply(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let mut script = self.script.lock().expect("script should not be poisoned");
        let position = script.iter().position(|(fragment, _)| match fragment {
            Some(fragment) => url.contains(fragment.as_str()),
            None => true,
        });
        match position.and_then(|index| script.remove(index)) {
            Some((_, reply)) => reply,
            None => Err(HttpError::non_retryable(format!("no scripted reply for {url}"))),
        }
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let reply = self.next_reply(&request.url);
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .push(request);
        Box::pin(async move { reply })
    }
}

/// A successful Bitso envelope around `payload`.
pub fn page(payload: Value) -> HttpResponse {
    HttpResponse::ok_json(json!({ "success": true, "payload": payload }).to_string())
}

pub fn error_body(status: u16, message: &str) -> HttpResponse {
    HttpResponse::new(
        status,
        json!({ "success": false, "error": { "code": "0201", "message": message } }).to_string(),
    )
}

/// Records in order, plus every emitted schema name and state snapshot.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub schemas: Vec<String>,
    pub records: Vec<(String, Record)>,
    pub states: Vec<TapState>,
}

impl CollectingSink {
    pub fn records_for(&self, stream: &str) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|(name, _)| name == stream)
            .map(|(_, record)| record)
            .collect()
    }
}

impl RecordSink for CollectingSink {
    fn write_schema(&mut self, stream: &StreamDefinition) -> Result<(), SyncError> {
        self.schemas.push(stream.name.to_owned());
        Ok(())
    }

    fn write_record(&mut self, stream: &StreamDefinition, record: Record) -> Result<(), SyncError> {
        self.records.push((stream.name.to_owned(), record));
        Ok(())
    }

    fn write_state(&mut self, state: &TapState) -> Result<(), SyncError> {
        self.states.push(state.clone());
        Ok(())
    }
}
