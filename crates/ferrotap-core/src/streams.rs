//! Static stream definitions for the Bitso endpoints.
//!
//! Each stream is a value, not a type: the engine reads the path, the
//! replication key and the `book_based` flag off the definition.

use serde_json::{json, Map, Value};

/// Where the record array lives in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordsPath {
    /// `$.payload[*]`
    PayloadArray,
    /// `$.payload`, a single object per response.
    PayloadObject,
}

/// One extracted entity type.
#[derive(Debug, Clone, Copy)]
pub struct StreamDefinition {
    pub name: &'static str,
    pub path: &'static str,
    pub replication_key: Option<&'static str>,
    pub primary_keys: &'static [&'static str],
    pub book_based: bool,
    pub records: RecordsPath,
    schema: fn() -> Value,
}

impl StreamDefinition {
    /// JSON schema of the stream's records.
    pub fn schema(&self) -> Value {
        (self.schema)()
    }

    pub const fn is_incremental(&self) -> bool {
        self.replication_key.is_some()
    }
}

impl PartialEq for StreamDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for StreamDefinition {}

pub static BOOKS: StreamDefinition = StreamDefinition {
    name: "books",
    path: "/v3/available_books",
    replication_key: None,
    primary_keys: &["book"],
    book_based: false,
    records: RecordsPath::PayloadArray,
    schema: books_schema,
};

/// Ledger entries. Bitso marks this endpoint deprecated but still serves it.
pub static LEDGER: StreamDefinition = StreamDefinition {
    name: "ledger",
    path: "/v3/ledger",
    replication_key: Some("eid"),
    primary_keys: &["eid"],
    book_based: false,
    records: RecordsPath::PayloadArray,
    schema: ledger_schema,
};

pub static TICKERS: StreamDefinition = StreamDefinition {
    name: "tickers",
    path: "/v3/ticker",
    replication_key: None,
    primary_keys: &["book", "created_at"],
    book_based: true,
    records: RecordsPath::PayloadObject,
    schema: ticker_schema,
};

pub static USER_TRADES: StreamDefinition = StreamDefinition {
    name: "user_trades",
    path: "/v3/user_trades",
    replication_key: Some("tid"),
    primary_keys: &["tid"],
    book_based: true,
    records: RecordsPath::PayloadArray,
    schema: trade_schema,
};

pub static TRADES: StreamDefinition = StreamDefinition {
    name: "trades",
    path: "/v3/trades",
    replication_key: Some("tid"),
    primary_keys: &["tid"],
    book_based: true,
    records: RecordsPath::PayloadArray,
    schema: trade_schema,
};

/// All streams in sync order.
pub static STREAMS: [&StreamDefinition; 5] = [&BOOKS, &LEDGER, &TICKERS, &USER_TRADES, &TRADES];

pub fn find_stream(name: &str) -> Option<&'static StreamDefinition> {
    STREAMS.iter().copied().find(|definition| definition.name == name)
}

fn typed(ty: &str, required: bool) -> Value {
    if required {
        json!({ "type": [ty] })
    } else {
        json!({ "type": [ty, "null"] })
    }
}

fn date_time(required: bool) -> Value {
    let mut value = typed("string", required);
    value["format"] = json!("date-time");
    value
}

fn object(properties: Vec<(&str, Value)>, required: &[&str], nullable: bool) -> Value {
    let properties: Map<String, Value> = properties
        .into_iter()
        .map(|(name, schema)| (name.to_owned(), schema))
        .collect();
    let ty = if nullable {
        json!(["object", "null"])
    } else {
        json!(["object"])
    };

    let mut value = json!({ "type": ty, "properties": properties });
    if !required.is_empty() {
        value["required"] = json!(required);
    }
    value
}

fn array(items: Value, required: bool) -> Value {
    let mut value = typed("array", required);
    value["items"] = items;
    value
}

fn strings(names: &[&'static str]) -> Vec<(&'static str, Value)> {
    names
        .iter()
        .map(|name| (*name, typed("string", true)))
        .collect()
}

fn trade_schema() -> Value {
    object(
        vec![
            ("book", typed("string", true)),
            ("created_at", date_time(true)),
            ("amount", typed("string", true)),
            ("maker_side", typed("string", true)),
            ("price", typed("string", true)),
            ("tid", typed("integer", true)),
        ],
        &["book", "created_at", "amount", "maker_side", "price", "tid"],
        false,
    )
}

fn ledger_schema() -> Value {
    let balance_update = object(
        strings(&["amount", "currency"]),
        &["amount", "currency"],
        true,
    );

    let mut details = vec![("tid", typed("integer", false))];
    details.extend(strings(&[
        "fid",
        "asset",
        "method",
        "network",
        "protocol",
        "integration",
        "method_name",
        "oid",
        "qid",
    ]));

    object(
        vec![
            ("eid", typed("string", true)),
            ("balance_updates", array(balance_update, true)),
            ("created_at", date_time(true)),
            ("details", object(details, &[], true)),
            ("operation", typed("string", true)),
        ],
        &["eid", "balance_updates", "created_at", "operation"],
        false,
    )
}

fn ticker_schema() -> Value {
    let mut properties = strings(&[
        "book", "volume", "high", "last", "low", "vwap", "ask", "bid", "change_24",
    ]);
    properties.push(("created_at", date_time(true)));
    properties.push((
        "rolling_average_change",
        object(vec![("6", typed("string", false))], &[], false),
    ));

    object(
        properties,
        &[
            "book",
            "volume",
            "high",
            "last",
            "low",
            "vwap",
            "ask",
            "bid",
            "change_24",
            "created_at",
            "rolling_average_change",
        ],
        false,
    )
}

fn books_schema() -> Value {
    let flat_rate = {
        let mut value = object(strings(&["maker", "taker"]), &["maker", "taker"], false);
        value["additionalProperties"] = json!(true);
        value
    };
    let tier = object(
        strings(&["volume", "maker", "taker"]),
        &["volume", "maker", "taker"],
        true,
    );
    let fees = {
        let mut value = object(
            vec![("flat_rate", flat_rate), ("structure", array(tier, false))],
            &["flat_rate"],
            false,
        );
        value["additionalProperties"] = json!(true);
        value
    };

    let mut properties = strings(&[
        "book",
        "minimum_amount",
        "maximum_amount",
        "minimum_price",
        "maximum_price",
        "minimum_value",
        "maximum_value",
        "tick_size",
        "default_chart",
    ]);
    properties.push(("fees", fees));

    let mut value = object(
        properties,
        &[
            "book",
            "minimum_amount",
            "maximum_amount",
            "minimum_price",
            "maximum_price",
            "minimum_value",
            "maximum_value",
            "tick_size",
            "default_chart",
            "fees",
        ],
        false,
    );
    value["additionalProperties"] = json!(true);
    value
}
