//! Book partitions.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::streams::StreamDefinition;

/// Parameter set scoping one independent pagination sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<String>,
}

impl PartitionContext {
    /// The single context of a non-book stream.
    pub const fn unscoped() -> Self {
        Self { book: None }
    }

    pub fn for_book(book: impl Into<String>) -> Self {
        Self {
            book: Some(book.into()),
        }
    }

    /// Short label for logs and errors: `book=btc_mxn`, or empty.
    pub fn label(&self) -> String {
        match &self.book {
            Some(book) => format!("book={book}"),
            None => String::new(),
        }
    }
}

impl Display for PartitionContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// One context per configured book for book-based streams, in configuration
/// order and duplicates included; exactly one empty context otherwise.
///
/// A book-based stream with no books configured yields nothing.
pub fn plan_partitions(stream: &StreamDefinition, books: &[String]) -> Vec<PartitionContext> {
    if stream.book_based {
        books.iter().map(PartitionContext::for_book).collect()
    } else {
        vec![PartitionContext::unscoped()]
    }
}
