//! The unit of a streamed query result.
use bytes::Bytes;

use crate::value::{Field, Value};

/// One chunk of a streamed query result.
///
/// On the wire this is a `PartialResultSet`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    /// Values in row-major order, may span row boundaries.
    pub values: Vec<Value>,
    /// Whether the last value continues in the next fragment.
    pub chunked_value: bool,
    /// Opaque resume marker, empty if none.
    pub resume_token: Bytes,
    /// Row type, present on the first fragment only.
    pub metadata: Option<Metadata>,
    /// Execution statistics, present on the last fragment only.
    pub stats: Option<Stats>,
}

impl Fragment {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values, ..Default::default() }
    }

    /// Set the resume token.
    pub fn resume_token(mut self, token: impl Into<Bytes>) -> Self {
        self.resume_token = token.into();
        self
    }

    /// Mark the last value as continuing in the next fragment.
    pub fn chunked(mut self) -> Self {
        self.chunked_value = true;
        self
    }

    /// Set the row type.
    pub fn metadata(mut self, fields: Vec<Field>) -> Self {
        self.metadata = Some(Metadata { fields });
        self
    }

    /// Set the execution statistics.
    pub fn stats(mut self, stats: Stats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// A fragment carrying a resume token is a checkpoint.
    pub fn is_checkpoint(&self) -> bool {
        !self.resume_token.is_empty()
    }
}

/// Result row type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub fields: Vec<Field>,
}

/// Aggregate execution statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub row_count_exact: Option<i64>,
    pub row_count_lower_bound: Option<i64>,
    pub query_stats: Vec<(String, Value)>,
}
