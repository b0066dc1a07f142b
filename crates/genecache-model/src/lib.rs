#![forbid(unsafe_code)]
//! Gene record model shared by the store adapters and the service.
//!
//! Source records arrive as loosely-typed JSON objects. They are decoded into
//! [`SourceRecord`] (a map of [`FieldValue`]s), flattened into
//! [`FlattenedRecord`] for storage, and aggregated into a [`FrequencyTable`]
//! for summaries.

mod record;
mod summary;

pub use record::{
    flatten, FieldValue, FlattenedRecord, GeneId, ParseError, RecordError, SourceDocument,
    SourceRecord, DEFAULT_IDENTIFIER_FIELD, LIST_DELIMITER,
};
pub use summary::{
    summarize_records, Bucket, FrequencyTable, NOT_AVAILABLE_LABEL, SMALL_BUCKET_PERCENT,
};

pub const CRATE_NAME: &str = "genecache-model";
