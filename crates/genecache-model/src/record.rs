// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub const DEFAULT_IDENTIFIER_FIELD: &str = "hgnc_id";

/// Joins list-valued fields. Elements containing the delimiter are not
/// escaped, so a stored value cannot always be split back into its elements.
pub const LIST_DELIMITER: char = '|';

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    Empty(&'static str),
    Trimmed(&'static str),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty(name) => write!(f, "{name} must not be empty"),
            Self::Trimmed(name) => {
                write!(f, "{name} must not contain leading/trailing whitespace")
            }
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecordError {
    NotAnObject,
    MissingIdentifier(String),
    InvalidIdentifier(String, ParseError),
}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => f.write_str("source record is not a JSON object"),
            Self::MissingIdentifier(field) => {
                write!(f, "source record has no scalar identifier field `{field}`")
            }
            Self::InvalidIdentifier(field, err) => {
                write!(f, "source record identifier `{field}` is invalid: {err}")
            }
        }
    }
}

impl std::error::Error for RecordError {}

/// Stable, source-assigned gene identifier (for HGNC data, `HGNC:5`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct GeneId(String);

impl GeneId {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        if input.is_empty() {
            return Err(ParseError::Empty("gene_id"));
        }
        if input.trim() != input {
            return Err(ParseError::Trimmed("gene_id"));
        }
        Ok(Self(input.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GeneId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Scalars pass through; lists join in order, and an empty list becomes `""`.
    #[must_use]
    pub fn flatten(&self) -> String {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::List(items) => {
                let mut out = String::new();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(LIST_DELIMITER);
                    }
                    out.push_str(item);
                }
                out
            }
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// One heterogeneous source record. Absent and `null` fields are not present.
/// A `null` inside a list is kept as an empty element so positions survive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl SourceRecord {
    pub fn from_json(value: &Value) -> Result<Self, RecordError> {
        let object = value.as_object().ok_or(RecordError::NotAnObject)?;
        let mut fields = BTreeMap::new();
        for (name, raw) in object {
            let field = match raw {
                Value::Null => continue,
                Value::Array(items) => FieldValue::List(items.iter().map(scalar_text).collect()),
                other => FieldValue::Scalar(scalar_text(other)),
            };
            fields.insert(name.clone(), field);
        }
        Ok(Self { fields })
    }

    pub fn identifier(&self, field: &str) -> Result<GeneId, RecordError> {
        match self.fields.get(field) {
            Some(FieldValue::Scalar(raw)) => GeneId::parse(raw)
                .map_err(|e| RecordError::InvalidIdentifier(field.to_string(), e)),
            _ => Err(RecordError::MissingIdentifier(field.to_string())),
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }
}

/// Storage view of a record: every value is a single string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlattenedRecord(BTreeMap<String, String>);

impl FlattenedRecord {
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlattenedRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[must_use]
pub fn flatten(record: &SourceRecord) -> FlattenedRecord {
    record
        .iter()
        .map(|(name, value)| (name.clone(), value.flatten()))
        .collect()
}

/// Upstream document shape: `{ "response": { "docs": [ ... ] } }`.
/// Records stay raw JSON so one malformed record cannot fail the whole decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    response: SourceResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SourceResponse {
    docs: Vec<Value>,
}

impl SourceDocument {
    #[must_use]
    pub fn new(docs: Vec<Value>) -> Self {
        Self {
            response: SourceResponse { docs },
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    #[must_use]
    pub fn records(&self) -> &[Value] {
        &self.response.docs
    }
}
