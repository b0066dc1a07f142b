// SPDX-License-Identifier: Apache-2.0

use genecache_model::{FlattenedRecord, GeneId, ParseError};
use genecache_store::{PrimaryStore, StoreError};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueryError {
    NotFound(String),
    InvalidId(String, ParseError),
    Store(StoreError),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "gene {id} not found"),
            Self::InvalidId(id, err) => write!(f, "gene id {id:?} is invalid: {err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<StoreError> for QueryError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Read-only lookups; every call goes straight to the primary store.
pub struct GeneQueryService {
    store: Arc<dyn PrimaryStore>,
}

impl GeneQueryService {
    #[must_use]
    pub fn new(store: Arc<dyn PrimaryStore>) -> Self {
        Self { store }
    }

    pub async fn list_ids(&self) -> Result<Vec<GeneId>, QueryError> {
        Ok(self.store.list_keys().await?)
    }

    pub async fn all_records(&self) -> Result<Vec<FlattenedRecord>, QueryError> {
        Ok(self.store.get_all().await?)
    }

    pub async fn record(&self, raw_id: &str) -> Result<FlattenedRecord, QueryError> {
        let id =
            GeneId::parse(raw_id).map_err(|e| QueryError::InvalidId(raw_id.to_string(), e))?;
        self.store
            .get_record(&id)
            .await?
            .ok_or_else(|| QueryError::NotFound(id.to_string()))
    }
}
