// SPDX-License-Identifier: Apache-2.0

use genecache_store::{ArtifactStore, StoreError};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactError {
    NotFound,
    Store(StoreError),
}

impl Display for ArtifactError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => f.write_str("no summary image cached"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ArtifactError {}

impl From<StoreError> for ArtifactError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Holds at most one rendered summary image, independent of gene data.
pub struct ArtifactCache {
    store: Arc<dyn ArtifactStore>,
}

impl ArtifactCache {
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    pub async fn put(&self, bytes: Vec<u8>) -> Result<(), ArtifactError> {
        Ok(self.store.put(bytes).await?)
    }

    pub async fn get(&self) -> Result<Vec<u8>, ArtifactError> {
        self.store.get().await?.ok_or(ArtifactError::NotFound)
    }

    pub async fn wipe(&self) -> Result<(), ArtifactError> {
        Ok(self.store.wipe().await?)
    }
}
