// SPDX-License-Identifier: Apache-2.0

use crate::{ArtifactStore, PrimaryStore, StoreError, StoreErrorKind};
use async_trait::async_trait;
use genecache_model::{FlattenedRecord, GeneId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

fn unavailable() -> StoreError {
    StoreError::new(StoreErrorKind::Connection, "memory store marked unavailable")
}

/// In-process primary store. Unlike Redis it can hold a record with zero fields.
#[derive(Default)]
pub struct MemoryPrimaryStore {
    records: RwLock<BTreeMap<GeneId, FlattenedRecord>>,
    unavailable: AtomicBool,
}

impl MemoryPrimaryStore {
    /// Makes every subsequent call fail with a connection error until reset.
    pub fn set_unavailable(&self, value: bool) {
        self.unavailable.store(value, Ordering::Relaxed);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl PrimaryStore for MemoryPrimaryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn upsert_fields(
        &self,
        id: &GeneId,
        fields: &FlattenedRecord,
    ) -> Result<(), StoreError> {
        self.check()?;
        let mut records = self.records.write().await;
        let entry = records.entry(id.clone()).or_default();
        for (name, value) in fields.iter() {
            entry.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    async fn get_record(&self, id: &GeneId) -> Result<Option<FlattenedRecord>, StoreError> {
        self.check()?;
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list_keys(&self) -> Result<Vec<GeneId>, StoreError> {
        self.check()?;
        Ok(self.records.read().await.keys().cloned().collect())
    }

    async fn get_all(&self) -> Result<Vec<FlattenedRecord>, StoreError> {
        self.check()?;
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn wipe_all(&self) -> Result<(), StoreError> {
        self.check()?;
        self.records.write().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryArtifactStore {
    artifact: RwLock<Option<Vec<u8>>>,
    unavailable: AtomicBool,
}

impl MemoryArtifactStore {
    pub fn set_unavailable(&self, value: bool) {
        self.unavailable.store(value, Ordering::Relaxed);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.check()?;
        *self.artifact.write().await = Some(bytes);
        Ok(())
    }

    async fn get(&self) -> Result<Option<Vec<u8>>, StoreError> {
        self.check()?;
        Ok(self.artifact.read().await.clone())
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        self.check()?;
        *self.artifact.write().await = None;
        Ok(())
    }
}
