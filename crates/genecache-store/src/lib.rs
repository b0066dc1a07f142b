#![forbid(unsafe_code)]
//! Key-value store adapters.
//!
//! The primary store holds one flat field map per gene. The artifact store
//! holds a single binary blob under [`ARTIFACT_KEY`]. They are separate
//! handles so clearing one never touches the other.

use async_trait::async_trait;
use genecache_model::{FlattenedRecord, GeneId};
use std::fmt::{Display, Formatter};

mod memory;
mod redis_backend;

pub use memory::{MemoryArtifactStore, MemoryPrimaryStore};
pub use redis_backend::{RedisArtifactStore, RedisPolicy, RedisPrimaryStore, SCAN_BATCH};

pub const CRATE_NAME: &str = "genecache-store";

/// Fixed key of the cached summary artifact.
pub const ARTIFACT_KEY: &str = "image";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorKind {
    Connection,
    Timeout,
    Command,
}

impl StoreErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Timeout => "timeout",
            Self::Command => "command",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "store {} error: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for StoreError {}

#[async_trait]
pub trait PrimaryStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Sets every given field, last write wins. Fields not named are kept.
    async fn upsert_fields(&self, id: &GeneId, fields: &FlattenedRecord)
        -> Result<(), StoreError>;

    /// `Ok(None)` when no record exists under `id`.
    async fn get_record(&self, id: &GeneId) -> Result<Option<FlattenedRecord>, StoreError>;

    async fn list_keys(&self) -> Result<Vec<GeneId>, StoreError>;

    async fn get_all(&self) -> Result<Vec<FlattenedRecord>, StoreError>;

    async fn wipe_all(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn put(&self, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// `Ok(None)` when nothing is cached.
    async fn get(&self) -> Result<Option<Vec<u8>>, StoreError>;

    async fn wipe(&self) -> Result<(), StoreError>;
}
