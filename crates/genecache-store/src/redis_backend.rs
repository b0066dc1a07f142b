// SPDX-License-Identifier: Apache-2.0

use crate::{ArtifactStore, PrimaryStore, StoreError, StoreErrorKind, ARTIFACT_KEY};
use async_trait::async_trait;
use genecache_model::{FlattenedRecord, GeneId};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError, RedisResult};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct RedisPolicy {
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

impl Default for RedisPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(2),
        }
    }
}

/// Keys requested per `SCAN` step and per pipelined `HGETALL` batch. The
/// command timeout bounds each batch; a full scan has no overall deadline.
pub const SCAN_BATCH: usize = 500;

fn classify(op: &str, err: &RedisError) -> StoreError {
    let kind = if err.is_timeout() {
        StoreErrorKind::Timeout
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        StoreErrorKind::Connection
    } else {
        StoreErrorKind::Command
    };
    StoreError::new(kind, format!("{op} failed: {err}"))
}

/// One managed connection, opened at startup and cloned per command.
#[derive(Clone)]
struct RedisHandle {
    conn: ConnectionManager,
    policy: RedisPolicy,
}

impl RedisHandle {
    async fn connect(url: &str, policy: RedisPolicy) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|e| classify("open", &e))?;
        let conn = match timeout(policy.connect_timeout, ConnectionManager::new(client)).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(classify("connect", &e)),
            Err(_) => {
                return Err(StoreError::new(
                    StoreErrorKind::Timeout,
                    "connect timed out",
                ))
            }
        };
        Ok(Self { conn, policy })
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match timeout(self.policy.command_timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(classify(op, &e)),
            Err(_) => Err(StoreError::new(
                StoreErrorKind::Timeout,
                format!("{op} timed out"),
            )),
        }
    }
}

/// The single key filter shared by enumeration and the full scan.
fn parse_keys(raw: impl IntoIterator<Item = String>) -> Vec<GeneId> {
    raw.into_iter()
        .filter_map(|key| match GeneId::parse(&key) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(key = %key, "skipping foreign key in primary store: {e}");
                None
            }
        })
        .collect()
}

/// Primary store backed by one Redis logical database: one hash per gene.
#[derive(Clone)]
pub struct RedisPrimaryStore {
    handle: RedisHandle,
}

impl RedisPrimaryStore {
    pub async fn connect(url: &str, policy: RedisPolicy) -> Result<Self, StoreError> {
        Ok(Self {
            handle: RedisHandle::connect(url, policy).await?,
        })
    }

    /// Cursor walk over the keyspace. `SCAN` may repeat keys across steps,
    /// so results are deduplicated before parsing.
    async fn keys(&self) -> Result<Vec<GeneId>, StoreError> {
        let mut seen = BTreeSet::new();
        let mut cursor: u64 = 0;
        loop {
            let mut conn = self.handle.conn.clone();
            let (next, batch) = self
                .handle
                .bounded::<(u64, Vec<String>), _>("SCAN", async move {
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn)
                        .await
                })
                .await?;
            seen.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(parse_keys(seen))
    }

    async fn fetch_batch(&self, ids: &[GeneId]) -> Result<Vec<FlattenedRecord>, StoreError> {
        let mut pipe = redis::pipe();
        for id in ids {
            pipe.hgetall(id.as_str());
        }
        let mut conn = self.handle.conn.clone();
        let maps = self
            .handle
            .bounded::<Vec<HashMap<String, String>>, _>("HGETALL", async move {
                pipe.query_async(&mut conn).await
            })
            .await?;
        // A key removed between SCAN and HGETALL comes back empty.
        Ok(maps
            .into_iter()
            .filter(|fields| !fields.is_empty())
            .map(|fields| fields.into_iter().collect())
            .collect())
    }
}

#[async_trait]
impl PrimaryStore for RedisPrimaryStore {
    fn backend_tag(&self) -> &'static str {
        "redis"
    }

    async fn upsert_fields(
        &self,
        id: &GeneId,
        fields: &FlattenedRecord,
    ) -> Result<(), StoreError> {
        // HSET with no field/value pairs is a protocol error, and Redis never
        // stores an empty hash anyway.
        if fields.is_empty() {
            return Ok(());
        }
        let items: Vec<(&str, &str)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let mut conn = self.handle.conn.clone();
        let key = id.as_str();
        self.handle
            .bounded::<(), _>("HSET", async move { conn.hset_multiple(key, &items).await })
            .await
    }

    async fn get_record(&self, id: &GeneId) -> Result<Option<FlattenedRecord>, StoreError> {
        let mut conn = self.handle.conn.clone();
        let key = id.as_str();
        let fields = self
            .handle
            .bounded::<HashMap<String, String>, _>("HGETALL", async move {
                conn.hgetall(key).await
            })
            .await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(fields.into_iter().collect()))
    }

    async fn list_keys(&self) -> Result<Vec<GeneId>, StoreError> {
        self.keys().await
    }

    async fn get_all(&self) -> Result<Vec<FlattenedRecord>, StoreError> {
        let ids = self.keys().await?;
        let mut records = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(SCAN_BATCH) {
            records.extend(self.fetch_batch(chunk).await?);
        }
        Ok(records)
    }

    async fn wipe_all(&self) -> Result<(), StoreError> {
        let mut conn = self.handle.conn.clone();
        self.handle
            .bounded::<(), _>("FLUSHDB", async move {
                redis::cmd("FLUSHDB").query_async(&mut conn).await
            })
            .await
    }
}

/// Artifact store backed by its own Redis logical database.
#[derive(Clone)]
pub struct RedisArtifactStore {
    handle: RedisHandle,
}

impl RedisArtifactStore {
    pub async fn connect(url: &str, policy: RedisPolicy) -> Result<Self, StoreError> {
        Ok(Self {
            handle: RedisHandle::connect(url, policy).await?,
        })
    }
}

#[async_trait]
impl ArtifactStore for RedisArtifactStore {
    fn backend_tag(&self) -> &'static str {
        "redis"
    }

    async fn put(&self, bytes: Vec<u8>) -> Result<(), StoreError> {
        let mut conn = self.handle.conn.clone();
        self.handle
            .bounded::<(), _>("SET", async move { conn.set(ARTIFACT_KEY, bytes).await })
            .await
    }

    async fn get(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.handle.conn.clone();
        self.handle
            .bounded::<Option<Vec<u8>>, _>("GET", async move { conn.get(ARTIFACT_KEY).await })
            .await
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        let mut conn = self.handle.conn.clone();
        self.handle
            .bounded::<(), _>("DEL", async move { conn.del(ARTIFACT_KEY).await })
            .await
    }
}
