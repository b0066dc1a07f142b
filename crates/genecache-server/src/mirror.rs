// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use genecache_model::{flatten, SourceDocument, SourceRecord};
use genecache_store::{PrimaryStore, StoreError};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MirrorError {
    InvalidSource(String),
    UpstreamFetch(String),
    UpstreamStatus(u16),
    UpstreamDecode(String),
    Store(StoreError),
    PartialApply {
        report: RefreshReport,
        cause: StoreError,
    },
}

impl Display for MirrorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSource(msg) => write!(f, "invalid source url: {msg}"),
            Self::UpstreamFetch(msg) => write!(f, "dataset fetch failed: {msg}"),
            Self::UpstreamStatus(status) => {
                write!(f, "dataset fetch failed: upstream returned status {status}")
            }
            Self::UpstreamDecode(msg) => write!(f, "dataset decode failed: {msg}"),
            Self::Store(err) => write!(f, "refresh aborted: {err}"),
            Self::PartialApply { report, cause } => write!(
                f,
                "refresh partially applied ({} upserted, {} failed): {cause}",
                report.processed, report.failed
            ),
        }
    }
}

impl std::error::Error for MirrorError {}

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self) -> Result<SourceDocument, MirrorError>;
}

/// Fetches the upstream dataset as one JSON document over HTTP.
pub struct HttpSourceFetcher {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl HttpSourceFetcher {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, MirrorError> {
        let url = reqwest::Url::parse(url).map_err(|e| MirrorError::InvalidSource(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MirrorError::InvalidSource(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("genecache/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MirrorError::InvalidSource(e.to_string()))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<SourceDocument, MirrorError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| MirrorError::UpstreamFetch(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::UpstreamStatus(status.as_u16()));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MirrorError::UpstreamFetch(e.to_string()))?;
        SourceDocument::from_slice(&bytes).map_err(|e| MirrorError::UpstreamDecode(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct MirrorOptions {
    pub identifier_field: String,
    pub replace_on_refresh: bool,
    pub serialize_refreshes: bool,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            identifier_field: genecache_model::DEFAULT_IDENTIFIER_FIELD.to_string(),
            replace_on_refresh: false,
            serialize_refreshes: false,
        }
    }
}

/// Copies the upstream dataset into the primary store.
///
/// By default a refresh only upserts: keys missing from the new fetch stay in
/// the store, and concurrent refreshes interleave per record.
/// `replace_on_refresh` and `serialize_refreshes` opt into a wipe before
/// upserting and a refresh-level lock respectively.
pub struct MirrorService {
    fetcher: Arc<dyn SourceFetcher>,
    store: Arc<dyn PrimaryStore>,
    options: MirrorOptions,
    refresh_lock: Mutex<()>,
}

impl MirrorService {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        store: Arc<dyn PrimaryStore>,
        options: MirrorOptions,
    ) -> Self {
        Self {
            fetcher,
            store,
            options,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Operator-issued clear of the primary store.
    pub async fn clear(&self) -> Result<(), MirrorError> {
        self.store.wipe_all().await.map_err(MirrorError::Store)?;
        info!("primary store cleared");
        Ok(())
    }

    pub async fn refresh(&self) -> Result<RefreshReport, MirrorError> {
        let _guard = if self.options.serialize_refreshes {
            Some(self.refresh_lock.lock().await)
        } else {
            None
        };
        let started = Instant::now();
        info!(backend = self.store.backend_tag(), "mirror refresh started");

        let document = self.fetcher.fetch().await.inspect_err(|e| {
            error!("mirror refresh aborted before any upsert: {e}");
        })?;

        if self.options.replace_on_refresh {
            self.store.wipe_all().await.map_err(|e| {
                error!("mirror refresh could not clear primary store: {e}");
                MirrorError::Store(e)
            })?;
        }

        let field = self.options.identifier_field.as_str();
        let mut report = RefreshReport::default();
        let mut last_failure: Option<StoreError> = None;
        for raw in document.records() {
            let record = match SourceRecord::from_json(raw) {
                Ok(record) => record,
                Err(e) => {
                    warn!("skipping source record: {e}");
                    report.skipped += 1;
                    continue;
                }
            };
            let id = match record.identifier(field) {
                Ok(id) => id,
                Err(e) => {
                    warn!("skipping source record: {e}");
                    report.skipped += 1;
                    continue;
                }
            };
            match self.store.upsert_fields(&id, &flatten(&record)).await {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    if last_failure.is_none() {
                        error!(
                            gene_id = %id,
                            "upsert failed, continuing with remaining records: {e}"
                        );
                    }
                    report.failed += 1;
                    last_failure = Some(e);
                }
            }
        }

        info!(
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "mirror refresh finished"
        );
        match last_failure {
            None => Ok(report),
            Some(cause) => Err(MirrorError::PartialApply { report, cause }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genecache_model::{FlattenedRecord, GeneId};
    use genecache_store::MemoryPrimaryStore;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    type EventLog = Arc<StdMutex<Vec<String>>>;

    fn push(log: &EventLog, event: String) {
        log.lock().expect("event log").push(event);
    }

    /// Records each fetch and yields before returning, so a second refresh
    /// gets a chance to run mid-fetch.
    struct YieldingSource {
        doc: SourceDocument,
        log: EventLog,
    }

    #[async_trait]
    impl SourceFetcher for YieldingSource {
        async fn fetch(&self) -> Result<SourceDocument, MirrorError> {
            push(&self.log, "fetch".to_string());
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            Ok(self.doc.clone())
        }
    }

    struct RecordingStore {
        inner: MemoryPrimaryStore,
        log: EventLog,
    }

    #[async_trait]
    impl PrimaryStore for RecordingStore {
        fn backend_tag(&self) -> &'static str {
            "recording"
        }

        async fn upsert_fields(
            &self,
            id: &GeneId,
            fields: &FlattenedRecord,
        ) -> Result<(), StoreError> {
            push(&self.log, format!("upsert {id}"));
            tokio::task::yield_now().await;
            self.inner.upsert_fields(id, fields).await
        }

        async fn get_record(&self, id: &GeneId) -> Result<Option<FlattenedRecord>, StoreError> {
            self.inner.get_record(id).await
        }

        async fn list_keys(&self) -> Result<Vec<GeneId>, StoreError> {
            self.inner.list_keys().await
        }

        async fn get_all(&self) -> Result<Vec<FlattenedRecord>, StoreError> {
            self.inner.get_all().await
        }

        async fn wipe_all(&self) -> Result<(), StoreError> {
            self.inner.wipe_all().await
        }
    }

    struct StaticSource(SourceDocument);

    #[async_trait]
    impl SourceFetcher for StaticSource {
        async fn fetch(&self) -> Result<SourceDocument, MirrorError> {
            Ok(self.0.clone())
        }
    }

    fn id(raw: &str) -> GeneId {
        GeneId::parse(raw).expect("gene id")
    }

    #[tokio::test]
    async fn replace_on_refresh_drops_stale_keys() {
        let store = Arc::new(MemoryPrimaryStore::default());
        store
            .upsert_fields(&id("stale"), &[("symbol", "OLD")].into_iter().collect())
            .await
            .expect("seed");
        let source = StaticSource(SourceDocument::new(vec![json!({"hgnc_id": "1"})]));
        let mirror = MirrorService::new(
            Arc::new(source),
            store.clone(),
            MirrorOptions {
                replace_on_refresh: true,
                ..MirrorOptions::default()
            },
        );
        mirror.refresh().await.expect("refresh");
        assert_eq!(store.list_keys().await.expect("keys"), vec![id("1")]);
    }

    #[tokio::test]
    async fn identifier_field_is_configurable() {
        let store = Arc::new(MemoryPrimaryStore::default());
        let source = StaticSource(SourceDocument::new(vec![
            json!({"ensembl_gene_id": "ENSG00000121410", "symbol": "A1BG"}),
            json!({"symbol": "NOID"}),
        ]));
        let mirror = MirrorService::new(
            Arc::new(source),
            store.clone(),
            MirrorOptions {
                identifier_field: "ensembl_gene_id".to_string(),
                ..MirrorOptions::default()
            },
        );
        let report = mirror.refresh().await.expect("refresh");
        assert_eq!(report.processed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(
            store.list_keys().await.expect("keys"),
            vec![id("ENSG00000121410")]
        );
    }

    #[tokio::test]
    async fn long_identifiers_are_mirrored() {
        let store = Arc::new(MemoryPrimaryStore::default());
        let long = "X".repeat(200);
        let source = StaticSource(SourceDocument::new(vec![
            json!({"hgnc_id": long, "symbol": "S"}),
        ]));
        let mirror = MirrorService::new(Arc::new(source), store.clone(), MirrorOptions::default());
        let report = mirror.refresh().await.expect("refresh");
        assert_eq!(report.processed, 1);
        assert_eq!(store.list_keys().await.expect("keys"), vec![id(&long)]);
    }

    #[tokio::test]
    async fn serialized_refreshes_do_not_overlap() {
        let log: EventLog = Arc::default();
        let source = YieldingSource {
            doc: SourceDocument::new(vec![json!({"hgnc_id": "1"}), json!({"hgnc_id": "2"})]),
            log: Arc::clone(&log),
        };
        let store = RecordingStore {
            inner: MemoryPrimaryStore::default(),
            log: Arc::clone(&log),
        };
        let mirror = MirrorService::new(
            Arc::new(source),
            Arc::new(store),
            MirrorOptions {
                serialize_refreshes: true,
                ..MirrorOptions::default()
            },
        );

        let (first, second) = tokio::join!(mirror.refresh(), mirror.refresh());
        assert_eq!(first.expect("first").processed, 2);
        assert_eq!(second.expect("second").processed, 2);

        let events = log.lock().expect("event log").clone();
        assert_eq!(
            events,
            vec!["fetch", "upsert 1", "upsert 2", "fetch", "upsert 1", "upsert 2"]
        );
    }

    #[tokio::test]
    async fn unserialized_refreshes_interleave() {
        let log: EventLog = Arc::default();
        let source = YieldingSource {
            doc: SourceDocument::new(vec![json!({"hgnc_id": "1"})]),
            log: Arc::clone(&log),
        };
        let store = RecordingStore {
            inner: MemoryPrimaryStore::default(),
            log: Arc::clone(&log),
        };
        let mirror =
            MirrorService::new(Arc::new(source), Arc::new(store), MirrorOptions::default());

        let (first, second) = tokio::join!(mirror.refresh(), mirror.refresh());
        assert!(first.is_ok() && second.is_ok());
        let events = log.lock().expect("event log").clone();
        assert_eq!(events[..2], ["fetch", "fetch"]);
    }
}
