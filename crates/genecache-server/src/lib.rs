#![forbid(unsafe_code)]
//! Gene record mirror service.
//!
//! `POST /data` copies the upstream HGNC dataset into the primary store,
//! `/genes` serves lookups from it, and `/image` keeps one rendered summary
//! chart in a separate artifact store.

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use genecache_store::{
    ArtifactStore, MemoryArtifactStore, MemoryPrimaryStore, PrimaryStore, RedisArtifactStore,
    RedisPolicy, RedisPrimaryStore, StoreError,
};
use std::fmt::{Display, Formatter};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tracing::info;

pub mod artifact;
pub mod chart;
pub mod config;
pub mod http;
pub mod mirror;
pub mod query;
pub mod summary;

pub use artifact::{ArtifactCache, ArtifactError};
pub use chart::{ChartError, ChartRenderer, PieChartRenderer};
pub use config::{validate_startup_config, ConfigError, ServiceConfig, StoreBackend};
pub use http::response_contract::{ApiError, ApiErrorCode};
pub use mirror::{
    HttpSourceFetcher, MirrorError, MirrorOptions, MirrorService, RefreshReport, SourceFetcher,
};
pub use query::{GeneQueryService, QueryError};
pub use summary::{SummaryError, SummaryService};

pub const CRATE_NAME: &str = "genecache-server";

#[derive(Clone)]
pub struct AppState {
    pub mirror: Arc<MirrorService>,
    pub genes: Arc<GeneQueryService>,
    pub summary: Arc<SummaryService>,
    pub max_body_bytes: usize,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    /// Wires the services over already-open store handles.
    #[must_use]
    pub fn with_stores(
        cfg: &ServiceConfig,
        fetcher: Arc<dyn SourceFetcher>,
        primary: Arc<dyn PrimaryStore>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        let mirror = MirrorService::new(
            fetcher,
            Arc::clone(&primary),
            MirrorOptions {
                identifier_field: cfg.identifier_field.clone(),
                replace_on_refresh: cfg.replace_on_refresh,
                serialize_refreshes: cfg.serialize_refreshes,
            },
        );
        let summary = SummaryService::new(
            Arc::clone(&primary),
            Arc::new(ArtifactCache::new(artifacts)),
            Arc::new(PieChartRenderer::default()),
            cfg.group_field.clone(),
            cfg.chart_title.clone(),
        );
        Self {
            mirror: Arc::new(mirror),
            genes: Arc::new(GeneQueryService::new(primary)),
            summary: Arc::new(summary),
            max_body_bytes: cfg.max_body_bytes,
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }

    #[cfg(test)]
    pub(crate) fn in_memory_for_tests() -> Self {
        let cfg = ServiceConfig::default();
        let fetcher = HttpSourceFetcher::new("http://127.0.0.1:9/", cfg.fetch_timeout)
            .unwrap_or_else(|e| panic!("fetcher: {e}"));
        Self::with_stores(
            &cfg,
            Arc::new(fetcher),
            Arc::new(MemoryPrimaryStore::default()),
            Arc::new(MemoryArtifactStore::default()),
        )
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum StartupError {
    Config(ConfigError),
    Store(StoreError),
    Source(MirrorError),
}

impl Display for StartupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "store connection failed: {err}"),
            Self::Source(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<ConfigError> for StartupError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<StoreError> for StartupError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Validates `cfg` and opens both store handles once for the process lifetime.
pub async fn build_state(cfg: &ServiceConfig) -> Result<AppState, StartupError> {
    validate_startup_config(cfg)?;
    let fetcher =
        HttpSourceFetcher::new(&cfg.source_url, cfg.fetch_timeout).map_err(StartupError::Source)?;

    let (primary, artifacts): (Arc<dyn PrimaryStore>, Arc<dyn ArtifactStore>) =
        match cfg.store_backend {
            StoreBackend::Memory => (
                Arc::new(MemoryPrimaryStore::default()),
                Arc::new(MemoryArtifactStore::default()),
            ),
            StoreBackend::Redis => {
                let (Some(primary_url), Some(artifact_url)) =
                    (&cfg.primary_store_url, &cfg.artifact_store_url)
                else {
                    return Err(ConfigError::MissingStoreTarget.into());
                };
                let policy = RedisPolicy {
                    connect_timeout: cfg.redis_connect_timeout,
                    command_timeout: cfg.redis_command_timeout,
                };
                (
                    Arc::new(RedisPrimaryStore::connect(primary_url, policy.clone()).await?),
                    Arc::new(RedisArtifactStore::connect(artifact_url, policy).await?),
                )
            }
        };
    info!(
        backend = primary.backend_tag(),
        source = %cfg.source_url,
        "stores connected"
    );
    Ok(AppState::with_stores(cfg, Arc::new(fetcher), primary, artifacts))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::handlers::healthz_handler))
        .route(
            "/data",
            get(http::handlers::data_get_handler)
                .post(http::handlers::data_post_handler)
                .delete(http::handlers::data_delete_handler),
        )
        .route("/genes", get(http::handlers::genes_handler))
        .route("/genes/:gene_id", get(http::handlers::gene_handler))
        .route(
            "/image",
            get(http::handlers::image_get_handler)
                .post(http::handlers::image_post_handler)
                .delete(http::handlers::image_delete_handler),
        )
        .route("/summary", get(http::handlers::summary_handler))
        .layer(from_fn_with_state(
            state.clone(),
            http::request_tracing::request_tracing_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .with_state(state)
}
