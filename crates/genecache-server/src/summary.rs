// SPDX-License-Identifier: Apache-2.0

use crate::artifact::{ArtifactCache, ArtifactError};
use crate::chart::{ChartError, ChartRenderer};
use genecache_model::{summarize_records, FrequencyTable};
use genecache_store::{PrimaryStore, StoreError};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SummaryError {
    Store(StoreError),
    Render(ChartError),
    Artifact(ArtifactError),
}

impl Display for SummaryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "summary scan failed: {err}"),
            Self::Render(err) => write!(f, "{err}"),
            Self::Artifact(err) => write!(f, "summary artifact not stored: {err}"),
        }
    }
}

impl std::error::Error for SummaryError {}

impl From<StoreError> for SummaryError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<ArtifactError> for SummaryError {
    fn from(value: ArtifactError) -> Self {
        Self::Artifact(value)
    }
}

/// Buckets the primary store by a categorical field and keeps the rendered
/// chart in the artifact cache.
pub struct SummaryService {
    primary: Arc<dyn PrimaryStore>,
    artifacts: Arc<ArtifactCache>,
    renderer: Arc<dyn ChartRenderer>,
    group_field: String,
    title: String,
}

impl SummaryService {
    #[must_use]
    pub fn new(
        primary: Arc<dyn PrimaryStore>,
        artifacts: Arc<ArtifactCache>,
        renderer: Arc<dyn ChartRenderer>,
        group_field: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            primary,
            artifacts,
            renderer,
            group_field: group_field.into(),
            title: title.into(),
        }
    }

    #[must_use]
    pub fn group_field(&self) -> &str {
        &self.group_field
    }

    /// Full scan of the primary store; `field` overrides the configured group.
    pub async fn summarize(&self, field: Option<&str>) -> Result<FrequencyTable, SummaryError> {
        let field = field.unwrap_or(&self.group_field);
        let records = self.primary.get_all().await?;
        Ok(summarize_records(&records, field))
    }

    #[instrument(skip(self))]
    pub async fn render_and_cache(
        &self,
        field: Option<&str>,
    ) -> Result<FrequencyTable, SummaryError> {
        let table = self.summarize(field).await?;
        let renderer = Arc::clone(&self.renderer);
        let title = self.title.clone();
        let for_render = table.clone();
        let bytes = tokio::task::spawn_blocking(move || renderer.render(&title, &for_render))
            .await
            .map_err(|e| SummaryError::Render(ChartError(e.to_string())))?
            .map_err(SummaryError::Render)?;
        let size = bytes.len();
        self.artifacts.put(bytes).await?;
        info!(
            buckets = table.len(),
            records = table.total(),
            bytes = size,
            "summary chart cached"
        );
        Ok(table)
    }

    pub async fn artifact(&self) -> Result<Vec<u8>, ArtifactError> {
        self.artifacts.get().await
    }

    pub async fn clear(&self) -> Result<(), ArtifactError> {
        self.artifacts.wipe().await?;
        info!("summary artifact cleared");
        Ok(())
    }
}
