// SPDX-License-Identifier: Apache-2.0

use crate::artifact::ArtifactError;
use crate::mirror::MirrorError;
use crate::query::QueryError;
use crate::summary::SummaryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use genecache_store::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ApiErrorCode {
    GeneNotFound,
    InvalidGeneId,
    ArtifactNotFound,
    UpstreamFetchFailed,
    StoreUnavailable,
    RenderFailed,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }

    fn with_cause(code: ApiErrorCode, message: &str, cause: &dyn std::fmt::Display) -> Self {
        Self::new(code, message, json!({"cause": cause.to_string()}))
    }

    fn store(err: &StoreError) -> Self {
        Self::with_cause(ApiErrorCode::StoreUnavailable, "store unavailable", err)
    }
}

/// Every not-found code is a 404; everything else is a server failure.
#[must_use]
pub(crate) fn api_error_status(code: ApiErrorCode) -> StatusCode {
    match code {
        ApiErrorCode::GeneNotFound
        | ApiErrorCode::InvalidGeneId
        | ApiErrorCode::ArtifactNotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[must_use]
pub(crate) fn api_error_response(status: StatusCode, err: ApiError) -> Response {
    (status, Json(json!({ "error": err }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = api_error_status(self.code);
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(code = ?self.code, details = %self.details, "{}", self.message);
        } else {
            tracing::error!(code = ?self.code, details = %self.details, "{}", self.message);
        }
        api_error_response(status, self)
    }
}

impl From<MirrorError> for ApiError {
    fn from(value: MirrorError) -> Self {
        match &value {
            MirrorError::Store(err) => Self::store(err),
            MirrorError::PartialApply { report, cause } => Self::new(
                ApiErrorCode::StoreUnavailable,
                "refresh partially applied",
                json!({
                    "cause": cause.to_string(),
                    "records_processed": report.processed,
                    "records_skipped": report.skipped,
                    "records_failed": report.failed,
                }),
            ),
            MirrorError::InvalidSource(_) => {
                Self::with_cause(ApiErrorCode::Internal, "dataset source misconfigured", &value)
            }
            _ => Self::with_cause(
                ApiErrorCode::UpstreamFetchFailed,
                "failed to fetch gene dataset",
                &value,
            ),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::NotFound(id) => Self::new(
                ApiErrorCode::GeneNotFound,
                "gene not found",
                json!({"gene_id": id}),
            ),
            QueryError::InvalidId(id, err) => Self::new(
                ApiErrorCode::InvalidGeneId,
                "gene not found",
                json!({"gene_id": id, "cause": err.to_string()}),
            ),
            QueryError::Store(err) => Self::store(&err),
        }
    }
}

impl From<ArtifactError> for ApiError {
    fn from(value: ArtifactError) -> Self {
        match &value {
            ArtifactError::NotFound => Self::new(
                ApiErrorCode::ArtifactNotFound,
                "image not found",
                json!({}),
            ),
            ArtifactError::Store(err) => Self::store(err),
        }
    }
}

impl From<SummaryError> for ApiError {
    fn from(value: SummaryError) -> Self {
        match value {
            SummaryError::Store(err) => Self::store(&err),
            SummaryError::Artifact(err) => err.into(),
            SummaryError::Render(err) => {
                Self::with_cause(ApiErrorCode::RenderFailed, "summary chart not rendered", &err)
            }
        }
    }
}
