// SPDX-License-Identifier: Apache-2.0

use super::response_contract::ApiError;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use genecache_model::{FlattenedRecord, GeneId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GroupFieldParams {
    pub field: Option<String>,
}

impl GroupFieldParams {
    fn field(&self) -> Option<&str> {
        self.field.as_deref().map(str::trim).filter(|f| !f.is_empty())
    }
}

#[derive(Debug, Serialize)]
struct RefreshBody {
    message: &'static str,
    records_processed: usize,
    records_skipped: usize,
}

fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

pub(crate) async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

pub(crate) async fn data_get_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<FlattenedRecord>>, ApiError> {
    Ok(Json(state.genes.all_records().await?))
}

pub(crate) async fn data_post_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.mirror.refresh().await?;
    Ok(Json(RefreshBody {
        message: "data successfully posted",
        records_processed: report.processed,
        records_skipped: report.skipped,
    }))
}

pub(crate) async fn data_delete_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    state.mirror.clear().await?;
    Ok(message("data successfully deleted"))
}

pub(crate) async fn genes_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<GeneId>>, ApiError> {
    Ok(Json(state.genes.list_ids().await?))
}

pub(crate) async fn gene_handler(
    State(state): State<AppState>,
    Path(gene_id): Path<String>,
) -> Result<Json<FlattenedRecord>, ApiError> {
    Ok(Json(state.genes.record(&gene_id).await?))
}

pub(crate) async fn image_get_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let bytes = state.summary.artifact().await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}

pub(crate) async fn image_post_handler(
    State(state): State<AppState>,
    Query(params): Query<GroupFieldParams>,
) -> Result<Json<Value>, ApiError> {
    let table = state.summary.render_and_cache(params.field()).await?;
    Ok(Json(json!({
        "message": "image successfully posted",
        "field": params.field().unwrap_or(state.summary.group_field()),
        "buckets": table.len(),
        "records": table.total(),
    })))
}

pub(crate) async fn image_delete_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    state.summary.clear().await?;
    Ok(message("image successfully deleted"))
}

pub(crate) async fn summary_handler(
    State(state): State<AppState>,
    Query(params): Query<GroupFieldParams>,
) -> Result<Json<Value>, ApiError> {
    let table = state.summary.summarize(params.field()).await?;
    Ok(Json(json!({
        "field": params.field().unwrap_or(state.summary.group_field()),
        "total": table.total(),
        "buckets": table.buckets(),
    })))
}
