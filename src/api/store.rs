use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::instrument;

use crate::error::Result;
use crate::storage::{MaintenanceReport, StorageEngine};

pub type Store = StorageEngine<Value>;

#[derive(Debug, Deserialize, Serialize)]
pub struct KeyValueResponse {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RangeResponse {
    pub keys: Vec<String>,
}

#[instrument(skip(store, value), level = "debug")]
pub async fn put_key(
    Path(key): Path<String>,
    State(store): State<Store>,
    Json(value): Json<Value>,
) -> Result<Json<KeyValueResponse>> {
    store.insert(&key, value.clone())?;
    Ok(Json(KeyValueResponse { key, value }))
}

#[instrument(skip(store), level = "debug")]
pub async fn get_key(Path(key): Path<String>, State(store): State<Store>) -> Result<Response> {
    let response = match store.query(&key)? {
        Some(value) => Json(KeyValueResponse { key, value }).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("key not found: {}", key) })),
        )
            .into_response(),
    };
    Ok(response)
}

#[instrument(skip(store), level = "debug")]
pub async fn delete_key(Path(key): Path<String>, State(store): State<Store>) -> Result<StatusCode> {
    store.delete(&key)?;
    Ok(StatusCode::OK)
}

#[instrument(skip(store), level = "debug")]
pub async fn range(
    Query(params): Query<RangeParams>,
    State(store): State<Store>,
) -> Result<Json<RangeResponse>> {
    let keys = store.range_query(&params.start, &params.end)?;
    Ok(Json(RangeResponse { keys }))
}

#[instrument(skip(store), level = "debug")]
pub async fn index_dump(State(store): State<Store>) -> Result<String> {
    store.index_dump()
}

#[instrument(skip(store), level = "debug")]
pub async fn run_maintenance(State(store): State<Store>) -> Result<Json<MaintenanceReport>> {
    store.run_maintenance().map(Json)
}
