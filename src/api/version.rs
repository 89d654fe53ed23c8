use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::error::Result;
use crate::version::{UpdateCheck, VersionService, DEFAULT_CLIENT_VERSION};

#[derive(Debug, Deserialize)]
pub struct CheckUpdateParams {
    pub current_version: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CheckUpdateResponse {
    pub code: String,
    pub message: String,
    pub data: UpdateCheck,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVersionRequest {
    pub new_version: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateVersionResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_version: Option<String>,
}

#[instrument(skip(versions), level = "debug")]
pub async fn check_update(
    Query(params): Query<CheckUpdateParams>,
    State(versions): State<VersionService>,
) -> Result<Json<CheckUpdateResponse>> {
    let current = params
        .current_version
        .unwrap_or_else(|| DEFAULT_CLIENT_VERSION.to_string());
    let data = versions.check(&current)?;
    Ok(Json(CheckUpdateResponse {
        code: "200".to_string(),
        message: "success".to_string(),
        data,
    }))
}

/// Body is parsed by hand so every bad payload gets the same 400 body.
#[instrument(skip(versions, body), level = "debug")]
pub async fn update_version(State(versions): State<VersionService>, body: Bytes) -> Result<Response> {
    let request = match serde_json::from_slice::<UpdateVersionRequest>(&body) {
        Ok(request) if !request.new_version.is_empty() => request,
        _ => {
            warn!("rejected version update");
            let response = UpdateVersionResponse {
                code: "400".to_string(),
                message: "Invalid input".to_string(),
                new_version: None,
            };
            return Ok((StatusCode::BAD_REQUEST, Json(response)).into_response());
        }
    };

    versions.set_newest(&request.new_version)?;
    Ok(Json(UpdateVersionResponse {
        code: "200".to_string(),
        message: "Version updated successfully".to_string(),
        new_version: Some(request.new_version),
    })
    .into_response())
}
