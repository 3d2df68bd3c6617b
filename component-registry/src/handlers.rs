//! Request handlers mapping HTTP onto the registry facade.

use crate::error::{AppError, AppResult};
use crate::registry::{FetchOutcome, FetchRequest};
use crate::state::{AppState, SuccessResponse};
use crate::types::{ComponentName, IndexDocument};
use crate::validation::{self, parse_range, parse_version};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use semver::Version;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Response header carrying the resolved component version.
pub const COMPONENT_VERSION_HEADER: HeaderName = HeaderName::from_static("component-version");

/// Multipart field holding the component archive.
pub const PACKAGE_FIELD: &str = "package";

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

pub async fn get_index(State(state): State<Arc<AppState>>) -> AppResult<Json<IndexDocument>> {
    Ok(Json(state.registry.index().await?))
}

pub async fn rebuild_index(State(state): State<Arc<AppState>>) -> AppResult<Json<IndexDocument>> {
    info!("Rebuilding index from storage");
    Ok(Json(state.registry.rebuild_index().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchQuery {
    pub host_version: String,
    pub component_version: Option<String>,
    pub latest_component_version: Option<String>,
}

impl FetchQuery {
    fn into_request(self, name: ComponentName) -> AppResult<FetchRequest> {
        let host_version = parse_version("hostVersion", &self.host_version)?;
        let requested = parse_range(
            "componentVersion",
            self.component_version.as_deref().unwrap_or("*"),
        )?;
        // A held version that does not parse can never equal a resolved one.
        let known_version = self
            .latest_component_version
            .as_deref()
            .filter(|v| !v.is_empty())
            .and_then(|v| match Version::parse(v) {
                Ok(version) => Some(version),
                Err(e) => {
                    debug!(value = %v, error = %e, "Ignoring unparsable latestComponentVersion");
                    None
                }
            });

        Ok(FetchRequest {
            name,
            host_version,
            requested,
            known_version,
        })
    }
}

/// `GET /api/components/{name}`: 204 when the caller is current, otherwise the code.
pub async fn fetch_component(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<FetchQuery>,
) -> AppResult<Response> {
    let name = ComponentName::new(&name)?;
    let request = query.into_request(name)?;
    debug!(
        component = %request.name,
        host = %request.host_version,
        requested = %request.requested,
        "Fetching component"
    );

    let outcome = state.registry.get(&request).await?;
    let version = HeaderValue::from_str(&outcome.version().to_string())
        .map_err(|e| AppError::InternalError(format!("unencodable version header: {e}")))?;

    let response = match outcome {
        FetchOutcome::NoUpdate { .. } => {
            (StatusCode::NO_CONTENT, [(COMPONENT_VERSION_HEADER, version)]).into_response()
        }
        FetchOutcome::Updated { code, .. } => (
            StatusCode::OK,
            [
                (COMPONENT_VERSION_HEADER, version),
                (
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/javascript"),
                ),
            ],
            code,
        )
            .into_response(),
    };
    Ok(response)
}

/// `POST /api/components/{name}/{hostVersion}/{componentVersion}` with a multipart archive.
pub async fn publish_component(
    State(state): State<Arc<AppState>>,
    Path((name, host_version, component_version)): Path<(String, String, String)>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<SuccessResponse>)> {
    let name = ComponentName::new(&name)?;
    let host_version = parse_version("hostVersion", &host_version)?;
    let declared_version = parse_version("componentVersion", &component_version)?;
    let max_upload = state.config.max_upload_size_bytes();
    info!(component = %name, version = %declared_version, host = %host_version, "Processing component upload");

    let mut field_count = 0;
    let mut total_size = 0u64;
    let mut archive: Option<Bytes> = None;

    while let Some(field) = multipart.next_field().await? {
        field_count += 1;
        let field_name = field.name().unwrap_or("").to_string();

        if field_count > validation::MAX_MULTIPART_FIELDS {
            warn!(field_count = %field_count, "Too many multipart fields");
            return Err(AppError::UploadError(format!(
                "Too many multipart fields: {} (max: {})",
                field_count,
                validation::MAX_MULTIPART_FIELDS
            )));
        }

        let data = field.bytes().await?;
        total_size += data.len() as u64;
        validation::validate_multipart_limits(field_count, total_size, Some(max_upload)).map_err(
            |e| {
                warn!(total_size = %total_size, field_count = %field_count, "Multipart limits exceeded");
                AppError::UploadError(format!("Multipart upload limits exceeded: {e}"))
            },
        )?;

        if field_name == PACKAGE_FIELD {
            debug!(size = data.len(), "Read component archive");
            archive = Some(data);
        } else {
            debug!(field_name = %field_name, size = data.len(), "Ignoring multipart field");
        }
    }

    let archive = archive.ok_or_else(|| {
        AppError::BadRequest(format!("Missing '{PACKAGE_FIELD}' field in upload"))
    })?;

    let ack = state
        .registry
        .save(&name, Some(&declared_version), archive)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse {
            message: format!("Published {}@{} ({} files)", ack.name, ack.version, ack.files),
        }),
    ))
}
