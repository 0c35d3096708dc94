//! Media upload, listing, timeline and metadata patch.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path as UrlPath, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use elephant_core::defaults::{TIMELINE_LIMIT, TIMELINE_PAGE};
use elephant_core::{
    split_tags, ItemId, MediaMetadata, MediaPatch, MediaRepository, MediaUpload, TimelineQuery,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::Actor;
use crate::state::AppState;

const FILES_FIELD: &str = "files";
const STORE_FAILED: &str = "Failed to store file";

/// A file received in a multipart upload, written to the staging directory.
struct StagedFile {
    original_name: String,
    mime_type: String,
    size: u64,
    path: PathBuf,
}

#[derive(Debug, Serialize)]
struct UploadFailure {
    filename: String,
    error: String,
}

pub async fn upload(
    State(state): State<AppState>,
    actor: Actor,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let temp_dir = state.store.media.temp_dir();
    fs::create_dir_all(&temp_dir).await.map_err(|e| {
        ApiError::Internal(elephant_core::Error::storage("create_dir_all", &temp_dir, e))
    })?;

    let mut staged: Vec<StagedFile> = Vec::new();
    let mut fields: HashMap<String, String> = HashMap::new();

    let received =
        receive_parts(&state, &temp_dir, &mut multipart, &mut staged, &mut fields).await;
    if let Err(e) = received {
        discard(&staged).await;
        return Err(e);
    }

    if staged.is_empty() {
        return Err(ApiError::BadRequest("No files provided".to_string()));
    }

    let mut uploaded = Vec::with_capacity(staged.len());
    let mut errors = Vec::new();

    for file in staged {
        let metadata = metadata_for(&fields, &file.original_name);
        let upload = MediaUpload {
            original_name: file.original_name.clone(),
            mime_type: file.mime_type.clone(),
            file_size: file.size,
            uploaded_by: actor.user_id.clone(),
        };

        match state
            .store
            .media
            .ingest(&file.path, upload, metadata)
            .await
        {
            Ok(item) => uploaded.push(item),
            Err(e) => {
                // Logged in full, reported generically
                warn!(filename = %file.original_name, error = %e, "Failed to store upload");
                let _ = fs::remove_file(&file.path).await;
                errors.push(UploadFailure {
                    filename: file.original_name,
                    error: STORE_FAILED.to_string(),
                });
            }
        }
    }

    info!(
        user_id = %actor.user_id,
        uploaded = uploaded.len(),
        failed = errors.len(),
        "Processed upload"
    );

    let mut body = json!({
        "success": true,
        "count": uploaded.len(),
        "uploaded": uploaded,
    });
    if !errors.is_empty() {
        body["errors"] = json!(errors);
    }
    Ok(Json(body))
}

/// Drain the multipart stream, staging files and collecting text fields.
async fn receive_parts(
    state: &AppState,
    temp_dir: &Path,
    multipart: &mut Multipart,
    staged: &mut Vec<StagedFile>,
    fields: &mut HashMap<String, String>,
) -> Result<(), ApiError> {
    let max_files = state.config.max_files_per_upload;
    let max_size = state.config.max_file_size as u64;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name != FILES_FIELD {
            let value = field.text().await?;
            fields.insert(name, value);
            continue;
        }

        if staged.len() >= max_files {
            return Err(ApiError::PayloadTooLarge(format!(
                "Too many files, at most {} per upload",
                max_files
            )));
        }

        let original_name = field
            .file_name()
            .filter(|n| !n.is_empty())
            .unwrap_or("upload")
            .to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let path = temp_dir.join(Uuid::now_v7().to_string());

        let mut out = fs::File::create(&path).await.map_err(|e| {
            ApiError::Internal(elephant_core::Error::storage("create", &path, e))
        })?;
        // Registered before writing so a failure below cleans it up
        staged.push(StagedFile {
            original_name,
            mime_type,
            size: 0,
            path: path.clone(),
        });

        let mut size: u64 = 0;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
            if size > max_size {
                return Err(ApiError::PayloadTooLarge(format!(
                    "File exceeds the maximum size of {} bytes",
                    max_size
                )));
            }
            out.write_all(&chunk).await.map_err(|e| {
                ApiError::Internal(elephant_core::Error::storage("write", &path, e))
            })?;
        }
        out.flush().await.map_err(|e| {
            ApiError::Internal(elephant_core::Error::storage("flush", &path, e))
        })?;

        if let Some(last) = staged.last_mut() {
            last.size = size;
            debug!(filename = %last.original_name, size, "Staged upload");
        }
    }
    Ok(())
}

fn metadata_for(fields: &HashMap<String, String>, original_name: &str) -> MediaMetadata {
    let text = |prefix: &str| {
        fields
            .get(&format!("{}_{}", prefix, original_name))
            .filter(|v| !v.is_empty())
            .cloned()
    };
    MediaMetadata {
        title: text("title"),
        description: text("description"),
        upload_thoughts: text("uploadThoughts"),
        tags: text("tags").map(|raw| split_tags(&raw)).unwrap_or_default(),
    }
}

async fn discard(staged: &[StagedFile]) {
    for file in staged {
        let _ = fs::remove_file(&file.path).await;
    }
}

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let items = state.store.media.list_all().await?;
    Ok(Json(json!({
        "success": true,
        "count": items.len(),
        "items": items,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineParams {
    page: Option<String>,
    limit: Option<String>,
    mime_type: Option<String>,
    uploaded_by: Option<String>,
}

fn positive_or(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

pub async fn timeline(
    State(state): State<AppState>,
    Query(params): Query<TimelineParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = TimelineQuery {
        page: positive_or(params.page.as_deref(), TIMELINE_PAGE),
        limit: positive_or(params.limit.as_deref(), TIMELINE_LIMIT),
        mime_type: params.mime_type.filter(|s| !s.is_empty()),
        uploaded_by: params.uploaded_by.filter(|s| !s.is_empty()),
    };
    let page = state.store.media.timeline(query).await?;
    Ok(Json(json!({
        "success": true,
        "items": page.items,
        "groupedByDate": page.grouped_by_date,
        "pagination": page.pagination,
    })))
}

fn parse_item_id(raw: &str) -> Result<ItemId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Invalid media ID".to_string()))
}

pub async fn get(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_item_id(&id)?;
    let item = state
        .store
        .media
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Media item not found".to_string()))?;
    Ok(Json(json!({ "success": true, "item": item })))
}

/// Tags may be sent as an array or a comma separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl TagsInput {
    fn into_tags(self) -> Vec<String> {
        match self {
            TagsInput::List(tags) => tags,
            TagsInput::Csv(raw) => split_tags(&raw),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchMediaBody {
    title: Option<String>,
    description: Option<String>,
    upload_thoughts: Option<String>,
    tags: Option<TagsInput>,
}

pub async fn patch(
    State(state): State<AppState>,
    actor: Actor,
    UrlPath(id): UrlPath<String>,
    body: Result<Json<PatchMediaBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_item_id(&id)?;
    let Json(body) = body?;

    let patch = MediaPatch {
        title: body.title,
        description: body.description,
        upload_thoughts: body.upload_thoughts,
        tags: body.tags.map(TagsInput::into_tags),
    };
    let item = state
        .store
        .media
        .update(id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Media item not found".to_string()))?;
    debug!(item_id = id, user_id = %actor.user_id, "Patched media item");
    Ok(Json(json!({ "success": true, "item": item })))
}
