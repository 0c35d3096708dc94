//! Relationship CRUD, filtering and the graph view.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use elephant_core::{
    ItemId, MediaRepository, NewRelationship, RelationshipFilter, RelationshipPatch,
    RelationshipRepository,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::ApiError;
use crate::extract::Actor;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRelationshipBody {
    item_a: Option<Value>,
    item_b: Option<Value>,
    relationship_type: Option<String>,
    description: Option<String>,
    /// Anything but a JSON number falls back to the default strength
    strength: Option<Value>,
    tags: Option<Vec<String>>,
}

/// Integral JSON numbers, including ones written as `2.0`, are item ids.
fn as_item_id(value: &Value) -> Option<ItemId> {
    if let Some(id) = value.as_u64() {
        return Some(id);
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
        .map(|f| f as ItemId)
}

/// Absent, null and zero ids all count as missing.
fn present(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null() && v.as_f64() != Some(0.0))
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    body: Result<Json<CreateRelationshipBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;

    let (Some(raw_a), Some(raw_b), Some(relationship_type)) = (
        present(body.item_a),
        present(body.item_b),
        body.relationship_type.filter(|t| !t.trim().is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Missing required fields: itemA, itemB, relationshipType".to_string(),
        ));
    };

    let (Some(item_a), Some(item_b)) = (as_item_id(&raw_a), as_item_id(&raw_b)) else {
        return Err(ApiError::BadRequest(
            "itemA and itemB must be integers".to_string(),
        ));
    };

    if item_a == item_b {
        return Err(ApiError::BadRequest(
            "Cannot create relationship between the same item".to_string(),
        ));
    }

    let media = &state.store.media;
    if media.get(item_a).await?.is_none() || media.get(item_b).await?.is_none() {
        return Err(ApiError::NotFound(
            "One or both media items do not exist".to_string(),
        ));
    }

    let relationship = state
        .store
        .relationships
        .create(NewRelationship {
            item_a,
            item_b,
            relationship_type,
            description: body.description,
            strength: body.strength.as_ref().and_then(Value::as_f64),
            created_by: actor.user_id,
            tags: body.tags.unwrap_or_default(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "relationship": relationship })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    item_id: Option<String>,
    created_by: Option<String>,
    relationship_type: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    // Unparsable item ids are ignored rather than rejected
    let filter = RelationshipFilter {
        item_id: params.item_id.and_then(|v| v.trim().parse().ok()),
        created_by: params.created_by.filter(|s| !s.is_empty()),
        relationship_type: params.relationship_type.filter(|s| !s.is_empty()),
    };
    let relationships = state.store.relationships.list(filter).await?;
    Ok(Json(json!({
        "success": true,
        "count": relationships.len(),
        "relationships": relationships,
    })))
}

pub async fn graph(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let graph = state.store.relationships.projection().await?;
    Ok(Json(json!({ "success": true, "graph": graph })))
}

fn parse_pair(raw: &(String, String)) -> Result<(ItemId, ItemId), ApiError> {
    match (raw.0.parse(), raw.1.parse()) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        _ => Err(ApiError::BadRequest("Invalid item IDs".to_string())),
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound("Relationship not found".to_string())
}

pub async fn get(
    State(state): State<AppState>,
    Path(raw): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let (a, b) = parse_pair(&raw)?;
    if a == b {
        return Err(not_found());
    }
    let relationship = state
        .store
        .relationships
        .get(a, b)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(json!({ "success": true, "relationship": relationship })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRelationshipBody {
    relationship_type: Option<String>,
    description: Option<String>,
    strength: Option<Value>,
    tags: Option<Vec<String>>,
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(raw): Path<(String, String)>,
    body: Result<Json<UpdateRelationshipBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let (a, b) = parse_pair(&raw)?;
    let Json(body) = body?;
    if a == b {
        return Err(not_found());
    }

    let patch = RelationshipPatch {
        relationship_type: body.relationship_type,
        description: body.description,
        strength: body.strength.as_ref().and_then(Value::as_f64),
        tags: body.tags,
    };
    let relationship = state
        .store
        .relationships
        .update(a, b, patch)
        .await?
        .ok_or_else(not_found)?;
    debug!(item_a = a, item_b = b, user_id = %actor.user_id, "Updated relationship");
    Ok(Json(json!({ "success": true, "relationship": relationship })))
}

pub async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    Path(raw): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let (a, b) = parse_pair(&raw)?;
    if a == b || !state.store.relationships.delete(a, b).await? {
        return Err(not_found());
    }
    debug!(item_a = a, item_b = b, user_id = %actor.user_id, "Deleted relationship");
    Ok(Json(json!({
        "success": true,
        "message": "Relationship deleted successfully",
    })))
}
