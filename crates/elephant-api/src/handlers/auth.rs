//! Login, user listing and token verification.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use elephant_core::UserDirectory;
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::extract::bearer_token;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginBody {
    user_id: Option<String>,
    password: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let (Some(user_id), Some(password)) = (
        body.user_id.filter(|s| !s.is_empty()),
        body.password.filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Missing userId or password".to_string(),
        ));
    };

    let result = state.store.users.login(&user_id, &password).await?;
    Ok(Json(json!({
        "success": true,
        "token": result.token,
        "user": result.user,
    })))
}

pub async fn users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = state.store.users.users().await?;
    Ok(Json(json!({ "users": users })))
}

pub async fn verify(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return ApiError::Unauthorized("No token provided".to_string()).into_response();
    };

    match state.store.users.verify_token(token).await {
        Some(user) => Json(json!({ "valid": true, "user": user })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "valid": false, "error": "Invalid token" })),
        )
            .into_response(),
    }
}
