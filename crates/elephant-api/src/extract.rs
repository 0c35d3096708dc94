//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use elephant_core::UserDirectory;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Bearer token from the `Authorization` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The user a request acts as.
///
/// Resolved from a valid bearer token. Without one, requests act as the
/// configured default user unless authentication is required.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(&parts.headers) {
            if let Some(identity) = state.store.users.verify_token(token).await {
                return Ok(Actor {
                    user_id: identity.user_id,
                });
            }
            debug!("Ignoring invalid bearer token");
        }

        if state.config.auth_required {
            return Err(ApiError::Unauthorized(
                "Authentication required".to_string(),
            ));
        }

        Ok(Actor {
            user_id: state.config.default_user.clone(),
        })
    }
}
