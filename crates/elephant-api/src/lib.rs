//! # elephant-api
//!
//! REST surface over the elephant store: media upload and catalog,
//! relationships and their graph, local login.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

pub use config::ApiConfig;
pub use error::ApiError;
pub use state::AppState;

use handlers::{auth, media, relationships, system};

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let config = state.config.clone();
    let media_dir = state.store.media.media_dir();

    let upload_routes = Router::new()
        .route("/api/media/upload", post(media::upload))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_body()));

    Router::new()
        .route("/health", get(system::health))
        .route("/api/status", get(system::status))
        // Auth
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/users", get(auth::users))
        .route("/api/auth/verify", get(auth::verify))
        // Media
        .route("/api/media", get(media::list))
        .route("/api/media/timeline", get(media::timeline))
        .route("/api/media/:id", get(media::get).patch(media::patch))
        .merge(upload_routes)
        // Relationships
        .route(
            "/api/relationships",
            get(relationships::list).post(relationships::create),
        )
        .route("/api/relationships/graph", get(relationships::graph))
        .route(
            "/api/relationships/:itemA/:itemB",
            get(relationships::get)
                .put(relationships::update)
                .delete(relationships::delete),
        )
        // Payloads
        .nest_service("/media", ServeDir::new(media_dir))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer(&config.allowed_origins))
        .with_state(state)
}
