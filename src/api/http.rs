//! HTTP API Server
//!
//! REST API over the drive. The caller's user id comes from a header set by
//! the authenticating proxy in front of this service.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Json, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::drive::{Drive, ListingEntry, UserId};
use crate::error::{Error, Result};
use crate::path;

/// Shared application state
pub struct AppState {
    /// Drive service
    pub drive: Drive,
    /// Header carrying the authenticated user id
    pub user_header: HeaderName,
}

/// HTTP API server
pub struct HttpServer {
    config: ApiConfig,
    state: Arc<AppState>,
    max_upload: usize,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: ApiConfig, drive: Drive, max_upload: usize) -> Result<Self> {
        let user_header = HeaderName::from_bytes(config.user_header.as_bytes())
            .map_err(|e| Error::Config(format!("api.user_header is not a valid header: {}", e)))?;

        let state = Arc::new(AppState { drive, user_header });
        Ok(Self {
            config,
            state,
            max_upload,
        })
    }

    /// Get the state for sharing with other components
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Build the router with all layers applied
    pub fn router(&self) -> Router {
        let router = Self::create_router(Arc::clone(&self.state), self.max_upload)
            .layer(TraceLayer::new_for_http());

        if self.config.cors_enabled {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Create the router
    fn create_router(state: Arc<AppState>, max_upload: usize) -> Router {
        Router::new()
            // Directories
            .route("/api/directory", get(handle_list_directory).post(handle_create_directory))
            // Resources
            .route(
                "/api/resource",
                get(handle_resource_info)
                    .post(handle_upload)
                    .delete(handle_delete)
                    .layer(DefaultBodyLimit::max(max_upload)),
            )
            .route("/api/resource/download", get(handle_download))
            .route("/api/resource/move", get(handle_move))
            .route("/api/resource/search", get(handle_search))
            // Accounts
            .route("/api/user/root", post(handle_provision))
            // Status
            .route("/health", get(handle_health))
            .with_state(state)
    }

    /// Start the HTTP server
    pub async fn start(&self) -> Result<()> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Start the HTTP server and stop accepting connections once `signal` resolves
    pub async fn start_with_shutdown(
        &self,
        signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        if !self.config.enabled {
            tracing::info!("HTTP API disabled");
            return Ok(());
        }

        let app = self.router();

        let listener = tokio::net::TcpListener::bind(&self.config.bind_address).await?;
        tracing::info!("HTTP API listening on {}", self.config.bind_address);

        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await?;

        Ok(())
    }
}

// ============ Request/Response Types ============

/// Query carrying a single path
#[derive(Debug, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: String,
}

/// Upload target directory and file name
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub name: String,
}

/// Move source and destination
#[derive(Debug, Deserialize)]
pub struct MoveQuery {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

/// Search query
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl Error {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidPath(_) | Error::InvalidQuery(_) | Error::InvalidFile(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::AlreadyExists(_) => StatusCode::CONFLICT,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let err = self.into_public();
        let status = err.status_code();
        (status, Json(ErrorResponse { message: err.to_string() })).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, Error>;

/// Resolve the caller from the trusted user header
fn user_id(state: &AppState, headers: &HeaderMap) -> ApiResult<UserId> {
    headers
        .get(&state.user_header)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<UserId>().ok())
        .ok_or_else(|| Error::Unauthorized("Unauthorized.".to_string()))
}

fn attachment(file_name: &str) -> HeaderValue {
    let quoted = file_name.replace('"', "");
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", quoted))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

// ============ Handlers ============

async fn handle_list_directory(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<Vec<ListingEntry>>> {
    let user = user_id(&state, &headers)?;
    let entries = state.drive.list_directory(user, &query.path).await?;
    Ok(Json(entries))
}

async fn handle_create_directory(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<ListingEntry>> {
    let user = user_id(&state, &headers)?;
    let entry = state.drive.create_directory(user, &query.path).await?;
    Ok(Json(entry))
}

async fn handle_resource_info(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<ListingEntry>> {
    let user = user_id(&state, &headers)?;
    let entry = state.drive.get_resource_info(user, &query.path).await?;
    Ok(Json(entry))
}

async fn handle_upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ListingEntry>)> {
    let user = user_id(&state, &headers)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let entry = state
        .drive
        .upload_resource(user, &query.path, &query.name, content_type, body)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn handle_delete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PathQuery>,
) -> ApiResult<StatusCode> {
    let user = user_id(&state, &headers)?;
    state.drive.delete_resource(user, &query.path).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_download(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PathQuery>,
) -> ApiResult<Response> {
    let user = user_id(&state, &headers)?;

    if path::is_directory(&query.path) {
        let archive = state.drive.download_directory_as_zip(user, &query.path).await?;
        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
                (header::CONTENT_DISPOSITION, attachment("download.zip")),
            ],
            Body::from(archive),
        )
            .into_response());
    }

    let (stat, data) = state.drive.download_file(user, &query.path).await?;
    let content_type = HeaderValue::from_str(&stat.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, attachment(path::name_of(&stat.key))),
        ],
        Body::from(data),
    )
        .into_response())
}

async fn handle_move(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<MoveQuery>,
) -> ApiResult<Json<ListingEntry>> {
    let user = user_id(&state, &headers)?;
    let entry = state.drive.move_or_rename(user, &query.from, &query.to).await?;
    Ok(Json(entry))
}

async fn handle_search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<ListingEntry>>> {
    let user = user_id(&state, &headers)?;
    let entries = state.drive.search(user, &query.query).await?;
    Ok(Json(entries))
}

async fn handle_provision(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<ListingEntry>> {
    let user = user_id(&state, &headers)?;
    let entry = state.drive.provision_user(user).await?;
    Ok(Json(entry))
}

async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
