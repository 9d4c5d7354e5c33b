mod admin;
mod books;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use rack_core::{
    AppConfig, ConfigError, ConfigStore, MappedRow, MappingError, RawTable, StoredConfig,
};
use rack_source::{CachedSheetSource, FetchError, SheetRef};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_admin, AdminAuth, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ConfigStore>,
    pub source: Arc<CachedSheetSource>,
    pub auth: AdminAuth,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    source_configured: bool,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" => StatusCode::BAD_REQUEST,
            "source_not_configured" => StatusCode::CONFLICT,
            "mapping_incomplete" | "column_not_found" => StatusCode::UNPROCESSABLE_ENTITY,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "fetch_failed" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_fetch_error(request_id: String, error: &FetchError) -> ApiError {
    match error {
        FetchError::NotConfigured => ApiError::new(
            request_id,
            "source_not_configured",
            "no spreadsheet configured; an admin must set the sheet URL",
        ),
        FetchError::InvalidSheetUrl { .. } => {
            ApiError::new(request_id, "source_not_configured", error.to_string())
        }
        _ => {
            tracing::warn!(error = %error, "sheet fetch failed");
            ApiError::new(
                request_id,
                "fetch_failed",
                format!("could not load sheet: {error}"),
            )
        }
    }
}

pub(super) fn map_mapping_error(request_id: String, error: &MappingError) -> ApiError {
    let code = match error {
        MappingError::MappingIncomplete { .. } => "mapping_incomplete",
        MappingError::ColumnNotFound { .. } => "column_not_found",
    };
    ApiError::new(request_id, code, error.to_string())
}

pub(super) fn map_config_error(request_id: String, error: &ConfigError) -> ApiError {
    tracing::error!(error = %error, "config store failed");
    ApiError::new(request_id, "internal_error", "config store unavailable")
}

/// Loads the stored config and the current raw table for it.
pub(super) async fn load_table(
    state: &AppState,
    request_id: &str,
) -> Result<(StoredConfig, Arc<RawTable>), ApiError> {
    let stored = state
        .store
        .load()
        .map_err(|e| map_config_error(request_id.to_owned(), &e))?;
    let sheet =
        SheetRef::from_config(&stored).map_err(|e| map_fetch_error(request_id.to_owned(), &e))?;
    let table = state
        .source
        .fetch(&sheet)
        .await
        .map_err(|e| map_fetch_error(request_id.to_owned(), &e))?;
    Ok((stored, table))
}

/// Loads the current table and maps it with the stored mapping.
pub(super) async fn load_rows(
    state: &AppState,
    request_id: &str,
) -> Result<Vec<MappedRow>, ApiError> {
    let (stored, table) = load_table(state, request_id).await?;
    state
        .config
        .field_mapper()
        .apply(&table, &stored.mapping)
        .map_err(|e| {
            tracing::warn!(error = %e, "stored mapping does not fit the sheet");
            map_mapping_error(request_id.to_owned(), &e)
        })
}

/// Public representation of a book row.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(super) struct BookItem {
    identifier: String,
    display_name: String,
    price: String,
    location: String,
    image_ref: String,
}

impl From<&MappedRow> for BookItem {
    fn from(row: &MappedRow) -> Self {
        Self {
            identifier: row.identifier().to_owned(),
            display_name: row.display_name().to_owned(),
            price: row.price().to_owned(),
            location: row.location().to_owned(),
            image_ref: row.image_ref().to_owned(),
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn admin_router(auth: AdminAuth, limits: RateLimits) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/v1/admin/logout", post(admin::logout))
        .route(
            "/api/v1/admin/config",
            get(admin::get_config).put(admin::put_config),
        )
        .route("/api/v1/admin/columns", get(admin::list_columns))
        .route("/api/v1/admin/raw", get(admin::raw_table))
        .route("/api/v1/admin/preview", post(admin::preview_mapping))
        .route("/api/v1/admin/refresh", post(admin::refresh))
        .layer(axum::middleware::from_fn_with_state(auth, require_admin))
        .layer(axum::middleware::from_fn_with_state(
            limits.admin,
            enforce_rate_limit,
        ));

    let login = Router::new()
        .route("/api/v1/admin/login", post(admin::login))
        .layer(axum::middleware::from_fn_with_state(
            limits.login,
            enforce_rate_limit,
        ));

    login.merge(protected)
}

pub fn build_app(state: AppState, limits: RateLimits) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/books/search", get(books::search_books))
        .route("/api/v1/books/suggest", get(books::suggest_books))
        .route("/api/v1/books/{identifier}", get(books::get_book));

    Router::new()
        .merge(public_routes)
        .merge(admin_router(state.auth.clone(), limits))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match state.store.load() {
        Ok(stored) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    source_configured: stored.has_source(),
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: config store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        source_configured: false,
                    },
                    meta,
                }),
            )
        }
    }
}

/// Separate windows for password attempts and for authenticated admin calls,
/// so failed logins never throttle an admin who already holds a token.
#[derive(Debug, Clone)]
pub struct RateLimits {
    pub login: RateLimitState,
    pub admin: RateLimitState,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            login: RateLimitState::new(10, Duration::from_secs(60)),
            admin: RateLimitState::new(30, Duration::from_secs(60)),
        }
    }
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
