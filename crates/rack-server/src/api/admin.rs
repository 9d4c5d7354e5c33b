//! Admin surface: login gate, sheet/mapping setup, raw view, preview, refresh.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use rack_core::{
    check_columns, duplicate_columns, FieldMapping, RawTable, SemanticField, StoredConfig,
};
use rack_source::{extract_sheet_id, SheetRef};
use serde::{Deserialize, Serialize};

use crate::middleware::{AdminSession, RequestId};

use super::{
    load_table, map_config_error, map_mapping_error, ApiError, ApiResponse, AppState, BookItem,
};

const DEFAULT_RAW_ROWS: usize = 100;
const MAX_RAW_ROWS: usize = 1_000;
const DEFAULT_PREVIEW_ROWS: usize = 10;

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub(super) struct LoginData {
    token: String,
}

#[derive(Debug, Serialize)]
pub(super) struct LogoutData {
    logged_out: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct ConfigView {
    #[serde(flatten)]
    config: StoredConfig,
    sheet_id: Option<String>,
    mandatory_fields: Vec<SemanticField>,
    duplicate_columns: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ConfigSaved {
    #[serde(flatten)]
    view: ConfigView,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ColumnsData {
    columns: Vec<String>,
    row_count: usize,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct RawData {
    #[serde(flatten)]
    table: RawTable,
    total_rows: usize,
}

#[derive(Debug, Deserialize)]
pub(super) struct PreviewRequest {
    /// Candidate mapping; the stored one is used when absent.
    pub mapping: Option<FieldMapping>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct PreviewData {
    rows: Vec<BookItem>,
    total: usize,
    duplicate_columns: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshData {
    refreshed: bool,
}

fn config_view(state: &AppState, config: StoredConfig) -> ConfigView {
    ConfigView {
        sheet_id: extract_sheet_id(&config.sheet_url).map(str::to_owned),
        mandatory_fields: state.config.field_mapper().mandatory_fields(),
        duplicate_columns: duplicate_columns(&config.mapping),
        config,
    }
}

pub(super) async fn login(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginData>>, ApiError> {
    if !state.auth.verify_password(&body.password) {
        tracing::warn!("admin login rejected");
        return Err(ApiError::new(
            req_id.0,
            "unauthorized",
            "invalid admin password",
        ));
    }

    let token = state.auth.issue_session().await;
    tracing::info!("admin logged in");
    Ok(ApiResponse::new(req_id.0, LoginData { token }))
}

pub(super) async fn logout(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<AdminSession>,
) -> Json<ApiResponse<LogoutData>> {
    let logged_out = state.auth.revoke(&session.0).await;
    ApiResponse::new(req_id.0, LogoutData { logged_out })
}

pub(super) async fn get_config(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ConfigView>>, ApiError> {
    let stored = state
        .store
        .load()
        .map_err(|e| map_config_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(req_id.0, config_view(&state, stored)))
}

/// Saves the sheet source and mapping.
///
/// When the sheet is reachable every assigned column must exist in it. An
/// unreachable sheet or an incomplete mapping is saved with a warning so the
/// admin can fill things in over several steps.
pub(super) async fn put_config(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<StoredConfig>,
) -> Result<Json<ApiResponse<ConfigSaved>>, ApiError> {
    let mut warnings = Vec::new();

    if body.has_source() {
        let sheet = SheetRef::from_config(&body)
            .map_err(|e| ApiError::new(req_id.0.clone(), "bad_request", e.to_string()))?;
        state.source.invalidate().await;
        match state.source.fetch(&sheet).await {
            Ok(table) => check_columns(&table, &body.mapping)
                .map_err(|e| map_mapping_error(req_id.0.clone(), &e))?,
            Err(e) => {
                tracing::warn!(error = %e, "saving config without column check");
                warnings.push(format!("could not verify columns: {e}"));
            }
        }
    } else {
        warnings.push("no spreadsheet configured".to_owned());
    }

    let missing: Vec<&str> = state
        .config
        .field_mapper()
        .mandatory_fields()
        .into_iter()
        .filter(|f| body.mapping.column(*f).is_none())
        .map(SemanticField::as_str)
        .collect();
    if !missing.is_empty() {
        warnings.push(format!(
            "mapping not set for mandatory fields: {}",
            missing.join(", ")
        ));
    }

    let dupes = duplicate_columns(&body.mapping);
    if !dupes.is_empty() {
        warnings.push(format!(
            "same sheet column selected multiple times: {}",
            dupes.join(", ")
        ));
    }

    state
        .store
        .save(&body)
        .map_err(|e| map_config_error(req_id.0.clone(), &e))?;
    state.source.invalidate().await;
    tracing::info!(warnings = warnings.len(), "admin config saved");

    Ok(ApiResponse::new(
        req_id.0,
        ConfigSaved {
            view: config_view(&state, body),
            warnings,
        },
    ))
}

pub(super) async fn list_columns(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ColumnsData>>, ApiError> {
    let (_, table) = load_table(&state, &req_id.0).await?;
    Ok(ApiResponse::new(
        req_id.0,
        ColumnsData {
            columns: table.columns().to_vec(),
            row_count: table.len(),
        },
    ))
}

pub(super) async fn raw_table(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RawQuery>,
) -> Result<Json<ApiResponse<RawData>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_RAW_ROWS).min(MAX_RAW_ROWS);
    let (_, table) = load_table(&state, &req_id.0).await?;
    Ok(ApiResponse::new(
        req_id.0,
        RawData {
            table: table.head(limit),
            total_rows: table.len(),
        },
    ))
}

pub(super) async fn preview_mapping(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<PreviewRequest>,
) -> Result<Json<ApiResponse<PreviewData>>, ApiError> {
    let (stored, table) = load_table(&state, &req_id.0).await?;
    let mapping = body.mapping.unwrap_or(stored.mapping);
    let rows = state
        .config
        .field_mapper()
        .apply(&table, &mapping)
        .map_err(|e| map_mapping_error(req_id.0.clone(), &e))?;

    let limit = body.limit.unwrap_or(DEFAULT_PREVIEW_ROWS);
    Ok(ApiResponse::new(
        req_id.0,
        PreviewData {
            rows: rows.iter().take(limit).map(BookItem::from).collect(),
            total: rows.len(),
            duplicate_columns: duplicate_columns(&mapping),
        },
    ))
}

pub(super) async fn refresh(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<RefreshData>> {
    state.source.invalidate().await;
    ApiResponse::new(req_id.0, RefreshData { refreshed: true })
}
