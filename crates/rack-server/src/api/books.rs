//! Public book lookup: substring search, type-ahead, exact identifier.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Extension, Json,
};
use rack_core::{
    filter, filter_by_identifier, parse_flag, suggest, EmptyQuery, Page, Scope, Suggestion,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{load_rows, ApiError, ApiResponse, AppState, BookItem};

const MAX_SUGGESTIONS: usize = 50;

#[derive(Debug, Deserialize)]
pub(super) struct SearchQuery {
    pub q: Option<String>,
    pub scope: Option<String>,
    pub show_all: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct SearchData {
    query: String,
    scope: Scope,
    #[serde(flatten)]
    page: Page<BookItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SuggestQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

fn parse_scope(req_id: &str, raw: Option<&str>) -> Result<Scope, ApiError> {
    raw.map_or(Ok(Scope::Auto), str::parse::<Scope>)
        .map_err(|e| ApiError::new(req_id, "bad_request", e.to_string()))
}

/// `show_all` overrides the configured empty-query behaviour when present.
fn parse_empty_query(
    req_id: &str,
    raw: Option<&str>,
    default: EmptyQuery,
) -> Result<EmptyQuery, ApiError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match parse_flag(raw) {
        Some(true) => Ok(EmptyQuery::ShowAll),
        Some(false) => Ok(EmptyQuery::NoResults),
        None => Err(ApiError::new(
            req_id,
            "bad_request",
            format!("show_all must be a boolean, got '{raw}'"),
        )),
    }
}

/// Malformed query strings get the JSON error envelope, not axum's plain text.
fn query_params<T>(
    req_id: &str,
    query: Result<Query<T>, QueryRejection>,
) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|e| ApiError::new(req_id, "bad_request", e.body_text()))
}

pub(super) async fn search_books(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<SearchData>>, ApiError> {
    let query = query_params(&req_id.0, query)?;
    let scope = parse_scope(&req_id.0, query.scope.as_deref())?;
    let empty_query = parse_empty_query(
        &req_id.0,
        query.show_all.as_deref(),
        state.config.empty_query,
    )?;
    let text = query.q.unwrap_or_default();

    let rows = load_rows(&state, &req_id.0).await?;
    let results = filter(&rows, &text, scope, empty_query);
    let page = state
        .config
        .page_window(query.limit)
        .page(&results)
        .map(BookItem::from);

    tracing::debug!(
        query = %text,
        ?scope,
        total = page.total,
        shown = page.items.len(),
        "book search"
    );

    Ok(ApiResponse::new(
        req_id.0,
        SearchData {
            query: text,
            scope,
            page,
        },
    ))
}

pub(super) async fn suggest_books(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<SuggestQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Suggestion>>>, ApiError> {
    let query = query_params(&req_id.0, query)?;
    let limit = query
        .limit
        .unwrap_or(state.config.suggestion_limit)
        .clamp(1, MAX_SUGGESTIONS);
    let text = query.q.unwrap_or_default();
    if text.trim().is_empty() {
        return Ok(ApiResponse::new(req_id.0, Vec::new()));
    }

    let rows = load_rows(&state, &req_id.0).await?;
    Ok(ApiResponse::new(req_id.0, suggest(&rows, &text, limit)))
}

pub(super) async fn get_book(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(identifier): Path<String>,
) -> Result<Json<ApiResponse<Vec<BookItem>>>, ApiError> {
    let rows = load_rows(&state, &req_id.0).await?;
    let found: Vec<BookItem> = filter_by_identifier(&rows, &identifier)
        .into_iter()
        .map(BookItem::from)
        .collect();

    if found.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("no book with identifier '{identifier}'"),
        ));
    }

    Ok(ApiResponse::new(req_id.0, found))
}
