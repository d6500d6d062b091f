use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Json},
};
use chrono::NaiveDate;
use serde_json::json;

use crate::storage::{parse_document_ids, parse_suspicious, OrderBy, ReimbursementFilter};

use super::models::{
    ListParams, PageEnvelope, ReceiptParams, ReceiptResponse, ReimbursementPayload,
};
use super::AppState;

/// JSON error reply, paired with the HTTP status
type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

/// Simple health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "service": "quotawatch",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `GET /reimbursements/` - filtered, paginated listing, newest first.
pub async fn list_reimbursements(
    State(state): State<AppState>,
    uri: Uri,
    Query(params): Query<ListParams>,
) -> Result<Json<PageEnvelope>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params
        .page_size
        .unwrap_or(state.config.default_page_size)
        .clamp(1, state.config.max_page_size);

    let filter = build_filter(&params, page, page_size)?;

    let result = state.store.query(&filter).map_err(|e| {
        log::error!("list query failed: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to query reimbursements")
    })?;

    log::debug!(
        "list query matched {} records (page {}, page_size {})",
        result.total,
        page,
        page_size
    );

    Ok(Json(PageEnvelope {
        count: result.total,
        next: next_link(&uri, page, page_size, result.total),
        previous: previous_link(&uri, page),
        results: result.records.into_iter().map(Into::into).collect(),
    }))
}

/// `GET /reimbursements/{document_id}/` - single record by document id.
pub async fn get_reimbursement(
    State(state): State<AppState>,
    Path(document_id): Path<i64>,
) -> Result<Json<ReimbursementPayload>, ApiError> {
    let record = state.store.get_by_document_id(document_id).map_err(|e| {
        log::error!("retrieve query failed: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to load reimbursement")
    })?;

    match record {
        Some(record) => Ok(Json(record.into())),
        None => Err(api_error(StatusCode::NOT_FOUND, "reimbursement not found")),
    }
}

/// `GET /reimbursements/{document_id}/receipt/` - receipt existence check.
///
/// The first check issues a HEAD request against the canonical receipt
/// location and memoizes the outcome on the record; later calls are served
/// from the stored state unless `?force` re-runs the probe.
pub async fn get_receipt(
    State(state): State<AppState>,
    Path(document_id): Path<i64>,
    Query(params): Query<ReceiptParams>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let force = params.force.is_some();

    let record = state
        .store
        .get_by_document_id(document_id)
        .map_err(|e| {
            log::error!("receipt lookup failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to load reimbursement")
        })?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "reimbursement not found"))?;

    if record.receipt_fetched && !force {
        return Ok(Json(ReceiptResponse {
            url: record.receipt_url,
        }));
    }

    let target = state.receipt.canonical_url(&record);
    let exists = state.receipt.exists(&target).await.map_err(|e| {
        log::error!("receipt probe for document {} failed: {}", document_id, e);
        api_error(StatusCode::BAD_GATEWAY, "receipt check failed")
    })?;

    let url = exists.then_some(target);
    state
        .store
        .update_receipt(document_id, url.as_deref())
        .map_err(|e| {
            log::error!("failed to persist receipt state: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to persist receipt state")
        })?;

    Ok(Json(ReceiptResponse { url }))
}

fn build_filter(
    params: &ListParams,
    page: u64,
    page_size: u64,
) -> Result<ReimbursementFilter, ApiError> {
    Ok(ReimbursementFilter {
        cnpj_cpf: params.cnpj_cpf.clone(),
        subquota_id: params.subquota_id,
        applicant_id: params.applicant_id,
        year: params.year,
        document_ids: params
            .document_id
            .as_deref()
            .map(parse_document_ids)
            .unwrap_or_default(),
        suspicious: params.suspicious.as_deref().and_then(parse_suspicious),
        issue_date_start: parse_date_param("issue_date_start", params.issue_date_start.as_deref())?,
        issue_date_end: parse_date_param("issue_date_end", params.issue_date_end.as_deref())?,
        order_by: params
            .order_by
            .as_deref()
            .map(OrderBy::from_param)
            .unwrap_or_default(),
        limit: page_size,
        offset: (page - 1).saturating_mul(page_size),
    })
}

fn parse_date_param(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d").map(Some).map_err(|_| {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("{field} must be an ISO date (YYYY-MM-DD)"),
            )
        }),
    }
}

/// Rebuilds the request URI with a different `page` value, keeping every
/// other query parameter as the client sent it.
fn page_link(uri: &Uri, page: u64) -> String {
    let mut pairs: Vec<String> = uri
        .query()
        .map(|query| {
            query
                .split('&')
                .filter(|pair| !pair.is_empty() && !pair.starts_with("page=") && *pair != "page")
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    pairs.push(format!("page={page}"));
    format!("{}?{}", uri.path(), pairs.join("&"))
}

fn next_link(uri: &Uri, page: u64, page_size: u64, count: u64) -> Option<String> {
    (page.saturating_mul(page_size) < count).then(|| page_link(uri, page + 1))
}

fn previous_link(uri: &Uri, page: u64) -> Option<String> {
    (page > 1).then(|| page_link(uri, page - 1))
}
