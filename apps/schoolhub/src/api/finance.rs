//! # Fee Handlers
//!
//! Invoices, payments and the fee reports.

use super::{
    AppState,
    error::{ApiError, ApiResult, ok},
    types::{
        ApiResponse, DeletedResponse, FeeSummaryQuery, InvoiceQuery, Listing, PaymentQuery,
        TodayQuery, YearQuery, today,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Datelike;
use schoolhub_core::{
    Defaulter, FeeInvoice, FeeSummary, InvoiceStatement, Payment, Record, RecordId,
    StudentLedger, billing::MonthlyCollection,
};

// =============================================================================
// INVOICES
// =============================================================================

/// `GET /fees/invoices?student_id&offset&limit`
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<InvoiceQuery>,
) -> ApiResult<Listing<Record<FeeInvoice>>> {
    let student = query.student_id.map(RecordId);
    let school = state.school.read().await;
    let invoices = school.list_where::<FeeInvoice>(|i| student.is_none_or(|s| i.student_id == s))?;
    ok(Listing::page(invoices, query.offset, query.limit))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    Json(invoice): Json<FeeInvoice>,
) -> Result<(StatusCode, Json<ApiResponse<Record<FeeInvoice>>>), ApiError> {
    let mut school = state.school.write().await;
    let record = school.insert(invoice)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

/// The invoice with its payments and status as of `?today=`.
pub async fn invoice_statement_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<TodayQuery>,
) -> ApiResult<InvoiceStatement> {
    let school = state.school.read().await;
    ok(school.invoice_statement(RecordId(id), query.resolve())?)
}

pub async fn revise_invoice_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(invoice): Json<FeeInvoice>,
) -> ApiResult<Record<FeeInvoice>> {
    let mut school = state.school.write().await;
    ok(school.revise_invoice(RecordId(id), invoice)?)
}

/// Invoices with payments against them cannot be removed.
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<DeletedResponse> {
    let mut school = state.school.write().await;
    let removed = school.remove::<FeeInvoice>(RecordId(id))?;
    ok(DeletedResponse { id: removed.id })
}

// =============================================================================
// PAYMENTS
// =============================================================================

/// `GET /fees/payments?invoice_id&offset&limit`
pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentQuery>,
) -> ApiResult<Listing<Record<Payment>>> {
    let invoice = query.invoice_id.map(RecordId);
    let school = state.school.read().await;
    let payments = school.list_where::<Payment>(|p| invoice.is_none_or(|i| p.invoice_id == i))?;
    ok(Listing::page(payments, query.offset, query.limit))
}

pub async fn record_payment_handler(
    State(state): State<AppState>,
    Json(payment): Json<Payment>,
) -> Result<(StatusCode, Json<ApiResponse<Record<Payment>>>), ApiError> {
    let mut school = state.school.write().await;
    let record = school.record_payment(payment)?;
    tracing::info!(
        event = "payment_recorded",
        invoice = %record.data.invoice_id,
        amount_cents = record.data.amount_cents,
        "Payment recorded"
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

// =============================================================================
// REPORTS
// =============================================================================

pub async fn ledger_handler(
    State(state): State<AppState>,
    Path(student_id): Path<u64>,
    Query(query): Query<TodayQuery>,
) -> ApiResult<StudentLedger> {
    let school = state.school.read().await;
    ok(school.student_ledger(RecordId(student_id), query.resolve())?)
}

/// Totals across all invoices, or one class with `?class_id=`.
pub async fn summary_handler(
    State(state): State<AppState>,
    Query(query): Query<FeeSummaryQuery>,
) -> ApiResult<FeeSummary> {
    let as_of = query.today.unwrap_or_else(today);
    let school = state.school.read().await;
    ok(school.fee_summary(as_of, query.class_id.map(RecordId))?)
}

pub async fn defaulters_handler(
    State(state): State<AppState>,
    Query(query): Query<TodayQuery>,
) -> ApiResult<Vec<Defaulter>> {
    let school = state.school.read().await;
    ok(school.defaulters(query.resolve())?)
}

/// Twelve monthly rows for `?year=` (defaults to the current year).
pub async fn collections_handler(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Vec<MonthlyCollection>> {
    let year = query.year.unwrap_or_else(|| today().year());
    let school = state.school.read().await;
    ok(school.monthly_collections(year)?)
}
