//! # System Handlers
//!
//! Health, dashboard, reports and snapshot endpoints.

use super::{
    AppState,
    error::{ApiResult, ok},
    types::{ExportResponse, HashResponse, HealthResponse, TodayQuery},
};
use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use schoolhub_core::{
    ClassStrength, Dashboard, StaffRow, StoreMetrics, export_snapshot,
    export::{Snapshot, snapshot_crypto_hash},
};

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Head counts, today's attendance and the fee position.
pub async fn dashboard_handler(
    State(state): State<AppState>,
    Query(query): Query<TodayQuery>,
) -> ApiResult<Dashboard> {
    let school = state.school.read().await;
    ok(school.dashboard(query.resolve())?)
}

pub async fn class_strength_handler(State(state): State<AppState>) -> ApiResult<ClassStrength> {
    let school = state.school.read().await;
    ok(school.class_strength()?)
}

pub async fn staff_handler(State(state): State<AppState>) -> ApiResult<Vec<StaffRow>> {
    let school = state.school.read().await;
    ok(school.staff_breakdown()?)
}

pub async fn store_handler(State(state): State<AppState>) -> ApiResult<StoreMetrics> {
    let school = state.school.read().await;
    ok(school.store_metrics()?)
}

/// Export the whole school as a canonical snapshot.
pub async fn export_handler(State(state): State<AppState>) -> ApiResult<ExportResponse> {
    let school = state.school.read().await;
    let snapshot = Snapshot::capture(&school)?;
    let data = export_snapshot(&school)?;
    tracing::info!(
        event = "snapshot_exported",
        records = snapshot.record_count(),
        bytes = data.len(),
        "Snapshot exported"
    );
    ok(ExportResponse::new(
        &data,
        snapshot.checksum(),
        snapshot.record_count(),
    ))
}

/// Checksum and BLAKE3 hash of the canonical snapshot.
pub async fn hash_handler(State(state): State<AppState>) -> ApiResult<HashResponse> {
    let school = state.school.read().await;
    let snapshot = Snapshot::capture(&school)?;
    let hash = snapshot_crypto_hash(&school)?;
    ok(HashResponse {
        checksum: snapshot.checksum(),
        hash,
    })
}
