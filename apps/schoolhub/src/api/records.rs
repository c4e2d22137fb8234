//! # Record Handlers
//!
//! Create/read/update/delete for the plain document collections
//! (students, employees, classes, exams, homework). The generic handlers
//! are instantiated once per document type in the router.

use super::{
    AppState,
    error::{ApiError, ApiResult, ok},
    types::{ApiResponse, DeletedResponse, EmployeeQuery, Listing, PageQuery, StudentQuery},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use schoolhub_core::{Document, Employee, Record, RecordId, Student, StudentFilter};

/// Page through a whole collection in id order.
pub async fn list_records<T: Document>(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Listing<Record<T>>> {
    let school = state.school.read().await;
    ok(Listing::page(school.list::<T>()?, page.offset, page.limit))
}

pub async fn get_record<T: Document>(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Record<T>> {
    let school = state.school.read().await;
    ok(school.get::<T>(RecordId(id))?)
}

/// Insert a document; responds 201 with the stored record.
pub async fn create_record<T: Document>(
    State(state): State<AppState>,
    Json(doc): Json<T>,
) -> Result<(StatusCode, Json<ApiResponse<Record<T>>>), ApiError> {
    let mut school = state.school.write().await;
    let record = school.insert(doc)?;
    tracing::debug!(collection = %T::COLLECTION, id = %record.id, "Record created");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

pub async fn update_record<T: Document>(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(doc): Json<T>,
) -> ApiResult<Record<T>> {
    let mut school = state.school.write().await;
    ok(school.replace(RecordId(id), doc)?)
}

/// Remove a document. Referenced documents are refused with 409.
pub async fn delete_record<T: Document>(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<DeletedResponse> {
    let mut school = state.school.write().await;
    let removed = school.remove::<T>(RecordId(id))?;
    tracing::debug!(collection = %T::COLLECTION, id = %removed.id, "Record removed");
    ok(DeletedResponse { id: removed.id })
}

// =============================================================================
// FILTERED LISTINGS
// =============================================================================

/// `GET /students?class_id&q&active&offset&limit`
pub async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<StudentQuery>,
) -> ApiResult<Listing<Record<Student>>> {
    let filter = StudentFilter {
        class_id: query.class_id.map(RecordId),
        query: query.q,
        active: query.active,
    };
    let school = state.school.read().await;
    let students = school.search_students(&filter)?;
    ok(Listing::page(students, query.offset, query.limit))
}

/// `GET /employees?role&offset&limit`
pub async fn list_employees(
    State(state): State<AppState>,
    Query(query): Query<EmployeeQuery>,
) -> ApiResult<Listing<Record<Employee>>> {
    let school = state.school.read().await;
    let employees = school.employees_by_role(query.role)?;
    ok(Listing::page(employees, query.offset, query.limit))
}
