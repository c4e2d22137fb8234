//! # Academic Handlers
//!
//! Rosters and promotion, attendance registers, exam results and homework.

use super::{
    AppState,
    error::{ApiError, ApiResult, ok},
    types::{
        ApiResponse, DateQuery, DueFromQuery, MarkAttendanceRequest, PromoteRequest, RangeQuery,
        ResultRequest, SubmissionRequest, TodayQuery, today,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use schoolhub_core::{
    AttendanceSummary, ClassAttendanceReport, ClassDaySheet, Exam, ExamResult, ExamStatistics,
    Homework, HomeworkStatus, Promotion, RankedResult, Record, RecordId, ReportCard, Student,
    SubmissionEntry,
};

// =============================================================================
// STUDENTS AND CLASSES
// =============================================================================

pub async fn promote_handler(
    State(state): State<AppState>,
    Json(request): Json<PromoteRequest>,
) -> ApiResult<Promotion> {
    let mut school = state.school.write().await;
    let promotion = school.promote_students(
        request.from_class_id,
        request.to_class_id,
        request.student_ids.as_deref(),
    )?;
    tracing::info!(
        event = "students_promoted",
        from = %promotion.from_class,
        to = %promotion.to_class,
        moved = promotion.moved.len(),
        "Students promoted"
    );
    ok(promotion)
}

pub async fn roster_handler(
    State(state): State<AppState>,
    Path(class_id): Path<u64>,
) -> ApiResult<Vec<Record<Student>>> {
    let school = state.school.read().await;
    ok(school.class_roster(RecordId(class_id))?)
}

// =============================================================================
// ATTENDANCE
// =============================================================================

/// `GET /classes/{id}/attendance?date=` (defaults to today).
pub async fn day_sheet_handler(
    State(state): State<AppState>,
    Path(class_id): Path<u64>,
    Query(query): Query<DateQuery>,
) -> ApiResult<ClassDaySheet> {
    let date = query.date.unwrap_or_else(today);
    let school = state.school.read().await;
    ok(school.class_day_sheet(RecordId(class_id), date)?)
}

/// Record the register for one day and return the resulting sheet.
pub async fn mark_attendance_handler(
    State(state): State<AppState>,
    Path(class_id): Path<u64>,
    Json(request): Json<MarkAttendanceRequest>,
) -> ApiResult<ClassDaySheet> {
    let class_id = RecordId(class_id);
    let mut school = state.school.write().await;
    school.mark_attendance(
        class_id,
        request.date,
        &request.entries,
        request.marked_by,
        today(),
    )?;
    ok(school.class_day_sheet(class_id, request.date)?)
}

pub async fn class_report_handler(
    State(state): State<AppState>,
    Path(class_id): Path<u64>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<ClassAttendanceReport> {
    let school = state.school.read().await;
    ok(school.class_attendance_report(RecordId(class_id), range.from, range.to)?)
}

pub async fn student_attendance_handler(
    State(state): State<AppState>,
    Path(student_id): Path<u64>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<AttendanceSummary> {
    let school = state.school.read().await;
    ok(school.student_attendance(RecordId(student_id), range.from, range.to)?)
}

// =============================================================================
// EXAMS
// =============================================================================

/// `PUT /exams/{id}`: refused while recorded results would no longer fit.
pub async fn revise_exam_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(exam): Json<Exam>,
) -> ApiResult<Record<Exam>> {
    let mut school = state.school.write().await;
    ok(school.revise_exam(RecordId(id), exam)?)
}

/// Ranking of an exam, best first.
pub async fn ranking_handler(
    State(state): State<AppState>,
    Path(exam_id): Path<u64>,
) -> ApiResult<Vec<RankedResult>> {
    let school = state.school.read().await;
    ok(school.exam_ranking(RecordId(exam_id))?)
}

/// Record or correct one student's marks.
pub async fn record_result_handler(
    State(state): State<AppState>,
    Path(exam_id): Path<u64>,
    Json(request): Json<ResultRequest>,
) -> ApiResult<Record<ExamResult>> {
    let mut school = state.school.write().await;
    ok(school.record_result(
        RecordId(exam_id),
        request.student_id,
        request.marks,
        request.remark,
    )?)
}

pub async fn statistics_handler(
    State(state): State<AppState>,
    Path(exam_id): Path<u64>,
) -> ApiResult<ExamStatistics> {
    let school = state.school.read().await;
    ok(school.exam_statistics(RecordId(exam_id))?)
}

pub async fn report_card_handler(
    State(state): State<AppState>,
    Path(student_id): Path<u64>,
) -> ApiResult<ReportCard> {
    let school = state.school.read().await;
    ok(school.report_card(RecordId(student_id))?)
}

// =============================================================================
// HOMEWORK
// =============================================================================

pub async fn revise_homework_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(homework): Json<Homework>,
) -> ApiResult<Record<Homework>> {
    let mut school = state.school.write().await;
    ok(school.revise_homework(RecordId(id), homework)?)
}

pub async fn class_homework_handler(
    State(state): State<AppState>,
    Path(class_id): Path<u64>,
    Query(query): Query<DueFromQuery>,
) -> ApiResult<Vec<Record<Homework>>> {
    let school = state.school.read().await;
    ok(school.class_homework(RecordId(class_id), query.due_from)?)
}

pub async fn pending_homework_handler(
    State(state): State<AppState>,
    Path(student_id): Path<u64>,
    Query(query): Query<TodayQuery>,
) -> ApiResult<Vec<Record<Homework>>> {
    let school = state.school.read().await;
    ok(school.pending_homework(RecordId(student_id), query.resolve())?)
}

/// Submissions received plus the students still missing.
pub async fn homework_status_handler(
    State(state): State<AppState>,
    Path(homework_id): Path<u64>,
) -> ApiResult<HomeworkStatus> {
    let school = state.school.read().await;
    ok(school.homework_status(RecordId(homework_id))?)
}

pub async fn submit_handler(
    State(state): State<AppState>,
    Path(homework_id): Path<u64>,
    Json(request): Json<SubmissionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubmissionEntry>>), ApiError> {
    let mut school = state.school.write().await;
    let entry = school.submit_homework(
        RecordId(homework_id),
        request.student_id,
        request.content,
        request.submitted_on.unwrap_or_else(today),
    )?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(entry))))
}
