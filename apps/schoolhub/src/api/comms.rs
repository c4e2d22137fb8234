//! # Communication Handlers
//!
//! Notifications, member inboxes and direct messages.
//!
//! Members appear in paths as `{kind}/{id}` where kind is `student` or
//! `employee`, and in bodies as `{"student": 3}`.

use super::{
    AppState,
    error::{ApiError, ApiResult, ok},
    types::{
        ApiResponse, DeletedResponse, FolderQuery, InboxQuery, Listing, NotificationRequest,
        PageQuery, ReadRequest, SendMessageRequest, UnreadResponse,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use schoolhub_core::{
    Delivery, DispatchReport, InboxItem, Member, Message, Notification, Record, RecordId,
};

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Listing<Record<Notification>>> {
    let school = state.school.read().await;
    let mut notifications = school.list::<Notification>()?;
    notifications.reverse();
    ok(Listing::page(notifications, page.offset, page.limit))
}

/// Store a notification; it is delivered at once unless scheduled later.
pub async fn publish_handler(
    State(state): State<AppState>,
    Json(request): Json<NotificationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Record<Notification>>>), ApiError> {
    let now = Utc::now();
    let mut school = state.school.write().await;
    let record = school.publish_notification(request.into_notification(now), now)?;
    tracing::info!(
        event = "notification_published",
        id = %record.id,
        recipients = record.data.recipient_count,
        scheduled = record.data.sent_at.is_none(),
        "Notification published"
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

pub async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Record<Notification>> {
    let school = state.school.read().await;
    ok(school.get::<Notification>(RecordId(id))?)
}

/// Edit a notification that has not been sent yet.
pub async fn revise_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<NotificationRequest>,
) -> ApiResult<Record<Notification>> {
    let now = Utc::now();
    let mut school = state.school.write().await;
    let created_at = school.get::<Notification>(RecordId(id))?.data.created_at;
    let mut notification = request.into_notification(now);
    notification.created_at = created_at;
    ok(school.revise_notification(RecordId(id), notification, now)?)
}

/// Removes the notification together with its deliveries.
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<DeletedResponse> {
    let mut school = state.school.write().await;
    let removed = school.remove::<Notification>(RecordId(id))?;
    ok(DeletedResponse { id: removed.id })
}

/// Run a dispatch pass now instead of waiting for the poller.
pub async fn dispatch_handler(State(state): State<AppState>) -> ApiResult<DispatchReport> {
    let mut school = state.school.write().await;
    let report = school.dispatch_due(Utc::now())?;
    if !report.is_empty() {
        tracing::info!(
            event = "notifications_dispatched",
            notifications = report.sent.len(),
            deliveries = report.deliveries,
            "Manual dispatch"
        );
    }
    ok(report)
}

// =============================================================================
// INBOXES
// =============================================================================

pub async fn inbox_handler(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, u64)>,
    Query(query): Query<InboxQuery>,
) -> ApiResult<Vec<InboxItem>> {
    let member = Member::parse(&kind, id)?;
    let school = state.school.read().await;
    ok(school.inbox(member, query.unread_only)?)
}

pub async fn unread_handler(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, u64)>,
) -> ApiResult<UnreadResponse> {
    let member = Member::parse(&kind, id)?;
    let school = state.school.read().await;
    let unread = school.unread_count(member)?;
    ok(UnreadResponse { member, unread })
}

pub async fn read_delivery_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<ReadRequest>,
) -> ApiResult<Record<Delivery>> {
    let mut school = state.school.write().await;
    ok(school.mark_delivery_read(RecordId(id), request.member, Utc::now())?)
}

// =============================================================================
// MESSAGES
// =============================================================================

pub async fn send_message_handler(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Record<Message>>>), ApiError> {
    let mut school = state.school.write().await;
    let record = school.send_message(
        request.sender,
        request.recipient,
        request.subject,
        request.body,
        Utc::now(),
    )?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

/// `GET /members/{kind}/{id}/messages?folder=inbox|sent`
pub async fn mailbox_handler(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, u64)>,
    Query(query): Query<FolderQuery>,
) -> ApiResult<Vec<Record<Message>>> {
    let member = Member::parse(&kind, id)?;
    let school = state.school.read().await;
    ok(school.mailbox(member, query.folder)?)
}

pub async fn conversation_handler(
    State(state): State<AppState>,
    Path((kind, id, other_kind, other_id)): Path<(String, u64, String, u64)>,
) -> ApiResult<Vec<Record<Message>>> {
    let a = Member::parse(&kind, id)?;
    let b = Member::parse(&other_kind, other_id)?;
    let school = state.school.read().await;
    ok(school.conversation(a, b)?)
}

pub async fn read_message_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<ReadRequest>,
) -> ApiResult<Record<Message>> {
    let mut school = state.school.write().await;
    ok(school.mark_message_read(RecordId(id), request.member, Utc::now())?)
}
