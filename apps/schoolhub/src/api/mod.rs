//! # SchoolHub HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check (never requires a key)
//! - `GET /dashboard`, `GET /reports/*` - Head counts and summaries
//! - `/students`, `/employees`, `/classes`, `/exams`, `/homework` - Records
//! - `/fees/*` - Invoices, payments and fee reports
//! - `/notifications`, `/members/*`, `/messages` - Communication
//! - `POST /export`, `GET /hash` - Canonical snapshot
//!
//! ## Security Configuration
//!
//! Taken from `ServerConfig` (TOML file or `SCHOOLHUB_*` variables):
//! - `cors_origins`: allowed origins, `["*"]` for all (default: localhost only)
//! - `rate_limit`: requests per second (default: 100, 0 to disable)
//! - `api_key`: if set, requires Bearer token authentication

mod academics;
mod auth;
mod comms;
mod error;
mod finance;
mod handlers;
mod middleware;
mod records;
mod types;

pub use auth::keys_match;
pub use error::{ApiError, ApiResult};
pub use middleware::create_rate_limiter;
pub use types::{
    ApiResponse, DeletedResponse, ExportResponse, HashResponse, HealthResponse, Listing,
    MarkAttendanceRequest, NotificationRequest, PromoteRequest, ReadRequest, ResultRequest,
    SendMessageRequest, SubmissionRequest, UnreadResponse,
};

use crate::config::ServerConfig;
use crate::scheduler::spawn_poller;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use schoolhub_core::{Employee, Exam, Homework, School, SchoolClass, SchoolError, Student};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: one school, many readers, one writer.
#[derive(Clone)]
pub struct AppState {
    pub school: Arc<RwLock<School>>,
}

impl AppState {
    #[must_use]
    pub fn new(school: School) -> Self {
        Self {
            school: Arc::new(RwLock::new(school)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build the CORS layer from configured origins.
///
/// - `["*"]`: allows all origins (development only)
/// - empty: localhost only
/// - otherwise: exactly the listed origins
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: Allowing ALL origins (cors_origins = *). Do not use in production!");
        return CorsLayer::permissive();
    }
    if origins.is_empty() {
        tracing::info!("CORS: No origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(hv) => {
                tracing::info!("CORS: Allowing origin: {}", origin);
                Some(hv)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Localhost on the dashboard and API ports.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTES
// =============================================================================

fn routes() -> Router<AppState> {
    Router::new()
        // System
        .route("/health", get(handlers::health_handler))
        .route("/dashboard", get(handlers::dashboard_handler))
        .route("/reports/class-strength", get(handlers::class_strength_handler))
        .route("/reports/staff", get(handlers::staff_handler))
        .route("/reports/store", get(handlers::store_handler))
        .route("/export", post(handlers::export_handler))
        .route("/hash", get(handlers::hash_handler))
        // Students
        .route(
            "/students",
            get(records::list_students).post(records::create_record::<Student>),
        )
        .route("/students/promote", post(academics::promote_handler))
        .route(
            "/students/{id}",
            get(records::get_record::<Student>)
                .put(records::update_record::<Student>)
                .delete(records::delete_record::<Student>),
        )
        .route(
            "/students/{id}/attendance",
            get(academics::student_attendance_handler),
        )
        .route("/students/{id}/report-card", get(academics::report_card_handler))
        .route("/students/{id}/ledger", get(finance::ledger_handler))
        .route(
            "/students/{id}/homework/pending",
            get(academics::pending_homework_handler),
        )
        // Employees
        .route(
            "/employees",
            get(records::list_employees).post(records::create_record::<Employee>),
        )
        .route(
            "/employees/{id}",
            get(records::get_record::<Employee>)
                .put(records::update_record::<Employee>)
                .delete(records::delete_record::<Employee>),
        )
        // Classes
        .route(
            "/classes",
            get(records::list_records::<SchoolClass>).post(records::create_record::<SchoolClass>),
        )
        .route(
            "/classes/{id}",
            get(records::get_record::<SchoolClass>)
                .put(records::update_record::<SchoolClass>)
                .delete(records::delete_record::<SchoolClass>),
        )
        .route("/classes/{id}/roster", get(academics::roster_handler))
        .route(
            "/classes/{id}/attendance",
            get(academics::day_sheet_handler).post(academics::mark_attendance_handler),
        )
        .route(
            "/classes/{id}/attendance/report",
            get(academics::class_report_handler),
        )
        .route("/classes/{id}/homework", get(academics::class_homework_handler))
        // Exams
        .route(
            "/exams",
            get(records::list_records::<Exam>).post(records::create_record::<Exam>),
        )
        .route(
            "/exams/{id}",
            get(records::get_record::<Exam>)
                .put(academics::revise_exam_handler)
                .delete(records::delete_record::<Exam>),
        )
        .route(
            "/exams/{id}/results",
            get(academics::ranking_handler).post(academics::record_result_handler),
        )
        .route("/exams/{id}/statistics", get(academics::statistics_handler))
        // Homework
        .route(
            "/homework",
            get(records::list_records::<Homework>).post(records::create_record::<Homework>),
        )
        .route(
            "/homework/{id}",
            get(records::get_record::<Homework>)
                .put(academics::revise_homework_handler)
                .delete(records::delete_record::<Homework>),
        )
        .route(
            "/homework/{id}/submissions",
            get(academics::homework_status_handler).post(academics::submit_handler),
        )
        // Fees
        .route(
            "/fees/invoices",
            get(finance::list_invoices).post(finance::create_invoice),
        )
        .route(
            "/fees/invoices/{id}",
            get(finance::invoice_statement_handler)
                .put(finance::revise_invoice_handler)
                .delete(finance::delete_invoice),
        )
        .route(
            "/fees/payments",
            get(finance::list_payments).post(finance::record_payment_handler),
        )
        .route("/fees/summary", get(finance::summary_handler))
        .route("/fees/defaulters", get(finance::defaulters_handler))
        .route("/fees/collections", get(finance::collections_handler))
        // Notifications
        .route(
            "/notifications",
            get(comms::list_notifications).post(comms::publish_handler),
        )
        .route("/notifications/dispatch", post(comms::dispatch_handler))
        .route(
            "/notifications/{id}",
            get(comms::get_notification)
                .put(comms::revise_handler)
                .delete(comms::delete_notification),
        )
        // Members and messages
        .route("/members/{kind}/{id}/inbox", get(comms::inbox_handler))
        .route("/members/{kind}/{id}/unread", get(comms::unread_handler))
        .route("/members/{kind}/{id}/messages", get(comms::mailbox_handler))
        .route(
            "/members/{kind}/{id}/conversation/{other_kind}/{other_id}",
            get(comms::conversation_handler),
        )
        .route("/deliveries/{id}/read", post(comms::read_delivery_handler))
        .route("/messages", post(comms::send_message_handler))
        .route("/messages/{id}/read", post(comms::read_message_handler))
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate limiting (if enabled)
/// 5. Authentication (if a key is configured)
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = routes();

    match config.api_key.as_deref() {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            router = router.layer(axum_middleware::from_fn_with_state(
                Arc::<str>::from(key),
                auth::api_key_auth_middleware,
            ));
        }
        None => {
            tracing::warn!(
                "API key authentication DISABLED - all endpoints are publicly accessible! \
                 Set SCHOOLHUB_API_KEY to enable authentication."
            );
        }
    }

    if config.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", config.rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(config.rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(&config.cors_origins))
                .layer(DefaultBodyLimit::max(config.body_limit_bytes)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::error!("Cannot listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    tokio::select! {
        () = ctrl_c() => {}
        () = terminate() => {}
    }
    tracing::info!("Shutdown requested");
}

/// Serve until Ctrl-C or SIGTERM, running the notification poller alongside.
///
/// The poller starts only once the listener is bound and is stopped after
/// the last request has drained. The caller keeps its own `AppState` clone
/// to persist the school afterwards.
pub async fn run_server(config: &ServerConfig, state: AppState) -> Result<(), SchoolError> {
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SchoolError::IoError(format!("Bind failed: {}", e)))?;

    let poller = spawn_poller(
        Arc::clone(&state.school),
        Duration::from_secs(config.poll_interval_secs),
    );
    let router = create_router(state, config);

    tracing::info!("SchoolHub HTTP server listening on {}", addr);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SchoolError::IoError(format!("Server error: {}", e)));

    poller.stop().await;
    served
}
