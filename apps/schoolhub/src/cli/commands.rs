//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! With the `file` backend the school lives in memory and is written back
//! as a canonical snapshot after every command that changes it.

use super::roster::{RosterFile, load_roster};
use crate::api::{self, AppState};
use crate::config::{Backend, ServerConfig};
use chrono::{NaiveDate, Utc};
use schoolhub_core::{
    School, SchoolError, export::snapshot_crypto_hash, export_snapshot, import_snapshot,
    snapshot_checksum,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum roster file size (100 MB).
const MAX_ROSTER_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum snapshot file size (500 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), SchoolError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| SchoolError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(SchoolError::Validation(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path: canonical, existing, and a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, SchoolError> {
    let canonical = path.canonicalize().map_err(|e| {
        SchoolError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(SchoolError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path: canonical parent directory plus file name.
fn validate_output_path(path: &Path) -> Result<PathBuf, SchoolError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        SchoolError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(SchoolError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| SchoolError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &impl serde::Serialize) -> Result<(), SchoolError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| SchoolError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn dollars(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

fn percent(bp: u32) -> String {
    format!("{}.{:02}%", bp / 100, bp % 100)
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server and notification poller.
pub async fn cmd_server(config: ServerConfig) -> Result<(), SchoolError> {
    let school = load_or_create_school(&config.database, config.backend)?;

    println!("SchoolHub Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.bind_addr());
    println!("  Backend:  {}", config.backend);
    println!("  Database: {:?}", config.database);
    println!("  Poll:     every {}s", config.poll_interval_secs);
    println!(
        "  Auth:     {}",
        if config.api_key.is_some() {
            "API key"
        } else {
            "disabled"
        }
    );
    println!();
    println!("Endpoints:");
    println!("  GET  /health        - Health check");
    println!("  GET  /dashboard     - School dashboard");
    println!("  *    /students ...  - Records, attendance, fees, exams, homework");
    println!("  *    /notifications - Publish and schedule notifications");
    println!("  POST /export        - Export snapshot");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(school);
    let served = api::run_server(&config, state.clone()).await;

    if config.backend == Backend::File {
        let school = state.school.read().await;
        save_school(&school, &config.database)?;
        tracing::info!(path = ?config.database, "School saved");
    }
    served
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show the dashboard.
pub fn cmd_status(
    config: &ServerConfig,
    json_mode: bool,
    today: Option<NaiveDate>,
) -> Result<(), SchoolError> {
    let school = load_or_create_school(&config.database, config.backend)?;
    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    let dashboard = school.dashboard(today)?;

    if json_mode {
        let output = serde_json::json!({
            "database": config.database.to_string_lossy(),
            "backend": config.backend,
            "dashboard": dashboard,
        });
        return print_json(&output);
    }

    println!("SchoolHub Status ({})", dashboard.today);
    println!("==========================");
    println!("Database: {:?}", config.database);
    println!("Backend:  {}", config.backend);
    println!();
    println!(
        "Students:   {} ({} active)",
        dashboard.students, dashboard.active_students
    );
    println!(
        "Employees:  {} ({} active)",
        dashboard.employees, dashboard.active_employees
    );
    println!("Classes:    {}", dashboard.classes);
    let attendance = dashboard.attendance_today;
    println!(
        "Attendance: {} present, {} absent, {} late, {} excused",
        attendance.present, attendance.absent, attendance.late, attendance.excused
    );
    println!(
        "Fees:       {} billed, {} collected, {} outstanding ({} overdue)",
        dollars(dashboard.fees.billed_cents),
        dollars(dashboard.fees.collected_cents),
        dollars(dashboard.fees.outstanding_cents),
        dollars(dashboard.fees.overdue_cents)
    );
    println!(
        "Collection: {}",
        percent(dashboard.fees.collection_rate_bp)
    );
    println!("Pending notifications: {}", dashboard.pending_notifications);
    println!("Upcoming exams:        {}", dashboard.upcoming_exams);

    Ok(())
}

// =============================================================================
// LOAD COMMAND
// =============================================================================

/// Bulk-load a JSON roster.
pub fn cmd_load(config: &ServerConfig, json_mode: bool, file: &Path) -> Result<(), SchoolError> {
    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_ROSTER_FILE_SIZE)?;

    let text = std::fs::read_to_string(&validated_path)
        .map_err(|e| SchoolError::IoError(format!("Read file: {}", e)))?;
    let roster: RosterFile = serde_json::from_str(&text)
        .map_err(|e| SchoolError::Validation(format!("Invalid roster file: {}", e)))?;

    let mut school = load_or_create_school(&config.database, config.backend)?;
    let summary = load_roster(&mut school, roster)?;
    save_school(&school, &config.database)?;

    if json_mode {
        return print_json(&summary);
    }
    println!(
        "Loaded {} employees, {} classes, {} students",
        summary.employees, summary.classes, summary.students
    );
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export the school to a snapshot file.
pub fn cmd_export(config: &ServerConfig, output: &Path) -> Result<(), SchoolError> {
    let validated_output = validate_output_path(output)?;
    let school = load_or_create_school(&config.database, config.backend)?;

    let data = export_snapshot(&school)?;
    println!("Checksum: {}", snapshot_checksum(&school)?);

    std::fs::write(&validated_output, &data)
        .map_err(|e| SchoolError::IoError(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Import a snapshot into an empty file-backed school.
pub fn cmd_import(config: &ServerConfig, input: &Path) -> Result<(), SchoolError> {
    if config.backend == Backend::Redb {
        return Err(SchoolError::Validation(
            "Import is only supported with the file backend. Use -B file.".to_string(),
        ));
    }

    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| SchoolError::IoError(format!("Read file: {}", e)))?;

    let mut school = load_or_create_school(&config.database, config.backend)?;
    let records = import_snapshot(&mut school, &data)?;
    save_school(&school, &config.database)?;

    println!("Imported {} records", records);
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(config: &ServerConfig, force: bool) -> Result<(), SchoolError> {
    let db_path = &config.database;
    if db_path.exists() {
        if !force {
            return Err(SchoolError::Conflict(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| SchoolError::IoError(format!("Remove old database: {}", e)))?;
    }

    match config.backend {
        Backend::Redb => {
            School::with_redb(db_path)?;
            println!("Initialized new redb database at {:?}", db_path);
        }
        Backend::File => {
            save_school(&School::new(), db_path)?;
            println!("Initialized new file database at {:?}", db_path);
        }
    }
    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Print the checksum and BLAKE3 hash of the canonical snapshot.
pub fn cmd_hash(config: &ServerConfig, json_mode: bool) -> Result<(), SchoolError> {
    let school = load_or_create_school(&config.database, config.backend)?;
    let checksum = snapshot_checksum(&school)?;
    let hash = snapshot_crypto_hash(&school)?;

    if json_mode {
        return print_json(&serde_json::json!({ "checksum": checksum, "hash": hash }));
    }
    println!("Checksum: {}", checksum);
    println!("BLAKE3:   {}", hash);
    Ok(())
}

// =============================================================================
// DISPATCH COMMAND
// =============================================================================

/// Deliver due notifications once, without starting the server.
pub fn cmd_dispatch(config: &ServerConfig, json_mode: bool) -> Result<(), SchoolError> {
    let mut school = load_or_create_school(&config.database, config.backend)?;
    let report = school.dispatch_due(Utc::now())?;
    if !report.is_empty() {
        save_school(&school, &config.database)?;
    }

    if json_mode {
        return print_json(&report);
    }
    println!(
        "Sent {} notifications ({} deliveries)",
        report.sent.len(),
        report.deliveries
    );
    Ok(())
}

// =============================================================================
// DEFAULTERS COMMAND
// =============================================================================

/// List students with overdue invoices, largest debt first.
pub fn cmd_defaulters(
    config: &ServerConfig,
    json_mode: bool,
    today: Option<NaiveDate>,
) -> Result<(), SchoolError> {
    let school = load_or_create_school(&config.database, config.backend)?;
    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    let defaulters = school.defaulters(today)?;

    if json_mode {
        return print_json(&defaulters);
    }
    if defaulters.is_empty() {
        println!("No overdue fees as of {}", today);
        return Ok(());
    }
    println!("Overdue fees as of {}", today);
    for d in &defaulters {
        println!(
            "  #{:<6} {:<32} {:>12} ({} invoices)",
            d.student_id.value(),
            d.student_name,
            dollars(d.overdue_cents),
            d.overdue_invoices
        );
    }
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the school at `db_path` with the given backend.
///
/// A missing snapshot file yields an empty school.
pub fn load_or_create_school(db_path: &Path, backend: Backend) -> Result<School, SchoolError> {
    match backend {
        Backend::Redb => School::with_redb(db_path),
        Backend::File => {
            if !db_path.exists() {
                return Ok(School::new());
            }
            validate_file_size(db_path, MAX_IMPORT_FILE_SIZE)?;
            let data = std::fs::read(db_path)
                .map_err(|e| SchoolError::IoError(format!("Read db: {}", e)))?;
            School::from_snapshot(&data)
        }
    }
}

/// Write a file-backed school back as a snapshot. A redb school is
/// already on disk, so this is a no-op for it.
pub fn save_school(school: &School, db_path: &Path) -> Result<(), SchoolError> {
    if school.is_persistent() {
        return Ok(());
    }
    let data = export_snapshot(school)?;
    std::fs::write(db_path, &data).map_err(|e| SchoolError::IoError(format!("Write db: {}", e)))
}

// =============================================================================
// TESTS
// =============================================================================
