//! # Attendance Module
//!
//! Marking a class register and summarizing attendance over date ranges.
//!
//! A student has at most one mark per day. Re-marking a day overwrites the
//! earlier mark instead of adding a second one.

use crate::model::{AttendanceRecord, AttendanceStatus, Employee, SchoolClass, Student};
use crate::primitives::{MAX_ATTENDANCE_BATCH, ratio_bp};
use crate::school::encode;
use crate::storage::WriteBatch;
use crate::{Document, Record, RecordId, School, SchoolError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One line of a register submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub student_id: RecordId,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub remark: Option<String>,
}

/// Status counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceTally {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub excused: u32,
}

impl AttendanceTally {
    pub fn add(&mut self, status: AttendanceStatus) {
        let slot = match status {
            AttendanceStatus::Present => &mut self.present,
            AttendanceStatus::Absent => &mut self.absent,
            AttendanceStatus::Late => &mut self.late,
            AttendanceStatus::Excused => &mut self.excused,
        };
        *slot = slot.saturating_add(1);
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.present
            .saturating_add(self.absent)
            .saturating_add(self.late)
            .saturating_add(self.excused)
    }

    /// Share of countable days attended, in basis points.
    ///
    /// Late counts as attended; excused days are left out of the
    /// denominator. `None` when no day is countable.
    #[must_use]
    pub fn rate_bp(&self) -> Option<u32> {
        let attended = u64::from(self.present) + u64::from(self.late);
        let countable = u64::from(self.total()) - u64::from(self.excused);
        (countable > 0).then(|| ratio_bp(attended, countable))
    }
}

/// One student's attendance over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    pub student_id: RecordId,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub tally: AttendanceTally,
    pub rate_bp: Option<u32>,
}

/// A roster line on a class register for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySheetEntry {
    pub student_id: RecordId,
    pub student_name: String,
    pub status: Option<AttendanceStatus>,
    pub remark: Option<String>,
}

/// A class register for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDaySheet {
    pub class_id: RecordId,
    pub date: NaiveDate,
    pub entries: Vec<DaySheetEntry>,
    pub tally: AttendanceTally,
    pub unmarked: u32,
}

/// Per-student rows plus a class total over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassAttendanceReport {
    pub class_id: RecordId,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub students: Vec<StudentAttendanceRow>,
    pub class_tally: AttendanceTally,
    pub class_rate_bp: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentAttendanceRow {
    pub student_id: RecordId,
    pub student_name: String,
    pub tally: AttendanceTally,
    pub rate_bp: Option<u32>,
}

fn check_range(from: NaiveDate, to: NaiveDate) -> Result<(), SchoolError> {
    if from > to {
        return Err(SchoolError::Validation(format!(
            "range start {} is after end {}",
            from, to
        )));
    }
    Ok(())
}

impl School {
    /// Record a class register for one day.
    ///
    /// Every entry must name a distinct student of the class. Existing marks
    /// for the same student and day are overwritten. The whole register is
    /// written in one batch.
    pub fn mark_attendance(
        &mut self,
        class_id: RecordId,
        date: NaiveDate,
        entries: &[AttendanceEntry],
        marked_by: Option<RecordId>,
        today: NaiveDate,
    ) -> Result<Vec<Record<AttendanceRecord>>, SchoolError> {
        if date > today {
            return Err(SchoolError::Validation(format!(
                "cannot mark attendance for future date {}",
                date
            )));
        }
        if entries.is_empty() {
            return Err(SchoolError::Validation(
                "attendance register is empty".to_string(),
            ));
        }
        if entries.len() > MAX_ATTENDANCE_BATCH {
            return Err(SchoolError::Validation(format!(
                "register of {} entries exceeds maximum {}",
                entries.len(),
                MAX_ATTENDANCE_BATCH
            )));
        }
        self.get::<SchoolClass>(class_id)?;
        if let Some(by) = marked_by {
            self.get::<Employee>(by)?;
        }

        let mut seen = BTreeSet::new();
        for entry in entries {
            if !seen.insert(entry.student_id) {
                return Err(SchoolError::Validation(format!(
                    "student {} listed more than once",
                    entry.student_id
                )));
            }
            let student = self.get::<Student>(entry.student_id)?;
            if student.data.class_id != Some(class_id) {
                return Err(SchoolError::Validation(format!(
                    "student {} is not in class {}",
                    entry.student_id, class_id
                )));
            }
        }

        let existing: BTreeMap<RecordId, RecordId> = self
            .list_where::<AttendanceRecord>(|r| r.date == date && seen.contains(&r.student_id))?
            .into_iter()
            .map(|r| (r.data.student_id, r.id))
            .collect();

        let mut batch = WriteBatch::new();
        let mut pending = Vec::with_capacity(entries.len());
        for entry in entries {
            let record = AttendanceRecord {
                student_id: entry.student_id,
                class_id,
                date,
                status: entry.status,
                remark: entry.remark.clone(),
                marked_by,
            };
            // References were checked above; only the local rules remain.
            record.validate()?;
            let bytes = encode(&record)?;
            match existing.get(&entry.student_id) {
                Some(&id) => {
                    batch.put(AttendanceRecord::COLLECTION, id, bytes);
                    pending.push((Some(id), record));
                }
                None => {
                    batch.insert(AttendanceRecord::COLLECTION, bytes);
                    pending.push((None, record));
                }
            }
        }
        let mut assigned = self.commit(batch)?.into_iter();
        let mut out = Vec::with_capacity(pending.len());
        for (id, record) in pending {
            let id = match id {
                Some(id) => id,
                None => assigned.next().ok_or_else(|| {
                    SchoolError::IoError("attendance insert assigned no id".to_string())
                })?,
            };
            out.push(Record::new(id, record));
        }
        Ok(out)
    }

    /// The register of a class for one day, including unmarked students.
    pub fn class_day_sheet(
        &self,
        class_id: RecordId,
        date: NaiveDate,
    ) -> Result<ClassDaySheet, SchoolError> {
        let roster = self.class_roster(class_id)?;
        let marks: BTreeMap<RecordId, AttendanceRecord> = self
            .list_where::<AttendanceRecord>(|r| r.class_id == class_id && r.date == date)?
            .into_iter()
            .map(|r| (r.data.student_id, r.data))
            .collect();

        let mut tally = AttendanceTally::default();
        let mut unmarked = 0u32;
        let mut entries = Vec::with_capacity(roster.len());
        for student in roster {
            let mark = marks.get(&student.id);
            match mark {
                Some(m) => tally.add(m.status),
                None => unmarked = unmarked.saturating_add(1),
            }
            entries.push(DaySheetEntry {
                student_id: student.id,
                student_name: student.data.full_name(),
                status: mark.map(|m| m.status),
                remark: mark.and_then(|m| m.remark.clone()),
            });
        }

        Ok(ClassDaySheet {
            class_id,
            date,
            entries,
            tally,
            unmarked,
        })
    }

    /// One student's attendance between two dates (inclusive).
    pub fn student_attendance(
        &self,
        student_id: RecordId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<AttendanceSummary, SchoolError> {
        check_range(from, to)?;
        self.get::<Student>(student_id)?;
        let mut tally = AttendanceTally::default();
        for record in self.list_where::<AttendanceRecord>(|r| {
            r.student_id == student_id && r.date >= from && r.date <= to
        })? {
            tally.add(record.data.status);
        }
        Ok(AttendanceSummary {
            student_id,
            from,
            to,
            tally,
            rate_bp: tally.rate_bp(),
        })
    }

    /// Attendance of every current student of a class between two dates.
    pub fn class_attendance_report(
        &self,
        class_id: RecordId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ClassAttendanceReport, SchoolError> {
        check_range(from, to)?;
        let roster = self.class_roster(class_id)?;
        let mut per_student: BTreeMap<RecordId, AttendanceTally> = BTreeMap::new();
        for record in self.list_where::<AttendanceRecord>(|r| {
            r.class_id == class_id && r.date >= from && r.date <= to
        })? {
            per_student
                .entry(record.data.student_id)
                .or_default()
                .add(record.data.status);
        }

        let mut class_tally = AttendanceTally::default();
        let mut students = Vec::with_capacity(roster.len());
        for student in roster {
            let tally = per_student.get(&student.id).copied().unwrap_or_default();
            class_tally.present = class_tally.present.saturating_add(tally.present);
            class_tally.absent = class_tally.absent.saturating_add(tally.absent);
            class_tally.late = class_tally.late.saturating_add(tally.late);
            class_tally.excused = class_tally.excused.saturating_add(tally.excused);
            students.push(StudentAttendanceRow {
                student_id: student.id,
                student_name: student.data.full_name(),
                tally,
                rate_bp: tally.rate_bp(),
            });
        }

        Ok(ClassAttendanceReport {
            class_id,
            from,
            to,
            students,
            class_rate_bp: class_tally.rate_bp(),
            class_tally,
        })
    }

    /// Tally of every mark recorded on one day, across all classes.
    pub fn attendance_on(&self, date: NaiveDate) -> Result<AttendanceTally, SchoolError> {
        let mut tally = AttendanceTally::default();
        for record in self.list_where::<AttendanceRecord>(|r| r.date == date)? {
            tally.add(record.data.status);
        }
        Ok(tally)
    }
}
