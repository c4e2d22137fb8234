//! # Coursework Module
//!
//! Homework submissions and per-assignment progress.

use crate::model::{Homework, SchoolClass, Student, Submission};
use crate::roster::sort_by_name;
use crate::{Record, RecordId, School, SchoolError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A submission together with its lateness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionEntry {
    pub submission: Record<Submission>,
    pub late: bool,
}

/// A student of the class who has not handed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingSubmission {
    pub student_id: RecordId,
    pub student_name: String,
}

/// Who handed in an assignment and who did not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeworkStatus {
    pub homework: Record<Homework>,
    pub submitted: Vec<SubmissionEntry>,
    pub missing: Vec<MissingSubmission>,
    pub late_count: u32,
}

impl School {
    /// Hand in (or hand in again) a piece of homework.
    ///
    /// A resubmission replaces the earlier one and clears its grade.
    pub fn submit_homework(
        &mut self,
        homework_id: RecordId,
        student_id: RecordId,
        content: String,
        submitted_on: NaiveDate,
    ) -> Result<SubmissionEntry, SchoolError> {
        let homework = self.get::<Homework>(homework_id)?;
        let student = self.get::<Student>(student_id)?;
        if student.data.class_id != Some(homework.data.class_id) {
            return Err(SchoolError::Validation(format!(
                "student {} is not in class {} of homework {}",
                student_id, homework.data.class_id, homework_id
            )));
        }
        if submitted_on < homework.data.assigned_on {
            return Err(SchoolError::Validation(
                "submitted_on is before the homework was assigned".to_string(),
            ));
        }

        let submission = Submission {
            homework_id,
            student_id,
            submitted_on,
            content,
            grade: None,
        };
        let existing = self
            .list_where::<Submission>(|s| {
                s.homework_id == homework_id && s.student_id == student_id
            })?
            .into_iter()
            .next();
        let stored = match existing {
            Some(previous) => self.replace(previous.id, submission)?,
            None => self.insert(submission)?,
        };
        Ok(SubmissionEntry {
            late: stored.data.submitted_on > homework.data.due_on,
            submission: stored,
        })
    }

    /// Replace a homework assignment without orphaning its submissions.
    pub fn revise_homework(
        &mut self,
        id: RecordId,
        homework: Homework,
    ) -> Result<Record<Homework>, SchoolError> {
        let current = self.get::<Homework>(id)?;
        let submissions = self.list_where::<Submission>(|s| s.homework_id == id)?;
        if submissions.is_empty() {
            return self.replace(id, homework);
        }
        if homework.class_id != current.data.class_id {
            return Err(SchoolError::Conflict(format!(
                "homework {} has submissions and cannot move to another class",
                id
            )));
        }
        let first = submissions.iter().map(|s| s.data.submitted_on).min();
        if let Some(first) = first.filter(|first| homework.assigned_on > *first) {
            return Err(SchoolError::Validation(format!(
                "assigned_on {} is after the first submission on {}",
                homework.assigned_on, first
            )));
        }
        self.replace(id, homework)
    }

    /// Homework of a class, earliest due first.
    pub fn class_homework(
        &self,
        class_id: RecordId,
        due_from: Option<NaiveDate>,
    ) -> Result<Vec<Record<Homework>>, SchoolError> {
        self.get::<SchoolClass>(class_id)?;
        let mut homework = self.list_where::<Homework>(|h| {
            h.class_id == class_id && due_from.is_none_or(|from| h.due_on >= from)
        })?;
        homework.sort_by(|a, b| a.data.due_on.cmp(&b.data.due_on).then(a.id.cmp(&b.id)));
        Ok(homework)
    }

    /// Open homework a student still has to hand in.
    pub fn pending_homework(
        &self,
        student_id: RecordId,
        today: NaiveDate,
    ) -> Result<Vec<Record<Homework>>, SchoolError> {
        let student = self.get::<Student>(student_id)?;
        let Some(class_id) = student.data.class_id else {
            return Ok(Vec::new());
        };
        let done: BTreeSet<RecordId> = self
            .list_where::<Submission>(|s| s.student_id == student_id)?
            .into_iter()
            .map(|s| s.data.homework_id)
            .collect();
        let mut pending =
            self.list_where::<Homework>(|h| h.class_id == class_id && h.due_on >= today)?;
        pending.retain(|h| !done.contains(&h.id));
        pending.sort_by(|a, b| a.data.due_on.cmp(&b.data.due_on).then(a.id.cmp(&b.id)));
        Ok(pending)
    }

    /// Submissions of an assignment and the active roster students missing.
    pub fn homework_status(&self, homework_id: RecordId) -> Result<HomeworkStatus, SchoolError> {
        let homework = self.get::<Homework>(homework_id)?;
        let due_on = homework.data.due_on;

        let submitted: Vec<SubmissionEntry> = self
            .list_where::<Submission>(|s| s.homework_id == homework_id)?
            .into_iter()
            .map(|submission| SubmissionEntry {
                late: submission.data.submitted_on > due_on,
                submission,
            })
            .collect();
        let handed_in: BTreeSet<RecordId> = submitted
            .iter()
            .map(|e| e.submission.data.student_id)
            .collect();

        let mut roster = self.active_roster(homework.data.class_id)?;
        roster.retain(|s| !handed_in.contains(&s.id));
        sort_by_name(&mut roster);
        let missing = roster
            .into_iter()
            .map(|s| MissingSubmission {
                student_id: s.id,
                student_name: s.data.full_name(),
            })
            .collect();

        let late_count = submitted.iter().filter(|e| e.late).count();
        Ok(HomeworkStatus {
            homework,
            submitted,
            missing,
            late_count: u32::try_from(late_count).unwrap_or(u32::MAX),
        })
    }
}
