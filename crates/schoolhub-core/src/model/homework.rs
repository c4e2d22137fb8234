//! Homework assignments and student submissions.

use super::{check_length, require_text};
use crate::primitives::{MAX_BODY_LENGTH, MAX_NAME_LENGTH, MAX_TITLE_LENGTH};
use crate::{Collection, Document, RecordId, Reference, SchoolError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Homework {
    pub class_id: RecordId,
    pub subject: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assigned_by: Option<RecordId>,
    pub assigned_on: NaiveDate,
    pub due_on: NaiveDate,
}

impl Document for Homework {
    const COLLECTION: Collection = Collection::Homework;

    fn validate(&self) -> Result<(), SchoolError> {
        require_text("subject", &self.subject, MAX_NAME_LENGTH)?;
        require_text("title", &self.title, MAX_TITLE_LENGTH)?;
        check_length("description", &self.description, MAX_BODY_LENGTH)?;
        if self.due_on < self.assigned_on {
            return Err(SchoolError::Validation(
                "due_on must not be before assigned_on".to_string(),
            ));
        }
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![Reference::new(Collection::Classes, self.class_id)];
        if let Some(teacher) = self.assigned_by {
            refs.push(Reference::new(Collection::Employees, teacher));
        }
        refs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub homework_id: RecordId,
    pub student_id: RecordId,
    pub submitted_on: NaiveDate,
    pub content: String,
    #[serde(default)]
    pub grade: Option<String>,
}

impl Document for Submission {
    const COLLECTION: Collection = Collection::Submissions;

    fn validate(&self) -> Result<(), SchoolError> {
        require_text("content", &self.content, MAX_BODY_LENGTH)?;
        if let Some(grade) = &self.grade {
            check_length("grade", grade, MAX_NAME_LENGTH)?;
        }
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        vec![
            Reference::new(Collection::Homework, self.homework_id),
            Reference::new(Collection::Students, self.student_id),
        ]
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!("{}|{}", self.homework_id, self.student_id))
    }
}
