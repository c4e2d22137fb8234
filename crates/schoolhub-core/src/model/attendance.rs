//! Daily attendance marks.

use super::check_length;
use crate::primitives::MAX_TITLE_LENGTH;
use crate::{Collection, Document, RecordId, Reference, SchoolError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    /// Absence with a recorded reason. Not counted against the student.
    Excused,
}

/// One student's mark for one school day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: RecordId,
    pub class_id: RecordId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub marked_by: Option<RecordId>,
}

impl Document for AttendanceRecord {
    const COLLECTION: Collection = Collection::Attendance;

    fn validate(&self) -> Result<(), SchoolError> {
        if let Some(remark) = &self.remark {
            check_length("remark", remark, MAX_TITLE_LENGTH)?;
        }
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![
            Reference::new(Collection::Students, self.student_id),
            Reference::new(Collection::Classes, self.class_id),
        ];
        if let Some(by) = self.marked_by {
            refs.push(Reference::new(Collection::Employees, by));
        }
        refs
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!("{}|{}", self.student_id, self.date))
    }
}
