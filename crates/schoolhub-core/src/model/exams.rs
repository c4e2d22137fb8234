//! Exams, per-student results and letter grades.

use super::{check_length, require_text};
use crate::primitives::{MAX_NAME_LENGTH, MAX_TITLE_LENGTH};
use crate::{Collection, Document, RecordId, Reference, SchoolError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    pub name: String,
    pub class_id: RecordId,
    pub subject: String,
    pub held_on: NaiveDate,
    pub max_marks: u32,
    pub pass_marks: u32,
}

impl Document for Exam {
    const COLLECTION: Collection = Collection::Exams;

    fn validate(&self) -> Result<(), SchoolError> {
        require_text("name", &self.name, MAX_TITLE_LENGTH)?;
        require_text("subject", &self.subject, MAX_NAME_LENGTH)?;
        if self.max_marks == 0 {
            return Err(SchoolError::Validation(
                "max_marks must be positive".to_string(),
            ));
        }
        if self.pass_marks > self.max_marks {
            return Err(SchoolError::Validation(format!(
                "pass_marks {} exceeds max_marks {}",
                self.pass_marks, self.max_marks
            )));
        }
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference::new(Collection::Classes, self.class_id)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamResult {
    pub exam_id: RecordId,
    pub student_id: RecordId,
    pub marks: u32,
    #[serde(default)]
    pub remark: Option<String>,
}

impl Document for ExamResult {
    const COLLECTION: Collection = Collection::ExamResults;

    fn validate(&self) -> Result<(), SchoolError> {
        if let Some(remark) = &self.remark {
            check_length("remark", remark, MAX_TITLE_LENGTH)?;
        }
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        vec![
            Reference::new(Collection::Exams, self.exam_id),
            Reference::new(Collection::Students, self.student_id),
        ]
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!("{}|{}", self.exam_id, self.student_id))
    }
}

// =============================================================================
// GRADES
// =============================================================================

/// Letter grade derived from a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    E,
    F,
}

/// Lower bound (inclusive, basis points) of each grade, best first.
const GRADE_BANDS: [(u32, Grade); 6] = [
    (9_000, Grade::APlus),
    (8_000, Grade::A),
    (7_000, Grade::B),
    (6_000, Grade::C),
    (5_000, Grade::D),
    (4_000, Grade::E),
];

impl Grade {
    /// Grade for a percentage in basis points.
    #[must_use]
    pub fn from_basis_points(bp: u32) -> Self {
        GRADE_BANDS
            .iter()
            .find(|(floor, _)| bp >= *floor)
            .map(|(_, grade)| *grade)
            .unwrap_or(Self::F)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_band_edges() {
        assert_eq!(Grade::from_basis_points(10_000), Grade::APlus);
        assert_eq!(Grade::from_basis_points(9_000), Grade::APlus);
        assert_eq!(Grade::from_basis_points(8_999), Grade::A);
        assert_eq!(Grade::from_basis_points(5_000), Grade::D);
        assert_eq!(Grade::from_basis_points(4_000), Grade::E);
        assert_eq!(Grade::from_basis_points(3_999), Grade::F);
        assert_eq!(Grade::from_basis_points(0), Grade::F);
    }

    #[test]
    fn pass_marks_above_max_rejected() {
        let exam = Exam {
            name: "Midterm".to_string(),
            class_id: RecordId(1),
            subject: "Maths".to_string(),
            held_on: chrono::NaiveDate::default(),
            max_marks: 50,
            pass_marks: 60,
        };
        assert!(exam.validate().is_err());
    }

    #[test]
    fn grade_display_uses_plus_sign() {
        assert_eq!(Grade::APlus.to_string(), "A+");
    }
}
