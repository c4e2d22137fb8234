//! Classes: a grade and section within an academic year.

use super::{fold, require_text};
use crate::primitives::MAX_NAME_LENGTH;
use crate::{Collection, Document, RecordId, Reference, SchoolError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolClass {
    /// Grade name, e.g. "Grade 5".
    pub name: String,
    /// Section within the grade, e.g. "A".
    pub section: String,
    /// Academic year label, e.g. "2025-2026".
    pub academic_year: String,
    #[serde(default)]
    pub class_teacher_id: Option<RecordId>,
}

impl SchoolClass {
    /// "Grade 5 A".
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.name, self.section)
    }
}

impl Document for SchoolClass {
    const COLLECTION: Collection = Collection::Classes;

    fn validate(&self) -> Result<(), SchoolError> {
        require_text("name", &self.name, MAX_NAME_LENGTH)?;
        require_text("section", &self.section, MAX_NAME_LENGTH)?;
        require_text("academic_year", &self.academic_year, MAX_NAME_LENGTH)
    }

    fn references(&self) -> Vec<Reference> {
        self.class_teacher_id
            .map(|id| Reference::new(Collection::Employees, id))
            .into_iter()
            .collect()
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!(
            "{}|{}|{}",
            fold(&self.name),
            fold(&self.section),
            fold(&self.academic_year)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_key_combines_all_three_parts() {
        let a = SchoolClass {
            name: "Grade 5".to_string(),
            section: "A".to_string(),
            academic_year: "2025-2026".to_string(),
            class_teacher_id: None,
        };
        let mut b = a.clone();
        b.section = "B".to_string();
        assert_ne!(a.unique_key(), b.unique_key());

        let mut c = a.clone();
        c.name = "grade 5 ".to_string();
        assert_eq!(a.unique_key(), c.unique_key());
        assert_eq!(a.label(), "Grade 5 A");
    }

    #[test]
    fn blank_section_rejected() {
        let class = SchoolClass {
            name: "Grade 1".to_string(),
            section: " ".to_string(),
            academic_year: "2025".to_string(),
            class_teacher_id: Some(RecordId(2)),
        };
        assert!(class.validate().is_err());
        assert_eq!(class.references().len(), 1);
    }
}
