//! # Roster Module
//!
//! Student and staff lookups, class rosters and promotions.

use crate::model::{Employee, EmployeeRole, SchoolClass, Student, fold};
use crate::primitives::MAX_PROMOTION_BATCH;
use crate::school::encode;
use crate::storage::WriteBatch;
use crate::{Document, Record, RecordId, School, SchoolError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Filters for `School::search_students`. Empty filter matches everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentFilter {
    #[serde(default)]
    pub class_id: Option<RecordId>,
    /// Case-insensitive substring of first name, last name or admission no.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl StudentFilter {
    fn matches(&self, student: &Student, needle: Option<&str>) -> bool {
        if self.class_id.is_some() && student.class_id != self.class_id {
            return false;
        }
        if self.active.is_some_and(|active| student.active != active) {
            return false;
        }
        match needle {
            Some(needle) => [
                &student.first_name,
                &student.last_name,
                &student.admission_no,
            ]
            .iter()
            .any(|field| fold(field).contains(needle)),
            None => true,
        }
    }
}

/// Outcome of a promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub from_class: RecordId,
    pub to_class: RecordId,
    pub moved: Vec<RecordId>,
}

/// Roster order: last name, first name, id.
pub(crate) fn sort_by_name(students: &mut [Record<Student>]) {
    students.sort_by(|a, b| {
        (fold(&a.data.last_name), fold(&a.data.first_name), a.id).cmp(&(
            fold(&b.data.last_name),
            fold(&b.data.first_name),
            b.id,
        ))
    });
}

impl School {
    /// Students matching a filter, in id order.
    pub fn search_students(
        &self,
        filter: &StudentFilter,
    ) -> Result<Vec<Record<Student>>, SchoolError> {
        let needle = filter
            .query
            .as_deref()
            .map(fold)
            .filter(|q| !q.is_empty());
        self.list_where::<Student>(|s| filter.matches(s, needle.as_deref()))
    }

    /// Students of a class, sorted by name.
    pub fn class_roster(&self, class_id: RecordId) -> Result<Vec<Record<Student>>, SchoolError> {
        self.get::<SchoolClass>(class_id)?;
        let mut students = self.list_where::<Student>(|s| s.class_id == Some(class_id))?;
        sort_by_name(&mut students);
        Ok(students)
    }

    /// Active students of a class, sorted by name.
    pub(crate) fn active_roster(
        &self,
        class_id: RecordId,
    ) -> Result<Vec<Record<Student>>, SchoolError> {
        let mut roster = self.class_roster(class_id)?;
        roster.retain(|s| s.data.active);
        Ok(roster)
    }

    /// Move students from one class to another in a single batch.
    ///
    /// With `only = None` every active student of `from` moves. Otherwise
    /// exactly the listed students move, and each must currently be in
    /// `from`.
    pub fn promote_students(
        &mut self,
        from: RecordId,
        to: RecordId,
        only: Option<&[RecordId]>,
    ) -> Result<Promotion, SchoolError> {
        if from == to {
            return Err(SchoolError::Validation(
                "source and target class must differ".to_string(),
            ));
        }
        self.get::<SchoolClass>(from)?;
        self.get::<SchoolClass>(to)?;

        let movers: Vec<Record<Student>> = match only {
            None => self.list_where::<Student>(|s| s.active && s.class_id == Some(from))?,
            Some(ids) => {
                let unique: BTreeSet<RecordId> = ids.iter().copied().collect();
                if unique.len() != ids.len() {
                    return Err(SchoolError::Validation(
                        "student listed more than once".to_string(),
                    ));
                }
                let mut movers = Vec::with_capacity(unique.len());
                for id in unique {
                    let student = self.get::<Student>(id)?;
                    if student.data.class_id != Some(from) {
                        return Err(SchoolError::Validation(format!(
                            "student {} is not in class {}",
                            id, from
                        )));
                    }
                    movers.push(student);
                }
                movers
            }
        };

        if movers.len() > MAX_PROMOTION_BATCH {
            return Err(SchoolError::Validation(format!(
                "promotion of {} students exceeds maximum {}",
                movers.len(),
                MAX_PROMOTION_BATCH
            )));
        }

        let mut batch = WriteBatch::new();
        let mut moved = Vec::with_capacity(movers.len());
        for mut student in movers {
            student.data.class_id = Some(to);
            batch.put(Student::COLLECTION, student.id, encode(&student.data)?);
            moved.push(student.id);
        }
        self.commit(batch)?;

        Ok(Promotion {
            from_class: from,
            to_class: to,
            moved,
        })
    }

    /// Employees, optionally restricted to one role, in id order.
    pub fn employees_by_role(
        &self,
        role: Option<EmployeeRole>,
    ) -> Result<Vec<Record<Employee>>, SchoolError> {
        self.list_where::<Employee>(|e| role.is_none_or(|r| e.role == r))
    }
}
