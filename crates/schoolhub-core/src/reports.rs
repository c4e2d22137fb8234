//! # Reports Module
//!
//! Read-only aggregates for the dashboard and admin screens.

use crate::attendance::AttendanceTally;
use crate::billing::FeeSummary;
use crate::model::{Employee, EmployeeRole, Exam, Notification, SchoolClass, Student};
use crate::{Collection, RecordId, School, SchoolError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Headline numbers for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub today: NaiveDate,
    pub students: usize,
    pub active_students: usize,
    pub employees: usize,
    pub active_employees: usize,
    pub classes: usize,
    pub attendance_today: AttendanceTally,
    pub fees: FeeSummary,
    /// Notifications stored but not sent yet.
    pub pending_notifications: usize,
    /// Exams held today or later.
    pub upcoming_exams: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStrengthRow {
    pub class_id: RecordId,
    pub label: String,
    pub academic_year: String,
    pub students: usize,
    pub active_students: usize,
}

/// Head count per class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStrength {
    pub classes: Vec<ClassStrengthRow>,
    /// Students with no class assigned.
    pub unassigned: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRow {
    pub role: EmployeeRole,
    pub employees: usize,
    pub active: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionCount {
    pub collection: Collection,
    pub records: usize,
}

/// Record counts of the underlying store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetrics {
    pub persistent: bool,
    pub total_records: usize,
    pub collections: Vec<CollectionCount>,
}

impl School {
    pub fn dashboard(&self, today: NaiveDate) -> Result<Dashboard, SchoolError> {
        let students = self.list::<Student>()?;
        let employees = self.list::<Employee>()?;
        Ok(Dashboard {
            today,
            students: students.len(),
            active_students: students.iter().filter(|s| s.data.active).count(),
            employees: employees.len(),
            active_employees: employees.iter().filter(|e| e.data.active).count(),
            classes: self.count(Collection::Classes)?,
            attendance_today: self.attendance_on(today)?,
            fees: self.fee_summary(today, None)?,
            pending_notifications: self
                .list_where::<Notification>(|n| n.sent_at.is_none())?
                .len(),
            upcoming_exams: self.list_where::<Exam>(|e| e.held_on >= today)?.len(),
        })
    }

    /// Students per class in class id order.
    pub fn class_strength(&self) -> Result<ClassStrength, SchoolError> {
        let mut counts: BTreeMap<RecordId, (usize, usize)> = BTreeMap::new();
        let mut unassigned = 0;
        for student in self.list::<Student>()? {
            match student.data.class_id {
                Some(class_id) => {
                    let entry = counts.entry(class_id).or_default();
                    entry.0 += 1;
                    if student.data.active {
                        entry.1 += 1;
                    }
                }
                None => unassigned += 1,
            }
        }

        let classes = self
            .list::<SchoolClass>()?
            .into_iter()
            .map(|class| {
                let (students, active_students) = counts.get(&class.id).copied().unwrap_or((0, 0));
                ClassStrengthRow {
                    class_id: class.id,
                    label: class.data.label(),
                    academic_year: class.data.academic_year,
                    students,
                    active_students,
                }
            })
            .collect();
        Ok(ClassStrength {
            classes,
            unassigned,
        })
    }

    /// Employee counts for every role, including empty ones.
    pub fn staff_breakdown(&self) -> Result<Vec<StaffRow>, SchoolError> {
        let employees = self.list::<Employee>()?;
        Ok(EmployeeRole::ALL
            .iter()
            .map(|&role| {
                let holders = employees.iter().filter(|e| e.data.role == role);
                StaffRow {
                    role,
                    employees: holders.clone().count(),
                    active: holders.filter(|e| e.data.active).count(),
                }
            })
            .collect())
    }

    pub fn store_metrics(&self) -> Result<StoreMetrics, SchoolError> {
        let mut collections = Vec::with_capacity(Collection::ALL.len());
        let mut total_records = 0usize;
        for collection in Collection::ALL {
            let records = self.count(collection)?;
            total_records = total_records.saturating_add(records);
            collections.push(CollectionCount {
                collection,
                records,
            });
        }
        Ok(StoreMetrics {
            persistent: self.is_persistent(),
            total_records,
            collections,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Gender, Guardian};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn student(no: &str, class_id: Option<RecordId>, active: bool) -> Student {
        Student {
            admission_no: no.to_string(),
            first_name: "Ari".to_string(),
            last_name: no.to_string(),
            gender: Gender::Male,
            date_of_birth: None,
            class_id,
            guardian: Guardian {
                name: "G".to_string(),
                phone: "1".to_string(),
                email: None,
            },
            enrolled_on: date(1, 1),
            active,
        }
    }

    #[test]
    fn class_strength_counts_unassigned() {
        let mut school = School::new();
        let c = school
            .insert(SchoolClass {
                name: "Grade 1".to_string(),
                section: "A".to_string(),
                academic_year: "2025-2026".to_string(),
                class_teacher_id: None,
            })
            .unwrap();
        school.insert(student("R1", Some(c.id), true)).unwrap();
        school.insert(student("R2", Some(c.id), false)).unwrap();
        school.insert(student("R3", None, true)).unwrap();

        let strength = school.class_strength().unwrap();
        assert_eq!(strength.unassigned, 1);
        assert_eq!(strength.classes.len(), 1);
        assert_eq!(strength.classes[0].label, "Grade 1 A");
        assert_eq!(strength.classes[0].students, 2);
        assert_eq!(strength.classes[0].active_students, 1);
    }

    #[test]
    fn staff_breakdown_lists_every_role() {
        let school = School::new();
        let rows = school.staff_breakdown().unwrap();
        assert_eq!(rows.len(), EmployeeRole::ALL.len());
        assert!(rows.iter().all(|r| r.employees == 0));
    }

    #[test]
    fn dashboard_and_metrics_on_small_school() {
        let mut school = School::new();
        school.insert(student("R1", None, true)).unwrap();
        school.insert(student("R2", None, false)).unwrap();

        let dash = school.dashboard(date(10, 1)).unwrap();
        assert_eq!(dash.students, 2);
        assert_eq!(dash.active_students, 1);
        assert_eq!(dash.attendance_today.total(), 0);
        assert_eq!(dash.fees.invoice_count, 0);

        let metrics = school.store_metrics().unwrap();
        assert!(!metrics.persistent);
        assert_eq!(metrics.total_records, 2);
        assert_eq!(metrics.collections.len(), Collection::ALL.len());
    }
}
