//! # Roster Files
//!
//! JSON bulk-load format for `schoolhub load`. Cross references use the
//! human keys an office keeps in spreadsheets instead of record ids:
//! classes name their teacher by `employee_no`, students name their class
//! by label ("Grade 5 A").
//!
//! ```json
//! {
//!   "employees": [{ "employee_no": "E1", "first_name": "Ada", ... }],
//!   "classes":   [{ "name": "Grade 5", "section": "A",
//!                   "academic_year": "2025-2026", "class_teacher": "E1" }],
//!   "students":  [{ "admission_no": "S1", ..., "class": "Grade 5 A" }]
//! }
//! ```

use chrono::NaiveDate;
use schoolhub_core::{
    Employee, Gender, Guardian, Record, RecordId, School, SchoolClass, SchoolError, Student,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RosterFile {
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub classes: Vec<ClassEntry>,
    #[serde(default)]
    pub students: Vec<StudentEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassEntry {
    pub name: String,
    pub section: String,
    pub academic_year: String,
    /// Employee number of the class teacher.
    #[serde(default)]
    pub class_teacher: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudentEntry {
    pub admission_no: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    /// Class label, e.g. "Grade 5 A".
    #[serde(default)]
    pub class: Option<String>,
    /// Narrows `class` when the label exists in several years.
    #[serde(default)]
    pub academic_year: Option<String>,
    pub guardian: Guardian,
    pub enrolled_on: NaiveDate,
    #[serde(default = "yes")]
    pub active: bool,
}

const fn yes() -> bool {
    true
}

/// Records written by one load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub employees: usize,
    pub classes: usize,
    pub students: usize,
}

fn normalize(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn resolve_class(
    classes: &[Record<SchoolClass>],
    label: &str,
    year: Option<&str>,
) -> Result<RecordId, SchoolError> {
    let wanted = normalize(label);
    let matches: Vec<&Record<SchoolClass>> = classes
        .iter()
        .filter(|c| normalize(&c.data.label()) == wanted)
        .filter(|c| year.is_none_or(|y| normalize(&c.data.academic_year) == normalize(y)))
        .collect();
    match matches.as_slice() {
        [only] => Ok(only.id),
        [] => Err(SchoolError::Validation(format!("unknown class '{}'", label))),
        _ => Err(SchoolError::Validation(format!(
            "class '{}' exists in several academic years; add academic_year",
            label
        ))),
    }
}

/// Insert the roster. Each section is committed as one batch, employees
/// first so classes can name their teachers, then classes, then students.
///
/// References may point at records loaded earlier as well as at records
/// in the same file.
pub fn load_roster(school: &mut School, roster: RosterFile) -> Result<LoadSummary, SchoolError> {
    let employees = school.insert_all(roster.employees)?.len();

    let by_number: BTreeMap<String, RecordId> = school
        .list::<Employee>()?
        .into_iter()
        .map(|e| (normalize(&e.data.employee_no), e.id))
        .collect();
    let classes = roster
        .classes
        .into_iter()
        .map(|entry| {
            let class_teacher_id = entry
                .class_teacher
                .map(|no| {
                    by_number.get(&normalize(&no)).copied().ok_or_else(|| {
                        SchoolError::Validation(format!("unknown employee_no '{}'", no))
                    })
                })
                .transpose()?;
            Ok(SchoolClass {
                name: entry.name,
                section: entry.section,
                academic_year: entry.academic_year,
                class_teacher_id,
            })
        })
        .collect::<Result<Vec<_>, SchoolError>>()?;
    let classes = school.insert_all(classes)?.len();

    let known_classes = school.list::<SchoolClass>()?;
    let students = roster
        .students
        .into_iter()
        .map(|entry| {
            let class_id = entry
                .class
                .as_deref()
                .map(|label| resolve_class(&known_classes, label, entry.academic_year.as_deref()))
                .transpose()?;
            Ok(Student {
                admission_no: entry.admission_no,
                first_name: entry.first_name,
                last_name: entry.last_name,
                gender: entry.gender,
                date_of_birth: entry.date_of_birth,
                class_id,
                guardian: entry.guardian,
                enrolled_on: entry.enrolled_on,
                active: entry.active,
            })
        })
        .collect::<Result<Vec<_>, SchoolError>>()?;
    let students = school.insert_all(students)?.len();

    Ok(LoadSummary {
        employees,
        classes,
        students,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use schoolhub_core::Collection;

    const ROSTER: &str = r#"{
        "employees": [{
            "employee_no": "E1", "first_name": "Ada", "last_name": "Byron",
            "role": "teacher", "email": "ada@school.test", "phone": "555",
            "joined_on": "2024-08-01"
        }],
        "classes": [
            {"name": "Grade 5", "section": "A", "academic_year": "2025-2026", "class_teacher": "e1"},
            {"name": "Grade 6", "section": "A", "academic_year": "2025-2026"}
        ],
        "students": [
            {
                "admission_no": "S1", "first_name": "Tom", "last_name": "Hart",
                "gender": "male", "class": "grade 5  a",
                "guardian": {"name": "Ann Hart", "phone": "1"},
                "enrolled_on": "2025-09-01"
            },
            {
                "admission_no": "S2", "first_name": "Eve", "last_name": "Lane",
                "gender": "female",
                "guardian": {"name": "Max Lane", "phone": "2"},
                "enrolled_on": "2025-09-01"
            }
        ]
    }"#;

    #[test]
    fn loads_and_resolves_references() {
        let mut school = School::new();
        let roster: RosterFile = serde_json::from_str(ROSTER).unwrap();
        let summary = load_roster(&mut school, roster).unwrap();
        assert_eq!(
            summary,
            LoadSummary {
                employees: 1,
                classes: 2,
                students: 2
            }
        );

        let class = school.get::<SchoolClass>(RecordId(1)).unwrap();
        assert_eq!(class.data.class_teacher_id, Some(RecordId(1)));
        let tom = school.get::<Student>(RecordId(1)).unwrap();
        assert_eq!(tom.data.class_id, Some(RecordId(1)));
        assert!(tom.data.active);
        let eve = school.get::<Student>(RecordId(2)).unwrap();
        assert_eq!(eve.data.class_id, None);
    }

    #[test]
    fn class_teacher_matches_padded_employee_no() {
        let mut school = School::new();
        let mut roster: RosterFile = serde_json::from_str(ROSTER).unwrap();
        roster.classes[1].class_teacher = Some("  E1 ".to_string());

        load_roster(&mut school, roster).unwrap();
        let class = school.get::<SchoolClass>(RecordId(2)).unwrap();
        assert_eq!(class.data.class_teacher_id, Some(RecordId(1)));
    }

    #[test]
    fn unknown_class_label_writes_no_students() {
        let mut school = School::new();
        let mut roster: RosterFile = serde_json::from_str(ROSTER).unwrap();
        roster.students[1].class = Some("Grade 9 Z".to_string());

        let err = load_roster(&mut school, roster).unwrap_err();
        assert!(matches!(err, SchoolError::Validation(_)));
        assert_eq!(school.count(Collection::Students).unwrap(), 0);
    }

    #[test]
    fn ambiguous_label_needs_a_year() {
        let mut school = School::new();
        let roster: RosterFile = serde_json::from_str(ROSTER).unwrap();
        load_roster(&mut school, roster).unwrap();
        school
            .insert(SchoolClass {
                name: "Grade 5".to_string(),
                section: "A".to_string(),
                academic_year: "2026-2027".to_string(),
                class_teacher_id: None,
            })
            .unwrap();

        let classes = school.list::<SchoolClass>().unwrap();
        assert!(resolve_class(&classes, "Grade 5 A", None).is_err());
        assert_eq!(
            resolve_class(&classes, "Grade 5 A", Some("2026-2027")).unwrap(),
            RecordId(3)
        );
    }

    #[test]
    fn unknown_field_rejected() {
        let result = serde_json::from_str::<RosterFile>(r#"{"teachers": []}"#);
        assert!(result.is_err());
    }
}
