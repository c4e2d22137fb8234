//! Students, guardians and employees.

use super::{check_length, fold, require_text};
use crate::primitives::{MAX_NAME_LENGTH, MAX_TITLE_LENGTH};
use crate::{Collection, Document, RecordId, Reference, SchoolError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    Other,
}

/// Contact person responsible for a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardian {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An enrolled (or formerly enrolled) student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// School-issued admission number, unique across students.
    pub admission_no: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    /// Current class; `None` for students not yet placed.
    #[serde(default)]
    pub class_id: Option<RecordId>,
    pub guardian: Guardian,
    pub enrolled_on: NaiveDate,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Student {
    /// "First Last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Document for Student {
    const COLLECTION: Collection = Collection::Students;

    fn validate(&self) -> Result<(), SchoolError> {
        require_text("admission_no", &self.admission_no, MAX_NAME_LENGTH)?;
        require_text("first_name", &self.first_name, MAX_NAME_LENGTH)?;
        require_text("last_name", &self.last_name, MAX_NAME_LENGTH)?;
        require_text("guardian.name", &self.guardian.name, MAX_NAME_LENGTH)?;
        require_text("guardian.phone", &self.guardian.phone, MAX_NAME_LENGTH)?;
        if let Some(email) = &self.guardian.email {
            validate_email("guardian.email", email)?;
        }
        if let Some(born) = self.date_of_birth {
            if born >= self.enrolled_on {
                return Err(SchoolError::Validation(
                    "date_of_birth must be before enrolled_on".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        self.class_id
            .map(|id| Reference::new(Collection::Classes, id))
            .into_iter()
            .collect()
    }

    fn unique_key(&self) -> Option<String> {
        Some(fold(&self.admission_no))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeRole {
    Teacher,
    Administrator,
    Accountant,
    Support,
}

impl EmployeeRole {
    pub const ALL: [EmployeeRole; 4] = [
        Self::Teacher,
        Self::Administrator,
        Self::Accountant,
        Self::Support,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Administrator => "administrator",
            Self::Accountant => "accountant",
            Self::Support => "support",
        }
    }
}

/// A member of staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Payroll number, unique across employees.
    pub employee_no: String,
    pub first_name: String,
    pub last_name: String,
    pub role: EmployeeRole,
    pub email: String,
    pub phone: String,
    pub joined_on: NaiveDate,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Employee {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Document for Employee {
    const COLLECTION: Collection = Collection::Employees;

    fn validate(&self) -> Result<(), SchoolError> {
        require_text("employee_no", &self.employee_no, MAX_NAME_LENGTH)?;
        require_text("first_name", &self.first_name, MAX_NAME_LENGTH)?;
        require_text("last_name", &self.last_name, MAX_NAME_LENGTH)?;
        require_text("phone", &self.phone, MAX_NAME_LENGTH)?;
        validate_email("email", &self.email)
    }

    fn unique_key(&self) -> Option<String> {
        Some(fold(&self.employee_no))
    }
}

fn validate_email(field: &str, email: &str) -> Result<(), SchoolError> {
    check_length(field, email, MAX_TITLE_LENGTH)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(SchoolError::Validation(format!(
            "{} '{}' is not an email address",
            field, email
        ))),
    }
}

const fn default_active() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn student() -> Student {
        Student {
            admission_no: "A-001".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            gender: Gender::Female,
            date_of_birth: Some(date(2012, 12, 10)),
            class_id: Some(RecordId(1)),
            guardian: Guardian {
                name: "Anne".to_string(),
                phone: "555-0100".to_string(),
                email: Some("anne@example.org".to_string()),
            },
            enrolled_on: date(2020, 9, 1),
            active: true,
        }
    }

    #[test]
    fn valid_student_passes() {
        assert!(student().validate().is_ok());
        assert_eq!(student().full_name(), "Ada Lovelace");
    }

    #[test]
    fn birth_after_enrollment_rejected() {
        let mut s = student();
        s.date_of_birth = Some(date(2021, 1, 1));
        assert!(matches!(s.validate(), Err(SchoolError::Validation(_))));
    }

    #[test]
    fn bad_guardian_email_rejected() {
        let mut s = student();
        s.guardian.email = Some("anne-at-example".to_string());
        assert!(s.validate().is_err());
    }

    #[test]
    fn student_references_its_class() {
        let refs = student().references();
        assert_eq!(refs, vec![Reference::new(Collection::Classes, RecordId(1))]);

        let mut unplaced = student();
        unplaced.class_id = None;
        assert!(unplaced.references().is_empty());
    }

    #[test]
    fn admission_number_key_is_case_insensitive() {
        let mut other = student();
        other.admission_no = " a-001".to_string();
        assert_eq!(student().unique_key(), other.unique_key());
    }

    #[test]
    fn active_defaults_to_true_in_json() {
        let json = r#"{
            "employee_no": "E-7", "first_name": "Grace", "last_name": "Hopper",
            "role": "teacher", "email": "grace@example.org", "phone": "555",
            "joined_on": "2019-08-15"
        }"#;
        let employee: Employee = serde_json::from_str(json).unwrap();
        assert!(employee.active);
        assert_eq!(employee.role, EmployeeRole::Teacher);
    }
}
