//! # Grading Module
//!
//! Exam results, per-exam statistics, class rankings and report cards.
//!
//! Percentages are basis points of `max_marks`; averages are hundredths of
//! a mark. Nothing here uses floating point.

use crate::model::{Exam, ExamResult, Grade, Student};
use crate::primitives::ratio_bp;
use crate::{Record, RecordId, School, SchoolError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Aggregate marks of one exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamStatistics {
    pub exam_id: RecordId,
    pub candidates: u32,
    /// Mean mark times 100, rounded down. Zero without candidates.
    pub average_hundredths: u64,
    pub highest: Option<u32>,
    pub lowest: Option<u32>,
    pub passed: u32,
    pub failed: u32,
    pub pass_rate_bp: u32,
}

/// One line of an exam ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedResult {
    /// Competition rank: equal marks share a rank and the next rank skips.
    pub rank: u32,
    pub result_id: RecordId,
    pub student_id: RecordId,
    pub student_name: String,
    pub marks: u32,
    pub percentage_bp: u32,
    pub grade: Grade,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCardEntry {
    pub exam_id: RecordId,
    pub exam_name: String,
    pub subject: String,
    pub held_on: NaiveDate,
    pub marks: u32,
    pub max_marks: u32,
    pub percentage_bp: u32,
    pub grade: Grade,
    pub passed: bool,
}

/// Every result of one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCard {
    pub student_id: RecordId,
    pub student_name: String,
    pub class_id: Option<RecordId>,
    pub entries: Vec<ReportCardEntry>,
    pub total_marks: u64,
    pub total_max_marks: u64,
    pub overall_percentage_bp: u32,
    pub overall_grade: Option<Grade>,
}

impl School {
    /// Record (or correct) a student's mark for an exam.
    pub fn record_result(
        &mut self,
        exam_id: RecordId,
        student_id: RecordId,
        marks: u32,
        remark: Option<String>,
    ) -> Result<Record<ExamResult>, SchoolError> {
        let exam = self.get::<Exam>(exam_id)?;
        let student = self.get::<Student>(student_id)?;
        if student.data.class_id != Some(exam.data.class_id) {
            return Err(SchoolError::Validation(format!(
                "student {} is not in class {} of exam {}",
                student_id, exam.data.class_id, exam_id
            )));
        }
        if marks > exam.data.max_marks {
            return Err(SchoolError::Validation(format!(
                "marks {} exceed maximum {}",
                marks, exam.data.max_marks
            )));
        }

        let result = ExamResult {
            exam_id,
            student_id,
            marks,
            remark,
        };
        let existing = self
            .list_where::<ExamResult>(|r| r.exam_id == exam_id && r.student_id == student_id)?
            .into_iter()
            .next();
        match existing {
            Some(previous) => self.replace(previous.id, result),
            None => self.insert(result),
        }
    }

    /// Replace an exam, keeping its recorded results valid.
    ///
    /// `max_marks` may not drop below the best recorded mark, and an exam
    /// with results stays with its class.
    pub fn revise_exam(&mut self, id: RecordId, exam: Exam) -> Result<Record<Exam>, SchoolError> {
        let current = self.get::<Exam>(id)?;
        let results = self.list_where::<ExamResult>(|r| r.exam_id == id)?;
        if let Some(best) = results.iter().map(|r| r.data.marks).max() {
            if exam.max_marks < best {
                return Err(SchoolError::Validation(format!(
                    "max_marks {} is below the recorded mark {}",
                    exam.max_marks, best
                )));
            }
            if exam.class_id != current.data.class_id {
                return Err(SchoolError::Conflict(format!(
                    "exam {} has results and cannot move to another class",
                    id
                )));
            }
        }
        self.replace(id, exam)
    }

    /// Count, mean, extremes and pass rate of an exam.
    pub fn exam_statistics(&self, exam_id: RecordId) -> Result<ExamStatistics, SchoolError> {
        let exam = self.get::<Exam>(exam_id)?;
        let results = self.list_where::<ExamResult>(|r| r.exam_id == exam_id)?;

        let mut stats = ExamStatistics {
            exam_id,
            candidates: 0,
            average_hundredths: 0,
            highest: None,
            lowest: None,
            passed: 0,
            failed: 0,
            pass_rate_bp: 0,
        };
        let mut total: u64 = 0;
        for result in &results {
            let marks = result.data.marks;
            stats.candidates = stats.candidates.saturating_add(1);
            total = total.saturating_add(u64::from(marks));
            stats.highest = Some(stats.highest.map_or(marks, |h| h.max(marks)));
            stats.lowest = Some(stats.lowest.map_or(marks, |l| l.min(marks)));
            if marks >= exam.data.pass_marks {
                stats.passed = stats.passed.saturating_add(1);
            } else {
                stats.failed = stats.failed.saturating_add(1);
            }
        }
        if stats.candidates > 0 {
            stats.average_hundredths = total.saturating_mul(100) / u64::from(stats.candidates);
        }
        stats.pass_rate_bp = ratio_bp(u64::from(stats.passed), u64::from(stats.candidates));
        Ok(stats)
    }

    /// Results of an exam, best first.
    pub fn exam_ranking(&self, exam_id: RecordId) -> Result<Vec<RankedResult>, SchoolError> {
        let exam = self.get::<Exam>(exam_id)?;
        let mut results = self.list_where::<ExamResult>(|r| r.exam_id == exam_id)?;
        results.sort_by(|a, b| {
            b.data
                .marks
                .cmp(&a.data.marks)
                .then(a.data.student_id.cmp(&b.data.student_id))
        });

        let mut ranked = Vec::with_capacity(results.len());
        let mut rank = 0u32;
        let mut previous: Option<u32> = None;
        for (position, result) in results.into_iter().enumerate() {
            if previous != Some(result.data.marks) {
                rank = u32::try_from(position)
                    .unwrap_or(u32::MAX)
                    .saturating_add(1);
                previous = Some(result.data.marks);
            }
            let student = self.get::<Student>(result.data.student_id)?;
            let percentage_bp =
                ratio_bp(u64::from(result.data.marks), u64::from(exam.data.max_marks));
            ranked.push(RankedResult {
                rank,
                result_id: result.id,
                student_id: result.data.student_id,
                student_name: student.data.full_name(),
                marks: result.data.marks,
                percentage_bp,
                grade: Grade::from_basis_points(percentage_bp),
            });
        }
        Ok(ranked)
    }

    /// A student's results ordered by exam date, with overall totals.
    pub fn report_card(&self, student_id: RecordId) -> Result<ReportCard, SchoolError> {
        let student = self.get::<Student>(student_id)?;
        let mut entries = Vec::new();
        let mut total_marks: u64 = 0;
        let mut total_max: u64 = 0;

        for result in self.list_where::<ExamResult>(|r| r.student_id == student_id)? {
            let exam = self.get::<Exam>(result.data.exam_id)?;
            let percentage_bp =
                ratio_bp(u64::from(result.data.marks), u64::from(exam.data.max_marks));
            total_marks = total_marks.saturating_add(u64::from(result.data.marks));
            total_max = total_max.saturating_add(u64::from(exam.data.max_marks));
            entries.push(ReportCardEntry {
                exam_id: exam.id,
                exam_name: exam.data.name,
                subject: exam.data.subject,
                held_on: exam.data.held_on,
                marks: result.data.marks,
                max_marks: exam.data.max_marks,
                percentage_bp,
                grade: Grade::from_basis_points(percentage_bp),
                passed: result.data.marks >= exam.data.pass_marks,
            });
        }
        entries.sort_by(|a, b| a.held_on.cmp(&b.held_on).then(a.exam_id.cmp(&b.exam_id)));

        let overall_percentage_bp = ratio_bp(total_marks, total_max);
        Ok(ReportCard {
            student_id,
            student_name: student.data.full_name(),
            class_id: student.data.class_id,
            overall_grade: (!entries.is_empty())
                .then(|| Grade::from_basis_points(overall_percentage_bp)),
            entries,
            total_marks,
            total_max_marks: total_max,
            overall_percentage_bp,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Gender, Guardian, SchoolClass};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn setup(n: usize) -> (School, RecordId, Vec<RecordId>) {
        let mut school = School::new();
        let class_id = school
            .insert(SchoolClass {
                name: "Grade 8".to_string(),
                section: "C".to_string(),
                academic_year: "2025-2026".to_string(),
                class_teacher_id: None,
            })
            .unwrap()
            .id;
        let students = (0..n)
            .map(|i| {
                school
                    .insert(Student {
                        admission_no: format!("G{}", i),
                        first_name: format!("Kid{}", i),
                        last_name: "Test".to_string(),
                        gender: Gender::Male,
                        date_of_birth: None,
                        class_id: Some(class_id),
                        guardian: Guardian {
                            name: "G".to_string(),
                            phone: "1".to_string(),
                            email: None,
                        },
                        enrolled_on: date(1, 1),
                        active: true,
                    })
                    .unwrap()
                    .id
            })
            .collect();
        (school, class_id, students)
    }

    fn exam(school: &mut School, class_id: RecordId, name: &str, held_on: NaiveDate) -> RecordId {
        school
            .insert(Exam {
                name: name.to_string(),
                class_id,
                subject: "Maths".to_string(),
                held_on,
                max_marks: 50,
                pass_marks: 20,
            })
            .unwrap()
            .id
    }

    #[test]
    fn ranking_shares_ranks_on_ties() {
        let (mut school, class_id, s) = setup(4);
        let e = exam(&mut school, class_id, "Quiz", date(10, 1));
        school.record_result(e, s[0], 40, None).unwrap();
        school.record_result(e, s[1], 45, None).unwrap();
        school.record_result(e, s[2], 40, None).unwrap();
        school.record_result(e, s[3], 10, None).unwrap();

        let ranks: Vec<(u32, u32)> = school
            .exam_ranking(e)
            .unwrap()
            .iter()
            .map(|r| (r.rank, r.marks))
            .collect();
        assert_eq!(ranks, vec![(1, 45), (2, 40), (2, 40), (4, 10)]);
    }

    #[test]
    fn statistics_use_integer_average() {
        let (mut school, class_id, s) = setup(3);
        let e = exam(&mut school, class_id, "Quiz", date(10, 1));
        school.record_result(e, s[0], 10, None).unwrap();
        school.record_result(e, s[1], 20, None).unwrap();
        school.record_result(e, s[2], 21, None).unwrap();

        let stats = school.exam_statistics(e).unwrap();
        assert_eq!(stats.candidates, 3);
        assert_eq!(stats.average_hundredths, 1_700);
        assert_eq!(stats.highest, Some(21));
        assert_eq!(stats.lowest, Some(10));
        assert_eq!(stats.passed, 2);
        assert_eq!(stats.pass_rate_bp, 6_666);
    }

    #[test]
    fn empty_exam_statistics() {
        let (mut school, class_id, _) = setup(0);
        let e = exam(&mut school, class_id, "Quiz", date(10, 1));
        let stats = school.exam_statistics(e).unwrap();
        assert_eq!(stats.candidates, 0);
        assert_eq!(stats.highest, None);
        assert_eq!(stats.pass_rate_bp, 0);
    }

    #[test]
    fn recording_twice_corrects_the_mark() {
        let (mut school, class_id, s) = setup(1);
        let e = exam(&mut school, class_id, "Quiz", date(10, 1));
        let first = school.record_result(e, s[0], 12, None).unwrap();
        let second = school
            .record_result(e, s[0], 30, Some("re-marked".to_string()))
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(school.count(crate::Collection::ExamResults).unwrap(), 1);
    }

    #[test]
    fn marks_above_max_rejected() {
        let (mut school, class_id, s) = setup(1);
        let e = exam(&mut school, class_id, "Quiz", date(10, 1));
        assert!(school.record_result(e, s[0], 51, None).is_err());
    }

    #[test]
    fn revising_exam_keeps_results_within_max() {
        let (mut school, class_id, s) = setup(1);
        let e = exam(&mut school, class_id, "Quiz", date(10, 1));
        school.record_result(e, s[0], 45, None).unwrap();

        let mut lowered = school.get::<Exam>(e).unwrap().data;
        lowered.max_marks = 40;
        lowered.pass_marks = 20;
        assert!(matches!(
            school.revise_exam(e, lowered.clone()),
            Err(SchoolError::Validation(_))
        ));
        assert_eq!(school.get::<Exam>(e).unwrap().data.max_marks, 50);

        lowered.max_marks = 45;
        let revised = school.revise_exam(e, lowered).unwrap();
        assert_eq!(revised.data.max_marks, 45);
        assert_eq!(school.exam_ranking(e).unwrap()[0].percentage_bp, 10_000);
    }

    #[test]
    fn exam_with_results_stays_in_its_class() {
        let (mut school, class_id, s) = setup(1);
        let other = school
            .insert(SchoolClass {
                name: "Grade 4".to_string(),
                section: "B".to_string(),
                academic_year: "2025-2026".to_string(),
                class_teacher_id: None,
            })
            .unwrap()
            .id;
        let e = exam(&mut school, class_id, "Quiz", date(10, 1));

        let mut moved = school.get::<Exam>(e).unwrap().data;
        moved.class_id = other;
        // No results yet: free to move.
        school.revise_exam(e, moved.clone()).unwrap();
        moved.class_id = class_id;
        school.revise_exam(e, moved.clone()).unwrap();

        school.record_result(e, s[0], 30, None).unwrap();
        moved.class_id = other;
        assert!(matches!(
            school.revise_exam(e, moved),
            Err(SchoolError::Conflict(_))
        ));
        assert_eq!(school.get::<Exam>(e).unwrap().data.class_id, class_id);
    }

    #[test]
    fn report_card_orders_by_date_and_totals() {
        let (mut school, class_id, s) = setup(1);
        let later = exam(&mut school, class_id, "Final", date(12, 1));
        let earlier = exam(&mut school, class_id, "Midterm", date(10, 1));
        school.record_result(later, s[0], 45, None).unwrap();
        school.record_result(earlier, s[0], 30, None).unwrap();

        let card = school.report_card(s[0]).unwrap();
        let names: Vec<&str> = card.entries.iter().map(|e| e.exam_name.as_str()).collect();
        assert_eq!(names, vec!["Midterm", "Final"]);
        assert_eq!(card.total_marks, 75);
        assert_eq!(card.total_max_marks, 100);
        assert_eq!(card.overall_percentage_bp, 7_500);
        assert_eq!(card.overall_grade, Some(Grade::B));
    }
}
