use std::fmt;

use crate::analytics::{AnalyticsEngine, PASSING_THRESHOLD};
use crate::models::ScoreRecord;

/// Weighted GPA at or above this earns a dean's list spot.
pub const DEANS_LIST_THRESHOLD: f64 = 90.0;

/// Attendance below this flags a student for intervention.
pub const LOW_ATTENDANCE_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskReason {
    LowAttendance,
    FailingGrades,
}

impl fmt::Display for RiskReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskReason::LowAttendance => write!(f, "Low Attendance"),
            RiskReason::FailingGrades => write!(f, "Failing Grades"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HonorEntry {
    pub full_name: String,
    pub student_number: String,
    pub gpa: f64,
}

#[derive(Debug, Clone)]
pub struct RiskEntry {
    pub full_name: String,
    pub student_number: String,
    pub gpa: f64,
    pub attendance: f64,
    pub reasons: Vec<RiskReason>,
}

impl RiskEntry {
    pub fn reasons_label(&self) -> String {
        self.reasons
            .iter()
            .map(RiskReason::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct StandingReview {
    pub deans_list: Vec<HonorEntry>,
    pub at_risk: Vec<RiskEntry>,
}

/// Splits the roster into dean's list and at-risk students. The dean's list
/// is sorted by GPA descending, the at-risk list by GPA ascending so the
/// most urgent cases lead.
pub fn review_standing(records: &[ScoreRecord], engine: &AnalyticsEngine) -> StandingReview {
    let mut review = StandingReview::default();

    for record in records {
        let gpa = engine.weighted_gpa(record.quiz, record.midterm, record.final_exam);

        if gpa >= DEANS_LIST_THRESHOLD {
            review.deans_list.push(HonorEntry {
                full_name: record.full_name.clone(),
                student_number: record.student_number.clone(),
                gpa,
            });
        }

        let mut reasons = Vec::new();
        if record.attendance < LOW_ATTENDANCE_THRESHOLD {
            reasons.push(RiskReason::LowAttendance);
        }
        if gpa < PASSING_THRESHOLD {
            reasons.push(RiskReason::FailingGrades);
        }

        if !reasons.is_empty() {
            review.at_risk.push(RiskEntry {
                full_name: record.full_name.clone(),
                student_number: record.student_number.clone(),
                gpa,
                attendance: record.attendance,
                reasons,
            });
        }
    }

    review
        .deans_list
        .sort_by(|a, b| b.gpa.partial_cmp(&a.gpa).unwrap_or(std::cmp::Ordering::Equal));
    review
        .at_risk
        .sort_by(|a, b| a.gpa.partial_cmp(&b.gpa).unwrap_or(std::cmp::Ordering::Equal));
    review
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GradingWeights;

    fn engine() -> AnalyticsEngine {
        AnalyticsEngine::new(GradingWeights {
            quiz: 0.3,
            midterm: 0.3,
            final_exam: 0.4,
        })
    }

    fn record(number: &str, name: &str, attendance: f64, score: f64) -> ScoreRecord {
        ScoreRecord {
            student_number: number.to_string(),
            full_name: name.to_string(),
            attendance,
            quiz: score,
            midterm: score,
            final_exam: score,
        }
    }

    #[test]
    fn deans_list_boundary_is_inclusive() {
        let records = vec![record("23-1001", "Reyes, Ana", 95.0, 90.0)];
        let review = review_standing(&records, &engine());
        assert_eq!(review.deans_list.len(), 1);
        assert!(review.at_risk.is_empty());
    }

    #[test]
    fn risk_reasons_accumulate() {
        let records = vec![record("23-1002", "Cruz, Ben", 60.0, 70.0)];
        let review = review_standing(&records, &engine());
        assert!(review.deans_list.is_empty());
        assert_eq!(review.at_risk.len(), 1);
        assert_eq!(
            review.at_risk[0].reasons,
            vec![RiskReason::LowAttendance, RiskReason::FailingGrades]
        );
        assert_eq!(review.at_risk[0].reasons_label(), "Low Attendance, Failing Grades");
    }

    #[test]
    fn low_attendance_alone_still_flags() {
        let records = vec![record("23-1003", "Lim, Cara", 70.0, 85.0)];
        let review = review_standing(&records, &engine());
        assert_eq!(review.at_risk.len(), 1);
        assert_eq!(review.at_risk[0].reasons, vec![RiskReason::LowAttendance]);
    }

    #[test]
    fn lists_are_sorted_for_display() {
        let records = vec![
            record("23-1004", "Uy, Dan", 95.0, 91.0),
            record("23-1005", "Tan, Eve", 95.0, 97.0),
            record("23-1006", "Go, Fay", 50.0, 60.0),
            record("23-1007", "Sy, Gil", 55.0, 40.0),
        ];
        let review = review_standing(&records, &engine());
        assert_eq!(review.deans_list[0].full_name, "Tan, Eve");
        assert_eq!(review.at_risk[0].full_name, "Sy, Gil");
    }

    #[test]
    fn healthy_student_appears_in_neither_list() {
        let records = vec![record("23-1008", "Ong, Hana", 92.0, 82.0)];
        let review = review_standing(&records, &engine());
        assert!(review.deans_list.is_empty());
        assert!(review.at_risk.is_empty());
    }
}
