use serde::{Deserialize, Serialize};

/// Relative weights of the three graded components. Conventionally sums to
/// 1.0; the settings-save path enforces that, not the analytics engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradingWeights {
    pub quiz: f64,
    pub midterm: f64,
    #[serde(rename = "final")]
    pub final_exam: f64,
}

/// Data-entry payload for one student and their grading-period scores.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub student_number: String,
    pub full_name: String,
    pub course: String,
    pub year_level: i32,
    pub attendance: f64,
    pub quiz: f64,
    pub midterm: f64,
    pub final_exam: f64,
}

/// One student's scores for the grading period, joined with identity for
/// display. All four values are expected in [0,100]; the data-entry layer
/// validates ranges before they reach storage.
#[derive(Debug, Clone)]
pub struct ScoreRecord {
    pub student_number: String,
    pub full_name: String,
    pub attendance: f64,
    pub quiz: f64,
    pub midterm: f64,
    pub final_exam: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassPerformance {
    /// Mean weighted GPA, rounded to 2 decimal places. 0 for an empty class.
    pub average: f64,
    /// Percentage of GPAs at or above the passing threshold, rounded to
    /// 1 decimal place. 0 for an empty class.
    pub pass_rate: f64,
}

/// Least-squares fit of weighted GPA against attendance rate. Recomputed on
/// demand from the current records, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub correlation: f64,
}

#[derive(Debug, Clone)]
pub struct RosterSummary {
    pub total_students: i64,
    pub avg_attendance: f64,
}
