use crate::error::AnalyticsError;
use crate::models::{ClassPerformance, GradingWeights, RegressionResult};

/// A weighted GPA at or above this counts as passing.
pub const PASSING_THRESHOLD: f64 = 75.0;

/// Turns raw per-student scores into a weighted GPA, class-level aggregates,
/// and an attendance-to-GPA trend fit.
///
/// The engine holds nothing but its immutable grading weights; every
/// operation is a pure function of its explicit inputs. Scores are expected
/// in [0,100] but are not validated here — range checks belong to the
/// calling layer.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsEngine {
    weights: GradingWeights,
}

impl AnalyticsEngine {
    pub fn new(weights: GradingWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> GradingWeights {
        self.weights
    }

    /// Linear combination of the three component scores under the configured
    /// weights. Total and deterministic.
    pub fn weighted_gpa(&self, quiz: f64, midterm: f64, final_exam: f64) -> f64 {
        quiz * self.weights.quiz
            + midterm * self.weights.midterm
            + final_exam * self.weights.final_exam
    }

    /// Class average (2 decimal places) and passing percentage (1 decimal
    /// place) over already-computed GPAs. An empty class yields zeros.
    pub fn class_performance(&self, grades: &[f64]) -> ClassPerformance {
        if grades.is_empty() {
            return ClassPerformance {
                average: 0.0,
                pass_rate: 0.0,
            };
        }

        let mean = grades.iter().sum::<f64>() / grades.len() as f64;
        let passing = grades.iter().filter(|g| **g >= PASSING_THRESHOLD).count();
        let pass_rate = passing as f64 / grades.len() as f64 * 100.0;

        ClassPerformance {
            average: round_to(mean, 2),
            pass_rate: round_to(pass_rate, 1),
        }
    }

    /// Ordinary least-squares fit of `grade = slope * attendance + intercept`
    /// over paired observations, with the Pearson correlation coefficient.
    ///
    /// Fewer than 2 observations is an insufficient-data signal, `Ok(None)`.
    /// Zero variance in attendance leaves the fit undefined and returns
    /// [`AnalyticsError::DegenerateAttendance`]. Zero variance in grades
    /// alone is a flat line with `correlation = 0`.
    pub fn predict_performance(
        &self,
        attendance: &[f64],
        grades: &[f64],
    ) -> Result<Option<RegressionResult>, AnalyticsError> {
        let n = attendance.len().min(grades.len());
        if n < 2 {
            return Ok(None);
        }
        let xs = &attendance[..n];
        let ys = &grades[..n];

        let mean_x = xs.iter().sum::<f64>() / n as f64;
        let mean_y = ys.iter().sum::<f64>() / n as f64;

        let mut sxx = 0.0;
        let mut syy = 0.0;
        let mut sxy = 0.0;
        for (x, y) in xs.iter().zip(ys) {
            let dx = x - mean_x;
            let dy = y - mean_y;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }

        if sxx == 0.0 {
            return Err(AnalyticsError::DegenerateAttendance);
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        let correlation = if syy == 0.0 {
            0.0
        } else {
            (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
        };

        Ok(Some(RegressionResult {
            slope,
            intercept,
            r_squared: correlation * correlation,
            correlation,
        }))
    }

    /// Single-point forecast from a fitted model, clamped to the score scale.
    pub fn forecast_gpa(&self, model: &RegressionResult, attendance: f64) -> f64 {
        (model.slope * attendance + model.intercept).clamp(0.0, 100.0)
    }
}

/// Qualitative read of a correlation coefficient, in three fixed bands.
/// The boundaries 0.7 and 0.3 fall into the lower band.
pub fn insight_text(correlation: f64) -> &'static str {
    if correlation > 0.7 {
        "Analysis: Strong positive correlation.\nHigh attendance consistently leads to better grades."
    } else if correlation > 0.3 {
        "Analysis: Moderate correlation.\nAttendance helps, but other factors (aptitude) matter."
    } else {
        "Analysis: Weak correlation.\nGrades are inconsistent regardless of attendance."
    }
}

fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
