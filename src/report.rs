use std::fmt::Write;

use chrono::NaiveDate;

use crate::analytics::{insight_text, AnalyticsEngine, PASSING_THRESHOLD};
use crate::error::AnalyticsError;
use crate::models::ScoreRecord;
use crate::standing::{self, DEANS_LIST_THRESHOLD};

pub fn build_report(
    records: &[ScoreRecord],
    engine: &AnalyticsEngine,
    generated_on: NaiveDate,
) -> String {
    let grades: Vec<f64> = records
        .iter()
        .map(|r| engine.weighted_gpa(r.quiz, r.midterm, r.final_exam))
        .collect();
    let attendance: Vec<f64> = records.iter().map(|r| r.attendance).collect();
    let performance = engine.class_performance(&grades);
    let review = standing::review_standing(records, engine);

    let mut output = String::new();

    let _ = writeln!(output, "# Academic Performance Report");
    let _ = writeln!(
        output,
        "Generated on {} for {} students.",
        generated_on,
        records.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Performance");

    if records.is_empty() {
        let _ = writeln!(output, "No student records on file.");
    } else {
        let avg_attendance =
            attendance.iter().sum::<f64>() / attendance.len() as f64;
        let _ = writeln!(output, "- Average weighted GPA: {:.2}", performance.average);
        let _ = writeln!(
            output,
            "- Pass rate: {:.1}% (passing threshold {PASSING_THRESHOLD})",
            performance.pass_rate
        );
        let _ = writeln!(output, "- Average attendance: {avg_attendance:.2}%");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance Trend");

    match engine.predict_performance(&attendance, &grades) {
        Ok(None) => {
            let _ = writeln!(
                output,
                "Not enough records to fit a trend line (at least 2 are required)."
            );
        }
        Err(AnalyticsError::DegenerateAttendance) => {
            let _ = writeln!(
                output,
                "No trend available: all students share the same attendance rate."
            );
        }
        Ok(Some(fit)) => {
            let _ = writeln!(
                output,
                "- Fitted line: GPA = {:.4} x attendance + {:.4}",
                fit.slope, fit.intercept
            );
            let _ = writeln!(output, "- Correlation: {:.4}", fit.correlation);
            let _ = writeln!(output, "- R-squared: {:.4}", fit.r_squared);
            for line in insight_text(fit.correlation).lines() {
                let _ = writeln!(output, "{line}");
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Dean's List (GPA >= {DEANS_LIST_THRESHOLD})");

    if review.deans_list.is_empty() {
        let _ = writeln!(output, "No students on the dean's list.");
    } else {
        for entry in &review.deans_list {
            let _ = writeln!(
                output,
                "- {} ({}) GPA {:.2}",
                entry.full_name, entry.student_number, entry.gpa
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## At-Risk Students");

    if review.at_risk.is_empty() {
        let _ = writeln!(output, "No students flagged for intervention.");
    } else {
        for entry in &review.at_risk {
            let _ = writeln!(
                output,
                "- {} ({}) GPA {:.2}, attendance {:.0}%: {}",
                entry.full_name,
                entry.student_number,
                entry.gpa,
                entry.attendance,
                entry.reasons_label()
            );
        }
    }

    output
}
