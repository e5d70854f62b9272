use thiserror::Error;

/// Failures the analytics engine can signal. Insufficient data is not an
/// error (the regression returns no result for it); only a mathematically
/// undefined fit lands here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    /// The independent variable has zero variance, so no least-squares line
    /// exists. Callers report this to the user instead of showing a fit.
    #[error("cannot fit a trend line when all attendance values are identical")]
    DegenerateAttendance,
}
