use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::GradingWeights;

/// On-disk application settings. The file is the original `settings.json`
/// shape; unknown top-level keys survive a round-trip untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub grading_weights: GradingWeights,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grading_weights: GradingWeights {
                quiz: 0.3,
                midterm: 0.3,
                final_exam: 0.4,
            },
            extra: serde_json::Map::new(),
        }
    }
}

impl Settings {
    /// Reads settings from `path`, falling back to defaults when the file
    /// does not exist yet.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "settings file missing, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings in {}", path.display()))?;
        Ok(settings)
    }

    /// Validates and persists new grading weights. Weight changes apply to
    /// the next run; the running engine keeps the weights it was built with.
    pub fn save_weights(&self, path: &Path, weights: GradingWeights) -> anyhow::Result<()> {
        validate_weights(&weights)?;
        let updated = Settings {
            grading_weights: weights,
            extra: self.extra.clone(),
        };
        let raw = serde_json::to_string_pretty(&updated).context("failed to serialize settings")?;
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write settings to {}", path.display()))?;
        debug!(path = %path.display(), "grading weights saved");
        Ok(())
    }
}

/// Each weight must sit in [0,1] and the three must sum to 1.0, compared at
/// 2 decimal places the way the original settings form does.
pub fn validate_weights(weights: &GradingWeights) -> anyhow::Result<()> {
    for (label, value) in [
        ("quiz", weights.quiz),
        ("midterm", weights.midterm),
        ("final", weights.final_exam),
    ] {
        if !(0.0..=1.0).contains(&value) {
            bail!("{label} weight {value} is outside 0.0-1.0");
        }
    }

    let total = weights.quiz + weights.midterm + weights.final_exam;
    if (total * 100.0).round() / 100.0 != 1.0 {
        bail!("grading weights sum to {total:.2}, they must equal 1.0");
    }
    Ok(())
}
