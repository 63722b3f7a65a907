//! Data-quality indicators for the eye tracker readings.

use serde::{Deserialize, Serialize};

use crate::data::Subset;

/// Limits used to flag questionable samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Eye-to-glasses distance (mm) above which the reading is suspect.
    pub distance_mm: f64,
    /// Validity code from which a sample counts as invalid (4 = certainly invalid).
    pub invalid_level: f64,
    pub pupil_outlier_low: f64,
    pub pupil_outlier_high: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            distance_mm: 900.0,
            invalid_level: 4.0,
            pupil_outlier_low: 4.7,
            pupil_outlier_high: 5.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualitySummary {
    pub samples: usize,
    pub distance_max: Option<f64>,
    pub beyond_distance: usize,
    pub invalid_samples: usize,
    pub pupil_outliers: usize,
    pub thresholds: QualityThresholds,
}

pub fn quality_summary(subset: &Subset<'_>, thresholds: &QualityThresholds) -> QualitySummary {
    let mut summary = QualitySummary {
        samples: subset.len(),
        distance_max: None,
        beyond_distance: 0,
        invalid_samples: 0,
        pupil_outliers: 0,
        thresholds: *thresholds,
    };
    for r in subset.records() {
        if let Some(d) = r.distance_left {
            summary.distance_max = Some(summary.distance_max.map_or(d, |m| m.max(d)));
            if d > thresholds.distance_mm {
                summary.beyond_distance += 1;
            }
        }
        if r.validity_left.is_some_and(|v| v >= thresholds.invalid_level) {
            summary.invalid_samples += 1;
        }
        if r
            .pupil_left
            .is_some_and(|p| (thresholds.pupil_outlier_low..=thresholds.pupil_outlier_high).contains(&p))
        {
            summary.pupil_outliers += 1;
        }
    }
    summary
}
