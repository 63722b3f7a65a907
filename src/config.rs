use std::path::PathBuf;

use crate::filter::DefaultSelection;
use crate::quality::QualityThresholds;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub assets_dir: PathBuf,
    pub bind_addr: String,
    pub default_selection: DefaultSelection,
    pub quality: QualityThresholds,
    pub max_sessions: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = QualityThresholds::default();
        Self {
            data_path: std::env::var("DATA_PATH")
                .unwrap_or_else(|_| "./data/Data_all_respondents.csv".to_string())
                .into(),
            assets_dir: std::env::var("ASSETS_DIR").unwrap_or_else(|_| "./assets".to_string()).into(),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8050".to_string()),
            default_selection: std::env::var("DEFAULT_SELECTION").ok().and_then(|v| v.parse().ok()).unwrap_or_default(),
            quality: QualityThresholds {
                distance_mm: std::env::var("QUALITY_DISTANCE_MM").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.distance_mm),
                invalid_level: std::env::var("QUALITY_INVALID_LEVEL").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.invalid_level),
                pupil_outlier_low: std::env::var("QUALITY_PUPIL_LOW").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.pupil_outlier_low),
                pupil_outlier_high: std::env::var("QUALITY_PUPIL_HIGH").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.pupil_outlier_high),
            },
            max_sessions: std::env::var("MAX_SESSIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(1024),
        }
    }
}
