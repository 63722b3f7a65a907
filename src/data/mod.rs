//! The dataset store: every sensor sample of every respondent, loaded once.

pub mod columns;
pub mod loader;
pub mod manifest;
mod subset;

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;

use crate::viewpoint::Viewpoint;

pub use loader::{load_csv, parse_timestamp, read_header, validate_schema, SchemaReport};
pub use manifest::{build_manifest, default_manifest_path, file_sha256, DatasetManifest};
pub use subset::Subset;

/// Index of a respondent inside its [`DatasetStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RespondentKey(u32);

impl RespondentKey {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Respondent {
    pub name: String,
    pub gender: String,
    pub age: u32,
    pub recording_start: NaiveDateTime,
}

/// One sampled instant of one respondent.
///
/// The per-viewpoint "active" columns of the export are folded into
/// `viewpoint`, so a row can never sit in two viewpoints at once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorRecord {
    pub respondent: RespondentKey,
    pub timestamp: NaiveDateTime,
    pub viewpoint: Option<Viewpoint>,

    pub gaze_x: Option<f64>,
    pub gaze_y: Option<f64>,
    pub interpolated_gaze_x: Option<f64>,
    pub interpolated_gaze_y: Option<f64>,
    pub gaze_3d_x: Option<f64>,
    pub gaze_3d_y: Option<f64>,
    pub gaze_3d_z: Option<f64>,
    pub pupil_left: Option<f64>,
    pub pupil_right: Option<f64>,
    pub blink: Option<bool>,

    pub fixation_index: Option<u32>,
    pub fixation_x: Option<f64>,
    pub fixation_y: Option<f64>,
    pub fixation_duration: Option<f64>,
    pub fixation_dispersion: Option<f64>,

    pub saccade_index: Option<u32>,
    pub saccade_duration: Option<f64>,
    pub saccade_amplitude: Option<f64>,
    pub saccade_direction: Option<f64>,
    pub saccade_peak_velocity: Option<f64>,
    pub saccade_peak_acceleration: Option<f64>,

    pub gsr_raw: Option<f64>,
    pub gsr_tonic: Option<f64>,
    pub gsr_phasic: Option<f64>,
    pub peak_detected: Option<bool>,
    pub peak_amplitude: Option<f64>,

    pub gyro_x: Option<f64>,
    pub gyro_y: Option<f64>,
    pub gyro_z: Option<f64>,
    pub acc_x: Option<f64>,
    pub acc_y: Option<f64>,
    pub acc_z: Option<f64>,

    pub validity_left: Option<f64>,
    pub distance_left: Option<f64>,
}

impl SensorRecord {
    /// A sample with only its identity set; every reading absent.
    pub fn new(respondent: RespondentKey, timestamp: NaiveDateTime) -> Self {
        Self {
            respondent,
            timestamp,
            viewpoint: None,
            gaze_x: None,
            gaze_y: None,
            interpolated_gaze_x: None,
            interpolated_gaze_y: None,
            gaze_3d_x: None,
            gaze_3d_y: None,
            gaze_3d_z: None,
            pupil_left: None,
            pupil_right: None,
            blink: None,
            fixation_index: None,
            fixation_x: None,
            fixation_y: None,
            fixation_duration: None,
            fixation_dispersion: None,
            saccade_index: None,
            saccade_duration: None,
            saccade_amplitude: None,
            saccade_direction: None,
            saccade_peak_velocity: None,
            saccade_peak_acceleration: None,
            gsr_raw: None,
            gsr_tonic: None,
            gsr_phasic: None,
            peak_detected: None,
            peak_amplitude: None,
            gyro_x: None,
            gyro_y: None,
            gyro_z: None,
            acc_x: None,
            acc_y: None,
            acc_z: None,
            validity_left: None,
            distance_left: None,
        }
    }
}

/// Immutable sensor table shared by every session.
#[derive(Debug)]
pub struct DatasetStore {
    source: String,
    respondents: Vec<Respondent>,
    by_name: HashMap<String, RespondentKey>,
    records: Vec<SensorRecord>,
    viewpoint_columns: Vec<(Viewpoint, String)>,
    warnings: Vec<String>,
}

impl DatasetStore {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SensorRecord] {
        &self.records
    }

    pub fn respondents(&self) -> &[Respondent] {
        &self.respondents
    }

    pub fn respondent(&self, key: RespondentKey) -> &Respondent {
        &self.respondents[key.index()]
    }

    pub fn respondent_key(&self, name: &str) -> Option<RespondentKey> {
        self.by_name.get(name).copied()
    }

    /// The respondent whose recording started last; ties go to file order.
    pub fn most_recent_respondent(&self) -> Option<&Respondent> {
        self.respondents
            .iter()
            .rev()
            .max_by_key(|r| r.recording_start)
    }

    /// Viewpoint flag columns found in the source, in viewpoint order.
    pub fn viewpoint_columns(&self) -> &[(Viewpoint, String)] {
        &self.viewpoint_columns
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Every row, in file order.
    pub fn all(&self) -> Subset<'_> {
        Subset::new(self, (0..self.records.len()).collect())
    }

    /// A subset that selects nothing.
    pub fn none(&self) -> Subset<'_> {
        Subset::new(self, Vec::new())
    }
}

/// Incrementally assembles a [`DatasetStore`]; used by the CSV loader and by
/// anything that synthesizes recordings.
#[derive(Debug)]
pub struct DatasetBuilder {
    source: String,
    respondents: Vec<Respondent>,
    by_name: HashMap<String, RespondentKey>,
    conflicts: HashMap<RespondentKey, usize>,
    records: Vec<SensorRecord>,
    viewpoint_columns: Vec<(Viewpoint, String)>,
    warnings: Vec<String>,
}

impl DatasetBuilder {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            respondents: Vec::new(),
            by_name: HashMap::new(),
            conflicts: HashMap::new(),
            records: Vec::new(),
            viewpoint_columns: Viewpoint::ALL
                .iter()
                .map(|vp| (*vp, vp.column_name().to_string()))
                .collect(),
            warnings: Vec::new(),
        }
    }

    /// Register (or look up) a respondent by name.
    ///
    /// Attributes of the first call for a name win; later disagreeing
    /// attributes are counted and reported once per respondent on build.
    pub fn respondent(
        &mut self,
        name: &str,
        gender: &str,
        age: u32,
        recording_start: NaiveDateTime,
    ) -> RespondentKey {
        let gender = normalize_gender(gender);
        if let Some(&key) = self.by_name.get(name) {
            let known = &self.respondents[key.index()];
            if known.gender != gender || known.age != age || known.recording_start != recording_start {
                *self.conflicts.entry(key).or_insert(0) += 1;
            }
            return key;
        }
        let key = RespondentKey(self.respondents.len() as u32);
        self.respondents.push(Respondent {
            name: name.to_string(),
            gender,
            age,
            recording_start,
        });
        self.by_name.insert(name.to_string(), key);
        key
    }

    pub fn push(&mut self, record: SensorRecord) {
        self.records.push(record);
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn set_viewpoint_columns(&mut self, columns: Vec<(Viewpoint, String)>) {
        self.viewpoint_columns = columns;
    }

    pub fn build(mut self) -> DatasetStore {
        let mut conflicts: Vec<_> = self.conflicts.into_iter().collect();
        conflicts.sort();
        for (key, rows) in conflicts {
            self.warnings.push(format!(
                "respondent_attribute_conflict: {} has {} rows disagreeing with its first row",
                self.respondents[key.index()].name,
                rows
            ));
        }
        DatasetStore {
            source: self.source,
            respondents: self.respondents,
            by_name: self.by_name,
            records: self.records,
            viewpoint_columns: self.viewpoint_columns,
            warnings: self.warnings,
        }
    }
}

pub fn normalize_gender(gender: &str) -> String {
    gender.trim().to_uppercase()
}
