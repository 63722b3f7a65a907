use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::DatasetStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub path: String,
    pub hash_sha256: String,
    pub row_count: usize,
    pub respondent_count: usize,
    pub transition_rows: usize,
    pub ts_min: Option<NaiveDateTime>,
    pub ts_max: Option<NaiveDateTime>,
    pub viewpoint_columns: Vec<String>,
    pub warnings: Vec<String>,
    pub generated_at: String,
}

/// Describe a loaded store, fingerprinting the file it came from.
pub fn build_manifest(path: &Path, store: &DatasetStore) -> Result<DatasetManifest> {
    let hash = file_sha256(path)?;
    let ts_min = store.records().iter().map(|r| r.timestamp).min();
    let ts_max = store.records().iter().map(|r| r.timestamp).max();
    let transition_rows = store
        .records()
        .iter()
        .filter(|r| r.viewpoint.is_none())
        .count();

    Ok(DatasetManifest {
        path: path.display().to_string(),
        hash_sha256: hash,
        row_count: store.len(),
        respondent_count: store.respondents().len(),
        transition_rows,
        ts_min,
        ts_max,
        viewpoint_columns: store
            .viewpoint_columns()
            .iter()
            .map(|(_, name)| name.clone())
            .collect(),
        warnings: store.warnings().to_vec(),
        generated_at: crate::logging::ts_now(),
    })
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn default_manifest_path(dataset_path: &Path) -> PathBuf {
    let mut p = dataset_path.to_path_buf();
    let fname = dataset_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset.csv");
    p.set_file_name(format!("{}.manifest.json", fname));
    p
}
