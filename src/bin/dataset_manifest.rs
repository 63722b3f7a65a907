use serde_json::json;
use std::env;
use std::fs;
use std::path::PathBuf;

use streetscape::data::{build_manifest, default_manifest_path, load_csv, validate_schema};

fn main() {
    let path = PathBuf::from(
        env::args()
            .nth(1)
            .or_else(|| env::var("DATA_PATH").ok())
            .unwrap_or_else(|| "data/Data_all_respondents.csv".to_string()),
    );

    let schema = match validate_schema(&path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("schema check failed: {:#}", err);
            std::process::exit(1);
        }
    };
    if !schema.ok {
        eprintln!("schema mismatch: {}", schema.message);
        std::process::exit(2);
    }

    let manifest = match load_csv(&path).and_then(|store| build_manifest(&path, &store)) {
        Ok(m) => m,
        Err(err) => {
            eprintln!("load failed: {:#}", err);
            std::process::exit(3);
        }
    };

    let out_path = default_manifest_path(&path);
    let payload = json!({
        "manifest": manifest,
        "schema": schema,
    });
    let written = serde_json::to_string_pretty(&payload)
        .map_err(anyhow::Error::from)
        .and_then(|text| fs::write(&out_path, text).map_err(anyhow::Error::from));
    if let Err(err) = written {
        eprintln!("failed to write {}: {:#}", out_path.display(), err);
        std::process::exit(4);
    }
    println!(
        "wrote manifest {} ({} rows, {} respondents, {} warnings)",
        out_path.display(),
        manifest.row_count,
        manifest.respondent_count,
        manifest.warnings.len()
    );
}
