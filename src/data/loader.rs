use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::columns::{self, Field};
use super::{DatasetBuilder, DatasetStore, SensorRecord};
use crate::logging::{log_dataset_loaded, log_load_warning, ProfileScope};
use crate::viewpoint::Viewpoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaReport {
    pub columns: Vec<String>,
    pub missing: Vec<String>,
    pub viewpoint_columns: Vec<String>,
    pub ok: bool,
    pub message: String,
}

/// Header positions resolved once per file.
struct ColumnLayout {
    timestamp: usize,
    name: usize,
    gender: usize,
    age: usize,
    rec_datetime: usize,
    blink: Option<usize>,
    peak: Option<usize>,
    fixation_index: Option<usize>,
    saccade_index: Option<usize>,
    viewpoints: Vec<(Viewpoint, usize)>,
    fields: Vec<(Field, usize)>,
}

impl ColumnLayout {
    fn resolve(headers: &StringRecord) -> Result<(Self, Vec<String>)> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| find(name).ok_or_else(|| anyhow!("missing required column '{}'", name));

        let mut warnings = Vec::new();
        let mut viewpoints: Vec<(Viewpoint, usize)> = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            if !columns::is_viewpoint_column(header) {
                continue;
            }
            match columns::viewpoint_number(header).and_then(Viewpoint::from_number) {
                Some(vp) if viewpoints.iter().all(|(v, _)| *v != vp) => viewpoints.push((vp, idx)),
                Some(vp) => warnings.push(format!(
                    "duplicate_viewpoint_column: '{}' repeats viewpoint {}",
                    header,
                    vp.number()
                )),
                None => warnings.push(format!("unknown_viewpoint_column: '{}'", header)),
            }
        }
        if viewpoints.is_empty() {
            bail!("no 'Viewpoint N active' columns found");
        }
        viewpoints.sort();

        let fields = Field::ALL
            .iter()
            .filter_map(|f| find(f.header()).map(|idx| (*f, idx)))
            .collect();

        Ok((
            Self {
                timestamp: require(columns::TIMESTAMP)?,
                name: require(columns::RESP_NAME)?,
                gender: require(columns::RESP_GENDER)?,
                age: require(columns::RESP_AGE)?,
                rec_datetime: require(columns::RESP_REC_DATETIME)?,
                blink: find(columns::BLINK),
                peak: find(columns::PEAK_DETECTED),
                fixation_index: find(columns::FIXATION_INDEX),
                saccade_index: find(columns::SACCADE_INDEX),
                viewpoints,
                fields,
            },
            warnings,
        ))
    }
}

/// Counts of unusable cells in optional columns, reported once per column.
#[derive(Default)]
struct CellIssues {
    bad_cells: BTreeMap<&'static str, usize>,
    multi_active_rows: usize,
}

impl CellIssues {
    fn bad(&mut self, column: &'static str) {
        *self.bad_cells.entry(column).or_insert(0) += 1;
    }

    fn into_warnings(self) -> Vec<String> {
        let mut out: Vec<String> = self
            .bad_cells
            .into_iter()
            .map(|(col, n)| format!("unparsable_cells: {} values in '{}' treated as absent", n, col))
            .collect();
        if self.multi_active_rows > 0 {
            out.push(format!(
                "multiple_active_viewpoints: {} rows, lowest viewpoint kept",
                self.multi_active_rows
            ));
        }
        out
    }
}

/// Load the exported sensor table.
///
/// The leading unnamed index column of the export is ignored because
/// columns are resolved by header name.
pub fn load_csv(path: &Path) -> Result<DatasetStore> {
    let _scope = ProfileScope::new("load_csv");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .clone();
    let (layout, header_warnings) = ColumnLayout::resolve(&headers)
        .with_context(|| format!("resolving columns of {}", path.display()))?;

    let source = path.display().to_string();
    let mut builder = DatasetBuilder::new(source.clone());
    builder.set_viewpoint_columns(
        layout
            .viewpoints
            .iter()
            .map(|(vp, idx)| (*vp, headers[*idx].trim().to_string()))
            .collect(),
    );
    for w in header_warnings {
        builder.warn(w);
    }

    let mut issues = CellIssues::default();
    for (i, row) in reader.records().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = row.with_context(|| format!("reading line {}", line))?;
        let record = parse_row(&row, &layout, &mut builder, &mut issues)
            .with_context(|| format!("line {} of {}", line, path.display()))?;
        builder.push(record);
    }
    for w in issues.into_warnings() {
        builder.warn(w);
    }

    let store = builder.build();
    for w in store.warnings() {
        log_load_warning(&source, w);
    }
    log_dataset_loaded(&source, store.len(), store.respondents().len(), store.warnings().len());
    Ok(store)
}

fn parse_row(
    row: &StringRecord,
    layout: &ColumnLayout,
    builder: &mut DatasetBuilder,
    issues: &mut CellIssues,
) -> Result<SensorRecord> {
    let cell = |idx: usize| row.get(idx).map(str::trim).unwrap_or("");

    let name = cell(layout.name);
    if name.is_empty() {
        bail!("empty '{}'", columns::RESP_NAME);
    }
    let timestamp = parse_timestamp(cell(layout.timestamp))
        .ok_or_else(|| anyhow!("bad '{}': {:?}", columns::TIMESTAMP, cell(layout.timestamp)))?;
    let rec_start = parse_timestamp(cell(layout.rec_datetime)).ok_or_else(|| {
        anyhow!("bad '{}': {:?}", columns::RESP_REC_DATETIME, cell(layout.rec_datetime))
    })?;
    let age = parse_age(cell(layout.age))
        .ok_or_else(|| anyhow!("bad '{}': {:?}", columns::RESP_AGE, cell(layout.age)))?;

    let key = builder.respondent(name, cell(layout.gender), age, rec_start);
    let mut record = SensorRecord::new(key, timestamp);

    let mut active = layout
        .viewpoints
        .iter()
        .filter(|(_, idx)| parse_flag(cell(*idx)) == Some(true))
        .map(|(vp, _)| *vp);
    record.viewpoint = active.next();
    if active.next().is_some() {
        issues.multi_active_rows += 1;
    }

    for (field, idx) in &layout.fields {
        let raw = cell(*idx);
        if raw.is_empty() {
            continue;
        }
        match parse_number(raw) {
            Some(v) => field.set(&mut record, Some(v)),
            None => issues.bad(field.header()),
        }
    }

    record.blink = optional(layout.blink, columns::BLINK, &cell, issues, parse_flag);
    record.peak_detected = optional(layout.peak, columns::PEAK_DETECTED, &cell, issues, parse_flag);
    record.fixation_index =
        optional(layout.fixation_index, columns::FIXATION_INDEX, &cell, issues, parse_index);
    record.saccade_index =
        optional(layout.saccade_index, columns::SACCADE_INDEX, &cell, issues, parse_index);

    Ok(record)
}

fn optional<'r, T>(
    idx: Option<usize>,
    column: &'static str,
    cell: &impl Fn(usize) -> &'r str,
    issues: &mut CellIssues,
    parse: fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = cell(idx?);
    if raw.is_empty() {
        return None;
    }
    let parsed = parse(raw);
    if parsed.is_none() {
        issues.bad(column);
    }
    parsed
}

/// Parse an absolute timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM:SS[.fff]`, the same with a `T` separator,
/// RFC 3339 with an offset (kept as local wall-clock), or integer epoch
/// milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|ts| ts.naive_utc())
}

fn parse_number(raw: &str) -> Option<f64> {
    match raw {
        "nan" | "NaN" | "NA" | "null" => None,
        _ => raw.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "1" | "1.0" | "true" | "True" | "TRUE" => Some(true),
        "0" | "0.0" | "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

fn parse_index(raw: &str) -> Option<u32> {
    let v = raw.parse::<f64>().ok()?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}

fn parse_age(raw: &str) -> Option<u32> {
    parse_index(raw)
}

pub fn read_header(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    Ok(reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect())
}

/// Check a file's header without loading its rows.
pub fn validate_schema(path: &Path) -> Result<SchemaReport> {
    let header = read_header(path)?;
    let missing: Vec<String> = columns::REQUIRED
        .iter()
        .filter(|req| !header.iter().any(|h| h == *req))
        .map(|s| s.to_string())
        .collect();
    let viewpoint_columns: Vec<String> = header
        .iter()
        .filter(|h| columns::is_viewpoint_column(h))
        .cloned()
        .collect();
    let vp_ok = (1..=5).contains(&viewpoint_columns.len());
    let ok = missing.is_empty() && vp_ok;
    let message = if ok {
        "schema ok".to_string()
    } else if !missing.is_empty() {
        format!("missing columns: {:?}", missing)
    } else {
        format!(
            "expected 1..5 viewpoint columns, found {}",
            viewpoint_columns.len()
        )
    };
    Ok(SchemaReport {
        columns: header,
        missing,
        viewpoint_columns,
        ok,
        message,
    })
}
