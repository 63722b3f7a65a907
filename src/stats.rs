//! Per-viewpoint summary table shown on the home page.

use serde::{Serialize, Serializer};
use serde_json::json;
use std::collections::HashSet;

use crate::data::Subset;
use crate::logging::{log, obj, Domain, Level, ProfileScope};
use crate::viewpoint::Viewpoint;

/// A table cell: a number, or the "no data" marker (`"-"` when serialized).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Value(f64),
    NoData,
}

impl Metric {
    fn from_option(v: Option<f64>) -> Self {
        v.map_or(Metric::NoData, Metric::Value)
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Value(v) => serializer.serialize_f64(*v),
            Metric::NoData => serializer.serialize_str("-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewpointStats {
    pub viewpoint: Viewpoint,
    pub blink_rate: Metric,
    pub gsr_peaks: Metric,
    pub gsr_raw: Metric,
    pub fixations_amount: Metric,
    pub fixations_duration: Metric,
    pub fixations_dispersion: Metric,
    pub saccades_amount: Metric,
    pub saccades_duration: Metric,
    pub saccades_amplitude: Metric,
}

impl ViewpointStats {
    pub fn no_data(viewpoint: Viewpoint) -> Self {
        Self {
            viewpoint,
            blink_rate: Metric::NoData,
            gsr_peaks: Metric::NoData,
            gsr_raw: Metric::NoData,
            fixations_amount: Metric::NoData,
            fixations_duration: Metric::NoData,
            fixations_dispersion: Metric::NoData,
            saccades_amount: Metric::NoData,
            saccades_duration: Metric::NoData,
            saccades_amplitude: Metric::NoData,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    n: usize,
}

impl Mean {
    fn push(&mut self, v: Option<f64>) {
        if let Some(v) = v {
            self.sum += v;
            self.n += 1;
        }
    }

    fn get(&self) -> Option<f64> {
        if self.n == 0 {
            None
        } else {
            Some(self.sum / self.n as f64)
        }
    }
}

#[derive(Default)]
struct Bucket {
    rows: usize,
    blink: Mean,
    peaks: usize,
    gsr_raw: Mean,
    fixations: HashSet<u32>,
    fixation_duration: Mean,
    fixation_dispersion: Mean,
    saccades: HashSet<u32>,
    saccade_duration: Mean,
    saccade_amplitude: Mean,
}

impl Bucket {
    fn finish(&self, viewpoint: Viewpoint, respondents: usize) -> ViewpointStats {
        if self.rows == 0 {
            return ViewpointStats::no_data(viewpoint);
        }
        let per_respondent = |count: usize| {
            if respondents == 0 {
                Metric::NoData
            } else {
                Metric::Value((count as f64 / respondents as f64).round())
            }
        };
        let rounded = |m: &Mean, decimals: i32| Metric::from_option(m.get().map(|v| round_to(v, decimals)));

        ViewpointStats {
            viewpoint,
            blink_rate: rounded(&self.blink, 4),
            gsr_peaks: per_respondent(self.peaks),
            gsr_raw: rounded(&self.gsr_raw, 2),
            fixations_amount: per_respondent(self.fixations.len()),
            fixations_duration: rounded(&self.fixation_duration, 2),
            fixations_dispersion: rounded(&self.fixation_dispersion, 4),
            saccades_amount: per_respondent(self.saccades.len()),
            saccades_duration: rounded(&self.saccade_duration, 2),
            saccades_amplitude: rounded(&self.saccade_amplitude, 2),
        }
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(v: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (v * scale).round() / scale
}

/// Summarize `subset` per viewpoint.
///
/// Always five rows in viewpoint order. Counts are normalized by the number
/// of distinct respondents in the whole subset, not within the viewpoint.
/// Fixations and saccades count distinct indices within the viewpoint, so
/// one event sampled at several instants counts once.
pub fn aggregate(subset: &Subset<'_>) -> [ViewpointStats; 5] {
    let _scope = ProfileScope::with_context("aggregate", &[("rows", json!(subset.len()))]);

    let mut buckets: [Bucket; 5] = Default::default();
    let mut respondents = HashSet::new();

    for r in subset.records() {
        respondents.insert(r.respondent);
        let Some(vp) = r.viewpoint else { continue };
        let b = &mut buckets[vp.index()];
        b.rows += 1;
        b.blink.push(r.blink.map(|x| if x { 1.0 } else { 0.0 }));
        if r.peak_detected == Some(true) {
            b.peaks += 1;
        }
        b.gsr_raw.push(r.gsr_raw);
        if let Some(idx) = r.fixation_index {
            b.fixations.insert(idx);
        }
        b.fixation_duration.push(r.fixation_duration);
        b.fixation_dispersion.push(r.fixation_dispersion);
        if let Some(idx) = r.saccade_index {
            b.saccades.insert(idx);
        }
        b.saccade_duration.push(r.saccade_duration);
        b.saccade_amplitude.push(r.saccade_amplitude);
    }

    let n = respondents.len();
    log(
        Level::Debug,
        Domain::Stats,
        "aggregated",
        obj(&[
            ("rows", json!(subset.len())),
            ("respondents", json!(n)),
            (
                "viewpoint_rows",
                json!(buckets.iter().map(|b| b.rows).collect::<Vec<_>>()),
            ),
        ]),
    );

    Viewpoint::ALL.map(|vp| buckets[vp.index()].finish(vp, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DatasetBuilder, DatasetStore, SensorRecord};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, s)
            .unwrap()
    }

    fn two_respondents() -> DatasetStore {
        let mut b = DatasetBuilder::new("t");
        let a = b.respondent("A", "MALE", 17, at(0));
        let bb = b.respondent("B", "FEMALE", 16, at(0));
        let vp1 = Some(Viewpoint::One);
        // A: three samples of fixation 1, one of fixation 2, two peaks
        for (s, fix, peak) in [(0, 1, true), (1, 1, false), (2, 1, true), (3, 2, false)] {
            b.push(SensorRecord {
                viewpoint: vp1,
                blink: Some(s % 2 == 0),
                peak_detected: Some(peak),
                gsr_raw: Some(1.0 + s as f64),
                fixation_index: Some(fix),
                fixation_duration: Some(200.0),
                fixation_dispersion: Some(0.12346),
                ..SensorRecord::new(a, at(s))
            });
        }
        // B: shares fixation index 1 with A, one peak, in viewpoint 1
        b.push(SensorRecord {
            viewpoint: vp1,
            peak_detected: Some(true),
            fixation_index: Some(1),
            ..SensorRecord::new(bb, at(10))
        });
        // B: a transition sample
        b.push(SensorRecord::new(bb, at(11)));
        b.build()
    }

    #[test]
    fn always_five_rows_even_when_empty() {
        let store = two_respondents();
        let stats = aggregate(&store.none());
        assert_eq!(stats.len(), 5);
        for (i, row) in stats.iter().enumerate() {
            assert_eq!(row.viewpoint, Viewpoint::ALL[i]);
            assert_eq!(*row, ViewpointStats::no_data(Viewpoint::ALL[i]));
        }
    }

    #[test]
    fn counts_normalize_by_whole_cohort() {
        let store = two_respondents();
        let stats = aggregate(&store.all());
        let vp1 = &stats[0];
        // 3 peaks over 2 respondents -> 1.5 -> 2
        assert_eq!(vp1.gsr_peaks, Metric::Value(2.0));
        // distinct fixation indices {1, 2} over 2 respondents -> 1
        assert_eq!(vp1.fixations_amount, Metric::Value(1.0));
        assert_eq!(vp1.saccades_amount, Metric::Value(0.0));
        // blink present only on A's rows: [1,0,1,0]
        assert_eq!(vp1.blink_rate, Metric::Value(0.5));
        // gsr raw mean of 1,2,3,4
        assert_eq!(vp1.gsr_raw, Metric::Value(2.5));
        assert_eq!(vp1.fixations_dispersion, Metric::Value(0.1235));
        assert_eq!(vp1.saccades_duration, Metric::NoData);
        for row in &stats[1..] {
            assert_eq!(row.blink_rate, Metric::NoData);
        }
    }

    #[test]
    fn fixation_indices_shared_across_respondents_count_once() {
        let mut b = DatasetBuilder::new("t");
        let a = b.respondent("A", "MALE", 17, at(0));
        let bb = b.respondent("B", "FEMALE", 16, at(0));
        for (key, offset) in [(a, 0), (bb, 10)] {
            for idx in 1..=4u32 {
                for _ in 0..2 {
                    b.push(SensorRecord {
                        viewpoint: Some(Viewpoint::One),
                        fixation_index: Some(idx),
                        saccade_index: Some(idx + 10),
                        ..SensorRecord::new(key, at(offset + idx))
                    });
                }
            }
        }
        let store = b.build();
        let stats = aggregate(&store.all());
        // 4 distinct indices over 2 respondents
        assert_eq!(stats[0].fixations_amount, Metric::Value(2.0));
        assert_eq!(stats[0].saccades_amount, Metric::Value(2.0));
    }

    #[test]
    fn no_data_serializes_as_dash() {
        let json = serde_json::to_value(ViewpointStats::no_data(Viewpoint::Three)).unwrap();
        assert_eq!(json["viewpoint"], 3);
        assert_eq!(json["blink_rate"], "-");
        let v = serde_json::to_value(Metric::Value(0.25)).unwrap();
        assert_eq!(v, 0.25);
    }

    #[test]
    fn round_to_decimals() {
        assert_eq!(round_to(2.0 / 3.0, 4), 0.6667);
        assert_eq!(round_to(1.005_1, 2), 1.01);
        assert_eq!(round_to(2.5, 0), 3.0);
    }
}
