//! Zero-based clocks so several respondents' visits share one time axis.

use chrono::{NaiveDateTime, TimeDelta};
use serde_json::json;
use std::collections::HashMap;
use std::hash::Hash;

use crate::data::{SensorRecord, Subset};
use crate::logging::{log, obj, Domain, Level};

/// A subset with a relative timestamp (seconds) aligned to each of its rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedSubset<'a> {
    subset: Subset<'a>,
    relative: Vec<Option<f64>>,
}

impl<'a> TimedSubset<'a> {
    pub fn subset(&self) -> &Subset<'a> {
        &self.subset
    }

    /// Relative seconds in the same order as `subset().rows()`.
    pub fn relative(&self) -> &[Option<f64>] {
        &self.relative
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a SensorRecord, Option<f64>)> + '_ {
        self.subset.records().zip(self.relative.iter().copied())
    }
}

/// Seconds since the first sample of the row's group, grouped by `key`.
///
/// Rows for which `key` returns `None` get no relative time. The anchor is
/// the earliest timestamp of the group, so row order does not matter.
pub fn elapsed_by_group<K: Hash + Eq>(
    subset: &Subset<'_>,
    key: impl Fn(&SensorRecord) -> Option<K>,
) -> Vec<Option<f64>> {
    let mut anchors: HashMap<K, NaiveDateTime> = HashMap::new();
    for r in subset.records() {
        if let Some(k) = key(r) {
            anchors
                .entry(k)
                .and_modify(|first| *first = (*first).min(r.timestamp))
                .or_insert(r.timestamp);
        }
    }
    subset
        .records()
        .map(|r| {
            let first = anchors.get(&key(r)?)?;
            Some(seconds(r.timestamp - *first))
        })
        .collect()
}

fn seconds(delta: TimeDelta) -> f64 {
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

/// Per respondent, per viewpoint: seconds since that respondent first
/// entered that viewpoint. Route-transition rows get `None`.
pub fn derive_relative_time<'a>(subset: &Subset<'a>) -> TimedSubset<'a> {
    let relative = elapsed_by_group(subset, |r| r.viewpoint.map(|vp| (r.respondent, vp)));
    log(
        Level::Debug,
        Domain::Stats,
        "relative_time",
        obj(&[
            ("rows", json!(subset.len())),
            ("timed_rows", json!(relative.iter().filter(|t| t.is_some()).count())),
        ]),
    );
    TimedSubset {
        subset: subset.clone(),
        relative,
    }
}

/// Per respondent: seconds since the respondent's first sample anywhere in
/// `subset`. Used as the time axis of full-route charts.
pub fn route_clock(subset: &Subset<'_>) -> Vec<Option<f64>> {
    elapsed_by_group(subset, |r| Some(r.respondent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DatasetBuilder;
    use crate::viewpoint::Viewpoint;
    use chrono::NaiveDate;

    fn at(s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            + TimeDelta::milliseconds(s as i64 * 500)
    }

    #[test]
    fn anchors_per_respondent_and_viewpoint() {
        let mut b = DatasetBuilder::new("t");
        let a = b.respondent("A", "MALE", 17, at(0));
        let bb = b.respondent("B", "FEMALE", 16, at(0));
        let vp = |v| Some(v);
        for (key, t, v) in [
            (a, 0, None),
            (a, 2, vp(Viewpoint::One)),
            (a, 3, vp(Viewpoint::One)),
            (a, 10, vp(Viewpoint::Two)),
            (bb, 20, vp(Viewpoint::One)),
            (bb, 21, vp(Viewpoint::One)),
        ] {
            b.push(SensorRecord {
                viewpoint: v,
                ..SensorRecord::new(key, at(t))
            });
        }
        let store = b.build();
        let timed = derive_relative_time(&store.all());
        assert_eq!(
            timed.relative(),
            &[None, Some(0.0), Some(0.5), Some(0.0), Some(0.0), Some(0.5)]
        );
    }

    #[test]
    fn out_of_order_rows_anchor_on_earliest() {
        let mut b = DatasetBuilder::new("t");
        let a = b.respondent("A", "MALE", 17, at(0));
        for t in [4, 2, 6] {
            b.push(SensorRecord {
                viewpoint: Some(Viewpoint::Three),
                ..SensorRecord::new(a, at(t))
            });
        }
        let store = b.build();
        let timed = derive_relative_time(&store.all());
        assert_eq!(timed.relative(), &[Some(1.0), Some(0.0), Some(2.0)]);
    }

    #[test]
    fn route_clock_ignores_viewpoints() {
        let mut b = DatasetBuilder::new("t");
        let a = b.respondent("A", "MALE", 17, at(0));
        b.push(SensorRecord::new(a, at(2)));
        b.push(SensorRecord {
            viewpoint: Some(Viewpoint::One),
            ..SensorRecord::new(a, at(4))
        });
        let store = b.build();
        assert_eq!(route_clock(&store.all()), vec![Some(0.0), Some(1.0)]);
    }
}
