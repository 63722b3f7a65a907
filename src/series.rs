//! Chart-ready series for the full-route and per-viewpoint pages.
//!
//! Everything here is plain data: points grouped per respondent, ordered by
//! absolute timestamp. Rendering belongs to the front end.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::data::columns::Field;
use crate::data::{RespondentKey, SensorRecord, Subset};

/// Time-series channels plotted against relative time.
pub const TIME_CHANNELS: [Field; 14] = [
    Field::GsrRaw,
    Field::GsrTonic,
    Field::GsrPhasic,
    Field::PeakAmplitude,
    Field::GyroX,
    Field::GyroY,
    Field::GyroZ,
    Field::AccX,
    Field::AccY,
    Field::AccZ,
    Field::DistanceLeft,
    Field::PupilLeft,
    Field::ValidityLeft,
    Field::SaccadePeakVelocity,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series<P> {
    pub respondent: String,
    pub points: Vec<P>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSeries {
    pub channel: &'static str,
    pub series: Vec<Series<[f64; 2]>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlinkCounts {
    pub respondent: String,
    pub no_blink: usize,
    pub blink: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixationPoint {
    pub x: f64,
    pub y: f64,
    pub dispersion: Option<f64>,
    pub duration: Option<f64>,
}

/// Which 2D gaze columns a page overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GazeSource {
    Raw,
    Interpolated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteCharts {
    pub gaze: Vec<Series<[f64; 2]>>,
    pub gaze_3d: Vec<Series<[f64; 3]>>,
    pub pupils: Vec<Series<[f64; 2]>>,
    pub blinks: Vec<BlinkCounts>,
    pub fixations: Vec<FixationPoint>,
    pub peaks_detected: Vec<Series<[f64; 2]>>,
    pub time_series: Vec<ChannelSeries>,
}

/// Row positions of `subset` ordered by (timestamp, row index).
fn chronological(subset: &Subset<'_>) -> Vec<usize> {
    let records: Vec<&SensorRecord> = subset.records().collect();
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| records[a].timestamp.cmp(&records[b].timestamp).then(a.cmp(&b)));
    order
}

/// Group points per respondent; respondents come out in store order.
fn per_respondent<P>(
    subset: &Subset<'_>,
    order: &[usize],
    mut point: impl FnMut(usize, &SensorRecord) -> Option<P>,
) -> Vec<Series<P>> {
    let records: Vec<&SensorRecord> = subset.records().collect();
    let mut groups: BTreeMap<RespondentKey, Vec<P>> = BTreeMap::new();
    for &pos in order {
        let r = records[pos];
        if let Some(p) = point(pos, r) {
            groups.entry(r.respondent).or_default().push(p);
        }
    }
    let store = subset.store();
    groups
        .into_iter()
        .map(|(key, points)| Series {
            respondent: store.respondent(key).name.clone(),
            points,
        })
        .collect()
}

/// Build every chart of a route page.
///
/// `clock[i]` is the x-axis value of the i-th row of `subset`; rows without
/// one are left out of the time-based charts only.
pub fn route_charts(subset: &Subset<'_>, clock: &[Option<f64>], gaze: GazeSource) -> RouteCharts {
    let order = chronological(subset);
    let over_time = |field: Field| {
        per_respondent(subset, &order, |pos, r| Some([clock[pos]?, field.get(r)?]))
    };
    let (gx, gy) = match gaze {
        GazeSource::Raw => (Field::GazeX, Field::GazeY),
        GazeSource::Interpolated => (Field::InterpolatedGazeX, Field::InterpolatedGazeY),
    };

    let blinks = per_respondent(subset, &order, |_, r| r.blink)
        .into_iter()
        .map(|s| BlinkCounts {
            blink: s.points.iter().filter(|b| **b).count(),
            no_blink: s.points.iter().filter(|b| !**b).count(),
            respondent: s.respondent,
        })
        .collect();

    let records: Vec<&SensorRecord> = subset.records().collect();
    let fixations = order
        .iter()
        .filter_map(|&pos| {
            let r = records[pos];
            Some(FixationPoint {
                x: r.fixation_x?,
                y: r.fixation_y?,
                dispersion: r.fixation_dispersion,
                duration: r.fixation_duration,
            })
        })
        .collect();

    RouteCharts {
        gaze: per_respondent(subset, &order, |_, r| Some([gx.get(r)?, gy.get(r)?])),
        gaze_3d: per_respondent(subset, &order, |_, r| {
            Some([r.gaze_3d_x?, r.gaze_3d_y?, r.gaze_3d_z?])
        }),
        pupils: per_respondent(subset, &order, |_, r| Some([r.pupil_left?, r.pupil_right?])),
        blinks,
        fixations,
        peaks_detected: per_respondent(subset, &order, |pos, r| {
            Some([clock[pos]?, if r.peak_detected? { 1.0 } else { 0.0 }])
        }),
        time_series: TIME_CHANNELS
            .iter()
            .map(|&field| ChannelSeries {
                channel: field.header(),
                series: over_time(field),
            })
            .collect(),
    }
}
