use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashMap};

use streetscape::data::{DatasetBuilder, DatasetStore, SensorRecord, Subset};
use streetscape::filter::{apply_filters, AgeRange, FilterState, TimeWindow};
use streetscape::outcome::{Outcome, SuppressReason};
use streetscape::relative_time::derive_relative_time;
use streetscape::stats::{aggregate, Metric};
use streetscape::viewpoint::{segment, RouteScope, Viewpoint};

const GENDERS: [&str; 2] = ["MALE", "FEMALE"];

fn day_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 6, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

fn random_store(rng: &mut StdRng) -> DatasetStore {
    let mut b = DatasetBuilder::new("random");
    let respondents = rng.gen_range(2..7);
    for i in 0..respondents {
        let start = day_start() + TimeDelta::minutes(rng.gen_range(0..360));
        let key = b.respondent(
            &format!("R{}", i),
            GENDERS[rng.gen_range(0..2)],
            rng.gen_range(14..21),
            start,
        );
        let mut ts = start;
        for _ in 0..rng.gen_range(20..120) {
            ts += TimeDelta::milliseconds(rng.gen_range(10..20_000));
            let viewpoint = match rng.gen_range(0..6) {
                0 => None,
                n => Viewpoint::from_number(n),
            };
            b.push(SensorRecord {
                viewpoint,
                blink: Some(rng.gen_bool(0.2)),
                peak_detected: Some(rng.gen_bool(0.1)),
                gsr_raw: rng.gen_bool(0.9).then(|| rng.gen_range(0.5..12.0)),
                fixation_index: rng.gen_bool(0.5).then(|| rng.gen_range(0..30)),
                fixation_duration: Some(rng.gen_range(50.0..600.0)),
                saccade_index: rng.gen_bool(0.3).then(|| rng.gen_range(0..30)),
                ..SensorRecord::new(key, ts)
            });
        }
    }
    b.build()
}

fn random_state(rng: &mut StdRng, store: &DatasetStore) -> FilterState {
    let names: BTreeSet<String> = store
        .respondents()
        .iter()
        .filter(|_| rng.gen_bool(0.7))
        .map(|r| r.name.clone())
        .collect();
    let mut state = FilterState {
        names,
        ..FilterState::default()
    };
    if rng.gen_bool(0.3) {
        state.genders = Some([GENDERS[rng.gen_range(0..2)].to_string()].into_iter().collect());
    }
    if rng.gen_bool(0.3) {
        let min = rng.gen_range(14..18);
        state.age = Some(AgeRange {
            min,
            max: min + rng.gen_range(0..4),
        });
    }
    if rng.gen_bool(0.3) {
        let begin = rng.gen_range(8..12);
        state.time = Some(TimeWindow::new(
            format!("{:02}:00", begin),
            format!("{:02}:30", begin + rng.gen_range(0..4)),
        ));
    }
    state
}

fn rows(outcome: &Outcome<Subset<'_>>) -> usize {
    match outcome {
        Outcome::Ready(subset) => subset.len(),
        Outcome::Suppressed(_) => 0,
    }
}

#[test]
fn filtering_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..30 {
        let store = random_store(&mut rng);
        let state = random_state(&mut rng, &store);
        assert_eq!(apply_filters(&store, &state), apply_filters(&store, &state));
    }
}

#[test]
fn tightening_never_adds_rows() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..30 {
        let store = random_store(&mut rng);
        let state = random_state(&mut rng, &store);
        let base = apply_filters(&store, &state);

        let mut fewer_names = state.clone();
        if let Some(first) = fewer_names.names.iter().next().cloned() {
            fewer_names.names.remove(&first);
        }
        let mut narrower_age = state.clone();
        narrower_age.age = Some(match state.age {
            Some(r) => AgeRange { min: r.min + 1, max: r.max },
            None => AgeRange { min: 16, max: 18 },
        });
        let mut one_gender = state.clone();
        one_gender.genders = Some(["FEMALE".to_string()].into_iter().collect());
        let mut shorter_time = state.clone();
        shorter_time.time = Some(match &state.time {
            // collapse a valid window onto its first instant
            Some(w) if w.bounds().is_some() => TimeWindow::new(w.begin.clone(), w.begin.clone()),
            _ => TimeWindow::new("09:00", "11:00"),
        });

        for tighter in [fewer_names, narrower_age, one_gender, shorter_time] {
            let narrowed = apply_filters(&store, &tighter);
            assert!(rows(&narrowed) <= rows(&base));
            if let (Outcome::Ready(small), Outcome::Ready(big)) = (&narrowed, &base) {
                assert!(small.is_subset_of(big));
            }
        }
    }
}

#[test]
fn aggregate_always_has_five_rows() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..10 {
        let store = random_store(&mut rng);
        let state = random_state(&mut rng, &store);
        let subset = apply_filters(&store, &state).ready().unwrap_or_else(|| store.none());
        let stats = aggregate(&subset);
        let order: Vec<Viewpoint> = stats.iter().map(|s| s.viewpoint).collect();
        assert_eq!(order, Viewpoint::ALL.to_vec());
    }
}

#[test]
fn viewpoint_segments_partition_the_route() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..20 {
        let store = random_store(&mut rng);
        let full = store.all();
        let mut seen: BTreeSet<usize> = BTreeSet::new();
        for vp in Viewpoint::ALL {
            if let Outcome::Ready(seg) = segment(&full, RouteScope::Viewpoint(vp)) {
                assert!(seg.subset.is_subset_of(&full));
                assert!(seg.subset.records().all(|r| r.viewpoint == Some(vp)));
                for row in seg.subset.rows() {
                    assert!(seen.insert(*row), "row {} in two segments", row);
                }
            }
        }
        let with_viewpoint = full.records().filter(|r| r.viewpoint.is_some()).count();
        assert_eq!(seen.len(), with_viewpoint);

        let route = segment(&full, RouteScope::FullRoute).ready().unwrap();
        assert_eq!(route.subset, full);
        assert!(route.background.is_none());
    }
}

#[test]
fn relative_time_starts_at_zero_per_visit() {
    let mut rng = StdRng::seed_from_u64(13);
    for _ in 0..20 {
        let store = random_store(&mut rng);
        let timed = derive_relative_time(&store.all());
        let mut minima: HashMap<(usize, Viewpoint), f64> = HashMap::new();
        for (record, rel) in timed.iter() {
            match (record.viewpoint, rel) {
                (Some(vp), Some(t)) => {
                    assert!(t >= 0.0);
                    let m = minima.entry((record.respondent.index(), vp)).or_insert(t);
                    *m = m.min(t);
                }
                (None, rel) => assert_eq!(rel, None),
                (Some(_), None) => panic!("viewpoint row without relative time"),
            }
        }
        assert!(minima.values().all(|m| *m == 0.0));
    }
}

fn two_respondents() -> DatasetStore {
    let mut b = DatasetBuilder::new("scenario");
    let a = b.respondent("A", "MALE", 17, day_start());
    let bb = b.respondent("B", "FEMALE", 16, day_start());
    for (i, blink) in [true, false, true].into_iter().enumerate() {
        b.push(SensorRecord {
            viewpoint: Some(Viewpoint::One),
            blink: Some(blink),
            ..SensorRecord::new(a, day_start() + TimeDelta::hours(2) + TimeDelta::seconds(i as i64))
        });
    }
    b.push(SensorRecord {
        viewpoint: Some(Viewpoint::Two),
        blink: Some(false),
        ..SensorRecord::new(bb, day_start() + TimeDelta::hours(3))
    });
    b.build()
}

#[test]
fn names_filter_keeps_only_selected_respondent() {
    let store = two_respondents();
    let subset = apply_filters(&store, &FilterState::for_names(["A"])).ready().unwrap();
    assert_eq!(subset.len(), 3);
    assert_eq!(subset.respondent_names(), vec!["A".to_string()]);

    let stats = aggregate(&subset);
    assert_eq!(stats[0].blink_rate, Metric::Value(0.6667));
    assert_eq!(stats[1].blink_rate, Metric::NoData);
}

#[test]
fn empty_selection_is_suppressed_not_empty() {
    let store = two_respondents();
    assert_eq!(
        apply_filters(&store, &FilterState::default()),
        Outcome::Suppressed(SuppressReason::NoMatchingRows)
    );
    let mut nobody_that_old = FilterState::for_names(["A", "B"]);
    nobody_that_old.age = Some(AgeRange { min: 40, max: 50 });
    assert!(apply_filters(&store, &nobody_that_old).is_suppressed());
}

#[test]
fn out_of_range_time_bound_is_ignored() {
    let store = two_respondents();
    let plain = FilterState::for_names(["A", "B"]);
    let bogus = FilterState {
        time: Some(TimeWindow::new("25:00", "12:00")),
        ..plain.clone()
    };
    assert_eq!(apply_filters(&store, &bogus), apply_filters(&store, &plain));

    // A's rows are at 10:00, B's at 11:00
    let morning = FilterState {
        time: Some(TimeWindow::new("09:30", "10:30")),
        ..plain
    };
    let subset = apply_filters(&store, &morning).ready().unwrap();
    assert_eq!(subset.respondent_names(), vec!["A".to_string()]);
}
