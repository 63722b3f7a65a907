//! Cohort facts for the home page: who was recorded, and when.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::data::Subset;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenderCount {
    pub gender: String,
    pub respondents: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeCount {
    pub age: u32,
    pub respondents: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingStart {
    pub name: String,
    pub start: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortOverview {
    pub respondent_count: usize,
    /// Most common recording date over the subset's rows.
    pub recording_date: Option<NaiveDate>,
    pub genders: Vec<GenderCount>,
    pub ages: Vec<AgeCount>,
    pub recording_starts: Vec<RecordingStart>,
}

pub fn cohort_overview(subset: &Subset<'_>) -> CohortOverview {
    let store = subset.store();
    let keys = subset.respondent_keys();

    let mut genders: BTreeMap<String, usize> = BTreeMap::new();
    let mut ages: BTreeMap<u32, usize> = BTreeMap::new();
    let mut recording_starts = Vec::with_capacity(keys.len());
    for key in &keys {
        let r = store.respondent(*key);
        *genders.entry(r.gender.clone()).or_insert(0) += 1;
        *ages.entry(r.age).or_insert(0) += 1;
        recording_starts.push(RecordingStart {
            name: r.name.clone(),
            start: r.recording_start,
        });
    }
    recording_starts.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.name.cmp(&b.name)));

    // weighted by rows, earliest date wins a tie
    let mut dates: HashMap<NaiveDate, usize> = HashMap::new();
    for r in subset.records() {
        *dates
            .entry(store.respondent(r.respondent).recording_start.date())
            .or_insert(0) += 1;
    }
    let recording_date = dates
        .into_iter()
        .max_by(|(da, ca), (db, cb)| ca.cmp(cb).then_with(|| db.cmp(da)))
        .map(|(d, _)| d);

    CohortOverview {
        respondent_count: keys.len(),
        recording_date,
        genders: genders
            .into_iter()
            .map(|(gender, respondents)| GenderCount { gender, respondents })
            .collect(),
        ages: ages
            .into_iter()
            .map(|(age, respondents)| AgeCount { age, respondents })
            .collect(),
        recording_starts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DatasetBuilder, SensorRecord};

    fn day(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn counts_respondents_not_rows() {
        let mut b = DatasetBuilder::new("t");
        let a = b.respondent("A", "MALE", 17, day(1, 9));
        let bb = b.respondent("B", "FEMALE", 16, day(2, 9));
        let c = b.respondent("C", "MALE", 17, day(2, 10));
        for _ in 0..5 {
            b.push(SensorRecord::new(a, day(1, 9)));
        }
        b.push(SensorRecord::new(bb, day(2, 9)));
        b.push(SensorRecord::new(c, day(2, 10)));
        let store = b.build();

        let o = cohort_overview(&store.all());
        assert_eq!(o.respondent_count, 3);
        assert_eq!(
            o.genders,
            vec![
                GenderCount { gender: "FEMALE".into(), respondents: 1 },
                GenderCount { gender: "MALE".into(), respondents: 2 },
            ]
        );
        assert_eq!(o.ages[0], AgeCount { age: 16, respondents: 1 });
        assert_eq!(o.ages[1], AgeCount { age: 17, respondents: 2 });
        // A's five rows outweigh B and C
        assert_eq!(o.recording_date, NaiveDate::from_ymd_opt(2021, 6, 1));
        assert_eq!(o.recording_starts[0].name, "A");
    }

    #[test]
    fn date_tie_prefers_earliest() {
        let mut b = DatasetBuilder::new("t");
        let a = b.respondent("A", "MALE", 17, day(3, 9));
        let bb = b.respondent("B", "FEMALE", 16, day(2, 9));
        b.push(SensorRecord::new(a, day(3, 9)));
        b.push(SensorRecord::new(bb, day(2, 9)));
        let store = b.build();
        let o = cohort_overview(&store.all());
        assert_eq!(o.recording_date, NaiveDate::from_ymd_opt(2021, 6, 2));
    }

    #[test]
    fn empty_subset_has_no_date() {
        let store = DatasetBuilder::new("t").build();
        let o = cohort_overview(&store.all());
        assert_eq!(o.respondent_count, 0);
        assert_eq!(o.recording_date, None);
    }
}
