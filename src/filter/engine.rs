use chrono::NaiveTime;

use super::FilterState;
use crate::data::{normalize_gender, DatasetStore, Subset};
use crate::logging::{log_filter_applied, log_suppressed, Domain, ProfileScope};
use crate::outcome::{Outcome, SuppressReason};

/// Parse an `HH:MM` time of day.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

/// Apply every active filter dimension (AND-combined) to the whole store.
///
/// Names, gender and age are respondent attributes, so they are decided
/// once per respondent; only the time window is checked per row. A
/// time window with an unparsable bound passes everything.
pub fn apply_filters<'a>(store: &'a DatasetStore, state: &FilterState) -> Outcome<Subset<'a>> {
    let _scope = ProfileScope::new("apply_filters");

    let admitted: Vec<bool> = store
        .respondents()
        .iter()
        .map(|r| {
            state.names.contains(&r.name)
                && state
                    .genders
                    .as_ref()
                    .map_or(true, |set| set.iter().any(|g| normalize_gender(g) == r.gender))
                && state.age.map_or(true, |range| range.contains(r.age))
        })
        .collect();

    let window = state.time.as_ref().and_then(|w| w.bounds());
    let subset = store.all().retain(|r| {
        admitted[r.respondent.index()]
            && window.map_or(true, |(begin, end)| {
                let t = r.timestamp.time();
                begin <= t && t <= end
            })
    });

    log_filter_applied(store.len(), subset.len(), subset.respondent_count(), window.is_some());

    if subset.is_empty() {
        log_suppressed(Domain::Filter, &SuppressReason::NoMatchingRows.to_string());
        return Outcome::Suppressed(SuppressReason::NoMatchingRows);
    }
    Outcome::Ready(subset)
}
