//! The per-session filter selection and the engine that applies it.

mod engine;

pub use engine::{apply_filters, parse_time_of_day};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::data::{normalize_gender, DatasetStore};

/// Inclusive age bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn contains(&self, age: u32) -> bool {
        self.min <= age && age <= self.max
    }
}

/// Time-of-day window as entered in the filter control (`HH:MM`).
///
/// Kept as text: an unparsable bound disables the window instead of being
/// rejected when stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub begin: String,
    pub end: String,
}

impl TimeWindow {
    pub fn new(begin: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            begin: begin.into(),
            end: end.into(),
        }
    }

    /// Both bounds, or `None` when either fails to parse.
    pub fn bounds(&self) -> Option<(NaiveTime, NaiveTime)> {
        Some((parse_time_of_day(&self.begin)?, parse_time_of_day(&self.end)?))
    }
}

/// Current respondent selection of one session.
///
/// `names` always applies; an empty set selects nobody. The other
/// dimensions apply only when present.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterState {
    pub names: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genders: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<AgeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeWindow>,
}

/// Which respondents a fresh session starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultSelection {
    #[default]
    AllRespondents,
    MostRecent,
}

impl FromStr for DefaultSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" | "all_respondents" => Ok(DefaultSelection::AllRespondents),
            "most_recent" | "latest" => Ok(DefaultSelection::MostRecent),
            other => Err(format!("unknown default selection '{}'", other)),
        }
    }
}

impl FilterState {
    pub fn for_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// The state a session gets before its first filter interaction.
    pub fn default_for(store: &DatasetStore, policy: DefaultSelection) -> Self {
        match policy {
            DefaultSelection::AllRespondents => {
                Self::for_names(store.respondents().iter().map(|r| r.name.clone()))
            }
            DefaultSelection::MostRecent => {
                Self::for_names(store.most_recent_respondent().map(|r| r.name.clone()))
            }
        }
    }

    /// Substitute the default for a missing state.
    pub fn resolve(state: Option<FilterState>, store: &DatasetStore, policy: DefaultSelection) -> Self {
        state.unwrap_or_else(|| Self::default_for(store, policy))
    }

    /// Merge one filter-control interaction into this state.
    pub fn apply_control(&mut self, control: &FilterControl) {
        if let Some(names) = &control.names {
            self.names = names.iter().map(|n| n.trim().to_string()).collect();
        }
        if let Some(genders) = &control.genders {
            self.genders = genders
                .as_ref()
                .map(|set| set.iter().map(|g| normalize_gender(g)).collect());
        }
        if let Some(age) = control.age {
            self.age = age;
        }
        if let Some(time) = &control.time {
            self.time = time.clone();
        }
    }
}

/// One edit coming from the filter controls.
///
/// Outer `None` leaves a dimension untouched; for the optional dimensions
/// `Some(None)` clears the constraint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterControl {
    #[serde(default)]
    pub names: Option<Vec<String>>,
    #[serde(default)]
    pub genders: Option<Option<Vec<String>>>,
    #[serde(default)]
    pub age: Option<Option<AgeRange>>,
    #[serde(default)]
    pub time: Option<Option<TimeWindow>>,
}

/// Choices offered by the filter controls, taken from the whole dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub names: Vec<String>,
    pub genders: Vec<String>,
    pub age: Option<AgeRange>,
}

impl FilterOptions {
    pub fn from_store(store: &DatasetStore) -> Self {
        let respondents = store.respondents();
        let genders: BTreeSet<String> = respondents.iter().map(|r| r.gender.clone()).collect();
        let age = respondents.iter().map(|r| r.age).fold(None, |acc: Option<AgeRange>, age| {
            Some(match acc {
                Some(range) => AgeRange {
                    min: range.min.min(age),
                    max: range.max.max(age),
                },
                None => AgeRange { min: age, max: age },
            })
        });
        Self {
            names: respondents.iter().map(|r| r.name.clone()).collect(),
            genders: genders.into_iter().collect(),
            age,
        }
    }
}
