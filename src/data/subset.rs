use std::collections::BTreeSet;

use super::{DatasetStore, RespondentKey, SensorRecord};

/// A selection of rows of a [`DatasetStore`], kept as ascending row indices.
///
/// Subsets borrow the store instead of copying records, so a filter or
/// segmentation pass costs one index vector.
#[derive(Debug, Clone)]
pub struct Subset<'a> {
    store: &'a DatasetStore,
    rows: Vec<usize>,
}

impl<'a> Subset<'a> {
    pub(crate) fn new(store: &'a DatasetStore, rows: Vec<usize>) -> Self {
        Self { store, rows }
    }

    pub fn store(&self) -> &'a DatasetStore {
        self.store
    }

    /// Row indices into [`DatasetStore::records`].
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &'a SensorRecord> + '_ {
        let store: &'a DatasetStore = self.store;
        let records = store.records();
        self.rows.iter().map(move |&i| &records[i])
    }

    /// Rows matching `keep`, preserving order.
    pub fn retain(&self, mut keep: impl FnMut(&SensorRecord) -> bool) -> Subset<'a> {
        let records = self.store.records();
        let rows = self
            .rows
            .iter()
            .copied()
            .filter(|&i| keep(&records[i]))
            .collect();
        Subset::new(self.store, rows)
    }

    pub fn respondent_keys(&self) -> BTreeSet<RespondentKey> {
        self.records().map(|r| r.respondent).collect()
    }

    pub fn respondent_count(&self) -> usize {
        self.respondent_keys().len()
    }

    /// Names of the respondents present, in store order.
    pub fn respondent_names(&self) -> Vec<String> {
        self.respondent_keys()
            .into_iter()
            .map(|k| self.store.respondent(k).name.clone())
            .collect()
    }

    pub fn is_subset_of(&self, other: &Subset<'_>) -> bool {
        let theirs: BTreeSet<usize> = other.rows.iter().copied().collect();
        self.rows.iter().all(|i| theirs.contains(i))
    }
}

impl PartialEq for Subset<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.store, other.store) && self.rows == other.rows
    }
}
