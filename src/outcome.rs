use serde::Serialize;
use std::fmt;

use crate::viewpoint::Viewpoint;

/// Why a recomputation produced nothing to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "viewpoint", rename_all = "snake_case")]
pub enum SuppressReason {
    /// The filter state matched no rows of the dataset.
    NoMatchingRows,
    /// The filtered rows never visit the requested viewpoint.
    EmptySegment(Viewpoint),
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuppressReason::NoMatchingRows => write!(f, "no_matching_rows"),
            SuppressReason::EmptySegment(vp) => write!(f, "empty_segment_viewpoint_{}", vp.number()),
        }
    }
}

/// Result of one pipeline stage.
///
/// `Suppressed` tells the caller to keep its previous view. It is distinct
/// from `Ready` carrying an empty subset, which no stage ever produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ready(T),
    Suppressed(SuppressReason),
}

impl<T> Outcome<T> {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Outcome::Suppressed(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Outcome::Ready(v) => Some(v),
            Outcome::Suppressed(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ready(v) => Outcome::Ready(f(v)),
            Outcome::Suppressed(r) => Outcome::Suppressed(r),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Outcome<U>) -> Outcome<U> {
        match self {
            Outcome::Ready(v) => f(v),
            Outcome::Suppressed(r) => Outcome::Suppressed(r),
        }
    }
}
