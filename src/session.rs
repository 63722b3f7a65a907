//! Per-session state: the filter selection and the last view of each page.
//!
//! Sessions are independent. The registry is the only shared structure and
//! is bounded; the least recently created session goes first.

use serde::Serialize;
use serde_json::json;
use std::collections::{HashMap, VecDeque};

use crate::data::DatasetStore;
use crate::filter::{DefaultSelection, FilterControl, FilterState};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::outcome::{Outcome, SuppressReason};
use crate::view::{render_view, PageId, PageView, ViewContext};

#[derive(Debug, Default)]
struct Session {
    filter: Option<FilterState>,
    /// Bumped on every filter update.
    revision: u64,
    /// Keyed by page path; only pages that read the filters are kept.
    last_views: HashMap<String, PageView>,
}

/// What the shell sends back for one view request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewResponse {
    /// Set when this cycle produced nothing; `view` is then the previous one.
    pub suppressed: Option<SuppressReason>,
    pub view: Option<PageView>,
}

#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
    order: VecDeque<String>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            order: VecDeque::new(),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn session_mut(&mut self, id: &str) -> &mut Session {
        if !self.sessions.contains_key(id) {
            while self.sessions.len() >= self.max_sessions {
                let Some(oldest) = self.order.pop_front() else { break };
                self.sessions.remove(&oldest);
                log(
                    Level::Info,
                    Domain::Session,
                    "session_evicted",
                    obj(&[("session", v_str(&oldest))]),
                );
            }
            self.order.push_back(id.to_string());
            log(Level::Debug, Domain::Session, "session_created", obj(&[("session", v_str(id))]));
        }
        self.sessions.entry(id.to_string()).or_default()
    }

    /// The session's selection, or the default when it has none yet.
    pub fn filter_state(&mut self, id: &str, store: &DatasetStore, policy: DefaultSelection) -> FilterState {
        let stored = self.session_mut(id).filter.clone();
        FilterState::resolve(stored, store, policy)
    }

    /// The selection together with the revision it was read at, for a
    /// later [`SessionRegistry::settle`].
    pub fn snapshot(&mut self, id: &str, store: &DatasetStore, policy: DefaultSelection) -> (FilterState, u64) {
        let revision = self.session_mut(id).revision;
        (self.filter_state(id, store, policy), revision)
    }

    /// Merge one control interaction into the session and return the result.
    pub fn update_filters(
        &mut self,
        id: &str,
        control: &FilterControl,
        store: &DatasetStore,
        policy: DefaultSelection,
    ) -> FilterState {
        let session = self.session_mut(id);
        let mut state = FilterState::resolve(session.filter.take(), store, policy);
        state.apply_control(control);
        session.filter = Some(state.clone());
        session.revision += 1;
        log(
            Level::Info,
            Domain::Filter,
            "filters_updated",
            obj(&[
                ("session", v_str(id)),
                ("names", json!(state.names.len())),
                ("genders", json!(state.genders)),
                ("age", json!(state.age)),
                ("time", json!(state.time)),
            ]),
        );
        state
    }

    /// Record a finished cycle rendered from the filters at `revision`.
    ///
    /// A suppressed cycle leaves the stored view for that page alone and
    /// re-serves it. A ready view is kept only for pages that read the
    /// filters, and only while the filters are still those it was rendered
    /// from.
    pub fn settle(&mut self, id: &str, page: &PageId, revision: u64, outcome: Outcome<PageView>) -> ViewResponse {
        let session = self.session_mut(id);
        let key = page.path();
        match outcome {
            Outcome::Ready(view) => {
                if !page.reads_filters() {
                    // never suppressed, nothing to fall back to
                } else if revision == session.revision {
                    session.last_views.insert(key, view.clone());
                } else {
                    log(
                        Level::Debug,
                        Domain::Session,
                        "stale_view_not_kept",
                        obj(&[
                            ("session", v_str(id)),
                            ("page", v_str(&key)),
                            ("rendered_revision", json!(revision)),
                            ("current_revision", json!(session.revision)),
                        ]),
                    );
                }
                ViewResponse {
                    suppressed: None,
                    view: Some(view),
                }
            }
            Outcome::Suppressed(reason) => {
                let previous = session.last_views.get(&key).cloned();
                log(
                    Level::Info,
                    Domain::Session,
                    "previous_view_kept",
                    obj(&[
                        ("session", v_str(id)),
                        ("page", v_str(&key)),
                        ("reason", v_str(&reason.to_string())),
                        ("has_previous", json!(previous.is_some())),
                    ]),
                );
                ViewResponse {
                    suppressed: Some(reason),
                    view: previous,
                }
            }
        }
    }

    /// Resolve the session's state, render `page` and settle the outcome.
    pub fn render(
        &mut self,
        id: &str,
        page: &PageId,
        store: &DatasetStore,
        policy: DefaultSelection,
        ctx: &ViewContext,
    ) -> ViewResponse {
        let (state, revision) = self.snapshot(id, store, policy);
        let outcome = render_view(store, &state, page, ctx);
        self.settle(id, page, revision, outcome)
    }
}
