//! The render cycle: filter, segment, then derive what a page shows.
//!
//! [`render`] borrows the store and produces a [`RenderCycle`]; a
//! [`PageView`] is its owned, serializable snapshot handed to the shell and
//! kept by the session as the "previous view".

use serde::Serialize;
use serde_json::json;

use crate::assets::AssetDir;
use crate::data::{DatasetStore, Subset};
use crate::filter::{apply_filters, FilterState};
use crate::logging::{log, obj, v_str, Domain, Level, ProfileScope};
use crate::outcome::Outcome;
use crate::overview::{cohort_overview, CohortOverview};
use crate::quality::{quality_summary, QualitySummary, QualityThresholds};
use crate::relative_time::{derive_relative_time, route_clock, TimedSubset};
use crate::series::{route_charts, GazeSource, RouteCharts};
use crate::stats::{aggregate, ViewpointStats};
use crate::viewpoint::{segment, Background, RouteScope, Viewpoint};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageId {
    Home,
    FullRoute,
    Viewpoint(Viewpoint),
    Sources,
    NotFound(String),
}

impl PageId {
    /// Map a navigation path to a page. Unknown paths keep their text.
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim();
        let route = trimmed.strip_prefix('/').unwrap_or(trimmed);
        match route {
            "" => PageId::Home,
            "full-route" | "complete-route" => PageId::FullRoute,
            "sources" => PageId::Sources,
            other => other
                .strip_prefix("per-viewpoint-")
                .and_then(|n| n.parse::<u32>().ok())
                .and_then(Viewpoint::from_number)
                .map(PageId::Viewpoint)
                .unwrap_or_else(|| PageId::NotFound(trimmed.to_string())),
        }
    }

    /// Canonical path; also the key under which sessions keep views.
    pub fn path(&self) -> String {
        match self {
            PageId::Home => "/".to_string(),
            PageId::FullRoute => "/full-route".to_string(),
            PageId::Viewpoint(vp) => format!("/per-viewpoint-{}", vp.number()),
            PageId::Sources => "/sources".to_string(),
            PageId::NotFound(path) => path.clone(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            PageId::Home => "Home",
            PageId::FullRoute => "Data full route",
            PageId::Viewpoint(_) => "Data per viewpoint",
            PageId::Sources => "Sources",
            PageId::NotFound(_) => "Error 404",
        }
    }

    pub fn highlights_viewpoint_menu(&self) -> bool {
        matches!(self, PageId::Viewpoint(_))
    }

    /// Pages whose content depends on the session's filters.
    pub fn reads_filters(&self) -> bool {
        matches!(self, PageId::Home | PageId::FullRoute | PageId::Viewpoint(_))
    }

    pub fn scope(&self) -> Option<RouteScope> {
        match self {
            PageId::FullRoute => Some(RouteScope::FullRoute),
            PageId::Viewpoint(vp) => Some(RouteScope::Viewpoint(*vp)),
            _ => None,
        }
    }
}

/// Everything one recomputation derived for a page, borrowing the store.
#[derive(Debug, Clone)]
pub struct RenderCycle<'a> {
    pub page: PageId,
    pub subset: Subset<'a>,
    /// Home page only.
    pub stats: Option<[ViewpointStats; 5]>,
    /// Route pages only.
    pub timed: Option<TimedSubset<'a>>,
    pub background: Option<&'static Background>,
    pub title: &'static str,
    pub highlight_viewpoint_menu: bool,
}

/// Recompute `page` for `state`.
///
/// Home and route pages go through the filter engine and are suppressed when
/// nothing matches; route pages are also suppressed when the segment is
/// empty. Sources and not-found pages never look at the data.
pub fn render<'a>(store: &'a DatasetStore, state: &FilterState, page: &PageId) -> Outcome<RenderCycle<'a>> {
    let _scope = ProfileScope::with_context("render", &[("page", v_str(&page.path()))]);

    let blank = |subset: Subset<'a>| RenderCycle {
        page: page.clone(),
        subset,
        stats: None,
        timed: None,
        background: None,
        title: page.title(),
        highlight_viewpoint_menu: page.highlights_viewpoint_menu(),
    };

    let outcome = match page {
        PageId::Sources | PageId::NotFound(_) => Outcome::Ready(blank(store.none())),
        PageId::Home => apply_filters(store, state).map(|subset| RenderCycle {
            stats: Some(aggregate(&subset)),
            ..blank(subset)
        }),
        PageId::FullRoute | PageId::Viewpoint(_) => {
            let scope = page.scope().unwrap_or(RouteScope::FullRoute);
            apply_filters(store, state)
                .and_then(|subset| segment(&subset, scope))
                .map(|seg| RenderCycle {
                    timed: Some(derive_relative_time(&seg.subset)),
                    background: seg.background,
                    ..blank(seg.subset)
                })
        }
    };

    if let Outcome::Ready(cycle) = &outcome {
        log(
            Level::Debug,
            Domain::Stats,
            "rendered",
            obj(&[
                ("page", v_str(&page.path())),
                ("rows", json!(cycle.subset.len())),
                ("respondents", json!(cycle.subset.respondent_count())),
            ]),
        );
    }
    outcome
}

/// Inputs a page view needs besides the cycle itself.
#[derive(Debug, Clone, Default)]
pub struct ViewContext {
    pub thresholds: QualityThresholds,
    pub assets: Option<AssetDir>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    pub path: String,
    pub title: String,
    pub highlight_viewpoint_menu: bool,
    pub content: PageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageContent {
    Home(HomeView),
    Route(RouteView),
    Sources,
    NotFound { path: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeView {
    pub row_count: usize,
    pub stats: [ViewpointStats; 5],
    pub overview: CohortOverview,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteView {
    pub scope: RouteScope,
    pub row_count: usize,
    pub respondents: Vec<String>,
    pub background: Option<BackgroundView>,
    pub charts: RouteCharts,
    pub quality: QualitySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackgroundView {
    pub file: String,
    pub width: u32,
    pub height: u32,
    /// Inline image; absent when no asset directory is configured or the
    /// file could not be read.
    pub data_uri: Option<String>,
}

impl BackgroundView {
    fn load(background: &Background, assets: Option<&AssetDir>) -> Self {
        let data_uri = assets.and_then(|dir| match dir.background_data_uri(background) {
            Ok(uri) => Some(uri),
            Err(err) => {
                log(
                    Level::Warn,
                    Domain::System,
                    "background_unavailable",
                    obj(&[("file", v_str(background.file)), ("error", v_str(&err.to_string()))]),
                );
                None
            }
        });
        Self {
            file: background.file.to_string(),
            width: background.width,
            height: background.height,
            data_uri,
        }
    }
}

impl PageView {
    pub fn build(cycle: &RenderCycle<'_>, ctx: &ViewContext) -> Self {
        let content = match (&cycle.page, &cycle.stats, &cycle.timed) {
            (PageId::Home, Some(stats), _) => PageContent::Home(HomeView {
                row_count: cycle.subset.len(),
                stats: stats.clone(),
                overview: cohort_overview(&cycle.subset),
            }),
            (PageId::FullRoute, _, Some(_)) => {
                let clock = route_clock(&cycle.subset);
                PageContent::Route(Self::route(cycle, RouteScope::FullRoute, &clock, GazeSource::Interpolated, ctx))
            }
            (PageId::Viewpoint(vp), _, Some(timed)) => PageContent::Route(Self::route(
                cycle,
                RouteScope::Viewpoint(*vp),
                timed.relative(),
                GazeSource::Raw,
                ctx,
            )),
            (PageId::NotFound(path), _, _) => PageContent::NotFound { path: path.clone() },
            _ => PageContent::Sources,
        };
        Self {
            path: cycle.page.path(),
            title: cycle.title.to_string(),
            highlight_viewpoint_menu: cycle.highlight_viewpoint_menu,
            content,
        }
    }

    fn route(
        cycle: &RenderCycle<'_>,
        scope: RouteScope,
        clock: &[Option<f64>],
        gaze: GazeSource,
        ctx: &ViewContext,
    ) -> RouteView {
        RouteView {
            scope,
            row_count: cycle.subset.len(),
            respondents: cycle.subset.respondent_names(),
            background: cycle
                .background
                .map(|bg| BackgroundView::load(bg, ctx.assets.as_ref())),
            charts: route_charts(&cycle.subset, clock, gaze),
            quality: quality_summary(&cycle.subset, &ctx.thresholds),
        }
    }
}

/// Render `page` and snapshot it in one step.
pub fn render_view(store: &DatasetStore, state: &FilterState, page: &PageId, ctx: &ViewContext) -> Outcome<PageView> {
    render(store, state, page).map(|cycle| PageView::build(&cycle, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DatasetBuilder, SensorRecord};
    use crate::outcome::SuppressReason;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, s)
            .unwrap()
    }

    fn store() -> DatasetStore {
        let mut b = DatasetBuilder::new("t");
        let a = b.respondent("A", "MALE", 17, at(0));
        let bb = b.respondent("B", "FEMALE", 16, at(0));
        for (key, s, vp) in [
            (a, 0, Some(Viewpoint::One)),
            (a, 1, Some(Viewpoint::One)),
            (a, 2, None),
            (bb, 3, Some(Viewpoint::Two)),
        ] {
            b.push(SensorRecord {
                viewpoint: vp,
                gsr_raw: Some(1.0),
                ..SensorRecord::new(key, at(s))
            });
        }
        b.build()
    }

    #[test]
    fn parses_paths() {
        assert_eq!(PageId::parse("/"), PageId::Home);
        assert_eq!(PageId::parse(""), PageId::Home);
        assert_eq!(PageId::parse("/full-route"), PageId::FullRoute);
        assert_eq!(PageId::parse("/complete-route"), PageId::FullRoute);
        assert_eq!(PageId::parse("per-viewpoint-3"), PageId::Viewpoint(Viewpoint::Three));
        assert_eq!(PageId::parse("/sources"), PageId::Sources);
        assert_eq!(PageId::parse("/per-viewpoint-6"), PageId::NotFound("/per-viewpoint-6".into()));
        assert_eq!(PageId::parse("/nope"), PageId::NotFound("/nope".into()));
    }

    #[test]
    fn titles_and_menu_highlight() {
        assert_eq!(PageId::FullRoute.title(), "Data full route");
        assert_eq!(PageId::NotFound("/x".into()).title(), "Error 404");
        assert!(PageId::Viewpoint(Viewpoint::Two).highlights_viewpoint_menu());
        assert!(!PageId::FullRoute.highlights_viewpoint_menu());
        assert_eq!(PageId::Viewpoint(Viewpoint::Four).path(), "/per-viewpoint-4");
        assert!(PageId::Home.reads_filters());
        assert!(!PageId::Sources.reads_filters());
        assert!(!PageId::NotFound("/x".into()).reads_filters());
    }

    #[test]
    fn home_carries_stats_only() {
        let store = store();
        let state = FilterState::default_for(&store, Default::default());
        let cycle = render(&store, &state, &PageId::Home).ready().unwrap();
        assert!(cycle.stats.is_some());
        assert!(cycle.timed.is_none());
        assert_eq!(cycle.subset.len(), 4);
        assert_eq!(cycle.title, "Home");
    }

    #[test]
    fn viewpoint_page_is_segmented_with_background() {
        let store = store();
        let state = FilterState::for_names(["A", "B"]);
        let page = PageId::Viewpoint(Viewpoint::One);
        let cycle = render(&store, &state, &page).ready().unwrap();
        assert_eq!(cycle.subset.len(), 2);
        assert!(cycle.stats.is_none());
        assert_eq!(cycle.background, Some(Viewpoint::One.background()));
        assert!(cycle.highlight_viewpoint_menu);

        let view = PageView::build(&cycle, &ViewContext::default());
        match view.content {
            PageContent::Route(route) => {
                assert_eq!(route.respondents, vec!["A".to_string()]);
                assert_eq!(route.background.unwrap().data_uri, None);
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn suppression_reasons_follow_the_stage() {
        let store = store();
        let nobody = FilterState::default();
        assert_eq!(
            render(&store, &nobody, &PageId::FullRoute).map(|_| ()),
            Outcome::Suppressed(SuppressReason::NoMatchingRows)
        );
        let only_b = FilterState::for_names(["B"]);
        assert_eq!(
            render(&store, &only_b, &PageId::Viewpoint(Viewpoint::Five)).map(|_| ()),
            Outcome::Suppressed(SuppressReason::EmptySegment(Viewpoint::Five))
        );
    }

    #[test]
    fn static_pages_ignore_filters() {
        let store = store();
        let nobody = FilterState::default();
        let view = render_view(&store, &nobody, &PageId::parse("/missing"), &ViewContext::default())
            .ready()
            .unwrap();
        assert_eq!(view.title, "Error 404");
        assert_eq!(view.content, PageContent::NotFound { path: "/missing".into() });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["content"]["kind"], "not_found");
    }
}
