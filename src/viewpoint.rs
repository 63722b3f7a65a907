//! Viewpoints along the route and the segmenter that scopes a subset to one.

use serde::{Serialize, Serializer};

use crate::data::Subset;
use crate::logging::{log, log_suppressed, obj, Domain, Level};
use crate::outcome::{Outcome, SuppressReason};
use serde_json::json;

/// One of the five panoramic locations on the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Viewpoint {
    One,
    Two,
    Three,
    Four,
    Five,
}

/// Panorama shown behind the gaze overlay of a viewpoint page.
///
/// `width`/`height` are the intrinsic pixel size of the photograph; chart
/// layers use them so scatter overlays keep the image's aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Background {
    pub file: &'static str,
    pub width: u32,
    pub height: u32,
}

struct ViewpointEntry {
    column: &'static str,
    background: Background,
}

static VIEWPOINTS: [ViewpointEntry; 5] = [
    ViewpointEntry {
        column: "Viewpoint 1 active",
        background: Background { file: "viewpoint-1.png", width: 1200, height: 390 },
    },
    ViewpointEntry {
        column: "Viewpoint 2 active",
        background: Background { file: "viewpoint-2.png", width: 1200, height: 430 },
    },
    ViewpointEntry {
        column: "Viewpoint 3 active",
        background: Background { file: "viewpoint-3.png", width: 1200, height: 360 },
    },
    ViewpointEntry {
        column: "Viewpoint 4 active",
        background: Background { file: "viewpoint-4.png", width: 1200, height: 410 },
    },
    ViewpointEntry {
        column: "Viewpoint 5 active",
        background: Background { file: "viewpoint-5.png", width: 1200, height: 450 },
    },
];

impl Viewpoint {
    pub const ALL: [Viewpoint; 5] = [
        Viewpoint::One,
        Viewpoint::Two,
        Viewpoint::Three,
        Viewpoint::Four,
        Viewpoint::Five,
    ];

    /// 1-based number as used in column headers and page paths.
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// 0-based position in [`Viewpoint::ALL`].
    pub fn index(self) -> usize {
        match self {
            Viewpoint::One => 0,
            Viewpoint::Two => 1,
            Viewpoint::Three => 2,
            Viewpoint::Four => 3,
            Viewpoint::Five => 4,
        }
    }

    pub fn from_number(n: u32) -> Option<Self> {
        match n {
            1..=5 => Some(Self::ALL[n as usize - 1]),
            _ => None,
        }
    }

    /// Canonical "active" column header for this viewpoint.
    pub fn column_name(self) -> &'static str {
        VIEWPOINTS[self.index()].column
    }

    pub fn background(self) -> &'static Background {
        &VIEWPOINTS[self.index()].background
    }
}

impl Serialize for Viewpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

/// Which part of the route a page looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "viewpoint", rename_all = "snake_case")]
pub enum RouteScope {
    FullRoute,
    Viewpoint(Viewpoint),
}

/// A subset restricted to one route scope, with its background hint.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment<'a> {
    pub scope: RouteScope,
    pub subset: Subset<'a>,
    pub background: Option<&'static Background>,
}

/// Restrict `subset` to `scope`.
///
/// The full route passes through untouched. A viewpoint keeps only the rows
/// whose active flag names it; transition rows (no active flag) drop out.
pub fn segment<'a>(subset: &Subset<'a>, scope: RouteScope) -> Outcome<Segment<'a>> {
    let (rows, background) = match scope {
        RouteScope::FullRoute => (subset.clone(), None),
        RouteScope::Viewpoint(vp) => (
            subset.retain(|r| r.viewpoint == Some(vp)),
            Some(vp.background()),
        ),
    };

    log(
        Level::Debug,
        Domain::Segment,
        "segmented",
        obj(&[
            ("scope", json!(scope)),
            ("rows_in", json!(subset.len())),
            ("rows_out", json!(rows.len())),
        ]),
    );

    if rows.is_empty() {
        let reason = match scope {
            RouteScope::FullRoute => SuppressReason::NoMatchingRows,
            RouteScope::Viewpoint(vp) => SuppressReason::EmptySegment(vp),
        };
        log_suppressed(Domain::Segment, &reason.to_string());
        return Outcome::Suppressed(reason);
    }

    Outcome::Ready(Segment {
        scope,
        subset: rows,
        background,
    })
}
