//! JSON endpoints of the dashboard server.
//!
//! Routing works on the request target alone; `main` owns the sockets.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use url::Url;

use crate::config::Config;
use crate::data::{DatasetManifest, DatasetStore};
use crate::filter::{AgeRange, FilterControl, FilterOptions, TimeWindow};
use crate::session::SessionRegistry;
use crate::view::{render_view, PageId, ViewContext};

/// Everything the request handlers share.
pub struct AppState {
    pub store: DatasetStore,
    pub manifest: DatasetManifest,
    pub options: FilterOptions,
    pub sessions: Mutex<SessionRegistry>,
    pub view_ctx: ViewContext,
    pub cfg: Config,
}

impl AppState {
    pub fn new(cfg: Config, store: DatasetStore, manifest: DatasetManifest, view_ctx: ViewContext) -> Self {
        Self {
            options: FilterOptions::from_store(&store),
            sessions: Mutex::new(SessionRegistry::new(cfg.max_sessions)),
            store,
            manifest,
            view_ctx,
            cfg,
        }
    }

    fn sessions(&self) -> MutexGuard<'_, SessionRegistry> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status: 200,
                content_type: "application/json",
                body,
            },
            Err(err) => Self::text(500, &err.to_string()),
        }
    }

    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.to_string(),
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            204 => "No Content",
            400 => "Bad Request",
            404 => "Not Found",
            _ => "Internal Server Error",
        }
    }

    pub fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{}",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len(),
            self.body
        )
    }
}

/// Split `GET /path?q HTTP/1.1` into method and target.
pub fn parse_request_line(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    Some((method, target))
}

pub fn route(app: &AppState, method: &str, target: &str) -> Response {
    let url = match Url::parse("http://localhost").and_then(|base| base.join(target)) {
        Ok(url) => url,
        Err(err) => return Response::text(400, &format!("bad target: {}", err)),
    };
    let query: HashMap<String, String> = url.query_pairs().into_owned().collect();

    if method != "GET" {
        return Response::text(404, "Not Found");
    }
    match url.path() {
        "/api/health" => Response::json(&serde_json::json!({
            "status": "ok",
            "rows": app.store.len(),
            "sessions": app.sessions().len(),
        })),
        "/api/manifest" => Response::json(&app.manifest),
        "/api/respondents" => Response::json(&app.options),
        "/api/filters" => match (session_id(&query), control_from_query(&query)) {
            (Some(id), Ok(control)) => {
                let state = app.sessions().update_filters(id, &control, &app.store, app.cfg.default_selection);
                Response::json(&state)
            }
            (None, _) => Response::text(400, "missing session"),
            (_, Err(err)) => Response::text(400, &err.to_string()),
        },
        "/api/view" => {
            let Some(id) = session_id(&query) else {
                return Response::text(400, "missing session");
            };
            let page = PageId::parse(query.get("page").map(String::as_str).unwrap_or("/"));
            let policy = app.cfg.default_selection;
            // recompute outside the lock; settle drops the view if the
            // filters moved on meanwhile
            let (state, revision) = app.sessions().snapshot(id, &app.store, policy);
            let outcome = render_view(&app.store, &state, &page, &app.view_ctx);
            let response = app.sessions().settle(id, &page, revision, outcome);
            if response.suppressed.is_some() && response.view.is_none() {
                Response { status: 204, content_type: "application/json", body: String::new() }
            } else {
                Response::json(&response)
            }
        }
        _ => Response::text(404, "Not Found"),
    }
}

fn session_id(query: &HashMap<String, String>) -> Option<&str> {
    query.get("session").map(String::as_str).filter(|s| !s.is_empty())
}

fn list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build a control edit from query parameters.
///
/// A missing parameter leaves its dimension alone; an empty `genders`,
/// `age` or `time` clears it. `names=` selects nobody.
pub fn control_from_query(query: &HashMap<String, String>) -> Result<FilterControl> {
    let mut control = FilterControl {
        names: query.get("names").map(|raw| list(raw)),
        ..FilterControl::default()
    };
    if let Some(raw) = query.get("genders") {
        let genders = list(raw);
        control.genders = Some(if genders.is_empty() { None } else { Some(genders) });
    }
    if let Some(raw) = query.get("age") {
        control.age = Some(if raw.trim().is_empty() { None } else { Some(parse_age_range(raw)?) });
    }
    if let Some(raw) = query.get("time") {
        control.time = Some(if raw.trim().is_empty() {
            None
        } else {
            // kept as text; unparsable bounds disable the window later
            let (begin, end) = raw.split_once('-').unwrap_or((raw.as_str(), ""));
            Some(TimeWindow::new(begin.trim(), end.trim()))
        });
    }
    Ok(control)
}

fn parse_age_range(raw: &str) -> Result<AgeRange> {
    let (min, max) = raw
        .split_once('-')
        .ok_or_else(|| anyhow!("age range must look like MIN-MAX, got '{}'", raw))?;
    Ok(AgeRange {
        min: min.trim().parse().with_context(|| format!("age min '{}'", min))?,
        max: max.trim().parse().with_context(|| format!("age max '{}'", max))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn request_line_splits() {
        assert_eq!(
            parse_request_line("GET /api/view?page=/ HTTP/1.1"),
            Some(("GET", "/api/view?page=/"))
        );
        assert_eq!(parse_request_line("GET"), None);
    }

    #[test]
    fn query_maps_to_control() {
        let control = control_from_query(&query(&[
            ("names", "A, B"),
            ("genders", ""),
            ("age", "16-18"),
            ("time", "09:00-12:00"),
        ]))
        .unwrap();
        assert_eq!(control.names, Some(vec!["A".to_string(), "B".to_string()]));
        assert_eq!(control.genders, Some(None));
        assert_eq!(control.age, Some(Some(AgeRange { min: 16, max: 18 })));
        assert_eq!(control.time, Some(Some(TimeWindow::new("09:00", "12:00"))));
    }

    #[test]
    fn absent_params_leave_dimensions_alone() {
        let control = control_from_query(&query(&[("names", "")])).unwrap();
        assert_eq!(control.names, Some(vec![]));
        assert_eq!(control.genders, None);
        assert_eq!(control.age, None);
        assert_eq!(control.time, None);
    }

    #[test]
    fn bad_age_is_rejected() {
        assert!(control_from_query(&query(&[("age", "sixteen")])).is_err());
        assert!(control_from_query(&query(&[("age", "16-x")])).is_err());
    }

    #[test]
    fn response_has_status_line_and_length() {
        let http = Response::text(404, "Not Found").to_http();
        assert!(http.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(http.contains("Content-Length: 9\r\n"));
    }
}
