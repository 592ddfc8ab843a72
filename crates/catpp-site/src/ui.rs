/// UI state carried between server renders in the query string (or form fields).
///
/// Links encode the state their click produces. `stay=1` marks a same-page
/// interaction; without it the request is a navigation and the route effect runs.
use catpp_core::manifest::TopicManifest;
use catpp_core::navigation::{NavigationState, UiEvent};
use catpp_core::page::PageViewState;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UiQuery {
    pub open: Option<usize>,
    pub sidebar: Option<u8>,
    pub hint: Option<u8>,
    pub solution: Option<u8>,
    pub quiz: Option<u8>,
    pub stay: Option<u8>,
}

fn flag(value: Option<u8>) -> bool {
    value == Some(1)
}

impl UiQuery {
    /// Reconstruct the state for rendering `path`.
    pub fn resolve(&self, manifest: &TopicManifest, path: &str) -> (NavigationState, PageViewState) {
        let mut nav = NavigationState::from_parts(self.open, flag(self.sidebar));
        nav.clamp_to(manifest);
        if flag(self.stay) {
            let view = PageViewState {
                show_hint: flag(self.hint),
                show_solution: flag(self.solution),
                show_quiz_solution: flag(self.quiz),
            };
            return (nav, view);
        }
        nav.on_route_change(manifest, path);
        (nav, PageViewState::default())
    }
}

/// Query string (without `?`) for the given state. Empty when everything is default.
pub fn encode(nav: &NavigationState, view: &PageViewState, stay: bool) -> String {
    let mut parts = Vec::new();
    if let Some(open) = nav.expanded_topic() {
        parts.push(format!("open={open}"));
    }
    for (key, on) in [
        ("sidebar", nav.is_mobile_sidebar_open()),
        ("hint", view.show_hint),
        ("solution", view.show_solution),
        ("quiz", view.show_quiz_solution),
        ("stay", stay),
    ] {
        if on {
            parts.push(format!("{key}=1"));
        }
    }
    parts.join("&")
}

fn with_query(path: &str, query: String) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

/// Link for a control on the current page: the state after `event`, marked `stay`.
pub fn event_href(path: &str, nav: &NavigationState, view: &PageViewState, event: UiEvent) -> String {
    let (mut nav, mut view) = (*nav, *view);
    nav.apply(event);
    view.apply(event);
    with_query(path, encode(&nav, &view, true))
}

/// Link to another route. Navigation state carries over, page toggles do not.
pub fn navigate_href(route: &str, nav: &NavigationState) -> String {
    with_query(route, encode(nav, &PageViewState::default(), false))
}
