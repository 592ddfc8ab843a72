/// Sidebar navigation state.
///
/// Two independent axes:
/// - `expanded_topic`: at most one topic section open (accordion)
/// - `mobile_sidebar_open`: hamburger state, only meaningful on narrow viewports
///
/// Route matching is a pure scan over the manifest; `on_route_change` applies it
/// to the state and only ever sets the expanded topic, never clears it.
use crate::manifest::TopicManifest;
use crate::slug::chapter_route;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationState {
    expanded_topic: Option<usize>,
    mobile_sidebar_open: bool,
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore state carried over from a previous render.
    pub fn from_parts(expanded_topic: Option<usize>, mobile_sidebar_open: bool) -> Self {
        Self {
            expanded_topic,
            mobile_sidebar_open,
        }
    }

    pub fn expanded_topic(&self) -> Option<usize> {
        self.expanded_topic
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.expanded_topic == Some(index)
    }

    pub fn is_mobile_sidebar_open(&self) -> bool {
        self.mobile_sidebar_open
    }

    /// Close `index` if it is open, otherwise open only `index`.
    pub fn toggle(&mut self, index: usize) {
        self.expanded_topic = if self.expanded_topic == Some(index) {
            None
        } else {
            Some(index)
        };
    }

    pub fn toggle_mobile_sidebar(&mut self) {
        self.mobile_sidebar_open = !self.mobile_sidebar_open;
    }

    /// Expand the topic owning `path`. Non-matching paths (e.g. `/`) leave the
    /// current expansion untouched.
    pub fn on_route_change(&mut self, manifest: &TopicManifest, path: &str) {
        if let Some(index) = compute_expanded_index(manifest, path) {
            self.expanded_topic = Some(index);
        }
    }

    /// Drop an expanded index that does not exist in `manifest`.
    pub fn clamp_to(&mut self, manifest: &TopicManifest) {
        if self.expanded_topic.is_some_and(|i| i >= manifest.len()) {
            self.expanded_topic = None;
        }
    }

    /// Apply a navigation event; page-level events are ignored.
    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::ToggleTopic(index) => self.toggle(index),
            UiEvent::ToggleSidebar => self.toggle_mobile_sidebar(),
            UiEvent::ToggleHint | UiEvent::ToggleSolution | UiEvent::ToggleQuizSolution => {}
        }
    }
}

/// Index of the first topic (manifest order, then chapter order) with a chapter
/// routed at `path`.
pub fn compute_expanded_index(manifest: &TopicManifest, path: &str) -> Option<usize> {
    manifest.find_route(path).map(|c| c.topic_index)
}

/// Exact-match check used to highlight the current chapter link.
pub fn is_active(route: &str, current_path: &str) -> bool {
    route == current_path
}

/// A user interaction that keeps the current route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    ToggleTopic(usize),
    ToggleSidebar,
    ToggleHint,
    ToggleSolution,
    ToggleQuizSolution,
}

// --- Sidebar view model ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarTopic {
    pub index: usize,
    pub title: String,
    pub expanded: bool,
    /// Populated only for the expanded topic.
    pub chapters: Vec<SidebarChapter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarChapter {
    pub title: String,
    pub route: String,
    pub active: bool,
}

/// Pure function of (manifest, state, current path), recomputed on every render.
pub fn sidebar(
    manifest: &TopicManifest,
    state: &NavigationState,
    current_path: &str,
) -> Vec<SidebarTopic> {
    manifest
        .topics()
        .iter()
        .enumerate()
        .map(|(index, topic)| {
            let expanded = state.is_expanded(index);
            let chapters = if expanded {
                topic
                    .chapters
                    .iter()
                    .map(|chapter| {
                        let route = chapter_route(&topic.category, chapter);
                        SidebarChapter {
                            title: chapter.clone(),
                            active: is_active(&route, current_path),
                            route,
                        }
                    })
                    .collect()
            } else {
                Vec::new()
            };
            SidebarTopic {
                index,
                title: topic.title.clone(),
                expanded,
                chapters,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::tests::sample_manifest;

    #[test]
    fn test_toggle_twice_closes() {
        for i in 0..3 {
            let mut state = NavigationState::new();
            state.toggle(i);
            assert_eq!(state.expanded_topic(), Some(i));
            state.toggle(i);
            assert_eq!(state.expanded_topic(), None);
        }
    }

    #[test]
    fn test_toggle_other_opens_only_that_one() {
        let mut state = NavigationState::new();
        state.toggle(0);
        state.toggle(2);
        assert_eq!(state.expanded_topic(), Some(2));
        assert!(!state.is_expanded(0));
        assert!(state.is_expanded(2));
    }

    #[test]
    fn test_route_change_overrides_user_state() {
        let manifest = sample_manifest();
        let path = "/memory-allocation/introduction-to-new-and-delete";
        for prior in [None, Some(0), Some(1), Some(2)] {
            let mut state = NavigationState::from_parts(prior, false);
            state.on_route_change(&manifest, path);
            assert_eq!(state.expanded_topic(), Some(1));
        }
    }

    #[test]
    fn test_route_change_without_match_keeps_expansion() {
        let manifest = sample_manifest();
        let mut state = NavigationState::from_parts(Some(2), true);
        state.on_route_change(&manifest, "/");
        assert_eq!(state.expanded_topic(), Some(2));

        let mut closed = NavigationState::new();
        closed.on_route_change(&manifest, "/nowhere/at-all");
        assert_eq!(closed.expanded_topic(), None);
    }

    #[test]
    fn test_sidebar_toggle_is_independent() {
        let manifest = sample_manifest();
        let mut state = NavigationState::new();
        state.toggle_mobile_sidebar();
        state.toggle(1);
        assert!(state.is_mobile_sidebar_open());
        state.on_route_change(&manifest, "/introduction/what-is-c");
        assert!(state.is_mobile_sidebar_open());
        assert_eq!(state.expanded_topic(), Some(0));
        state.toggle_mobile_sidebar();
        assert!(!state.is_mobile_sidebar_open());
        assert_eq!(state.expanded_topic(), Some(0));
    }

    #[test]
    fn test_clamp_drops_out_of_range_index() {
        let manifest = sample_manifest();
        let mut state = NavigationState::from_parts(Some(7), false);
        state.clamp_to(&manifest);
        assert_eq!(state.expanded_topic(), None);

        let mut in_range = NavigationState::from_parts(Some(2), false);
        in_range.clamp_to(&manifest);
        assert_eq!(in_range.expanded_topic(), Some(2));
    }

    #[test]
    fn test_single_chapter_manifest_marks_link_active() {
        let manifest = TopicManifest::from_json(
            r#"[{"category":"intro","title":"Intro","chapters":["What is C++?"]}]"#,
        )
        .unwrap();
        let mut state = NavigationState::new();
        state.on_route_change(&manifest, "/intro/what-is-c");
        assert_eq!(state.expanded_topic(), Some(0));

        let topics = sidebar(&manifest, &state, "/intro/what-is-c");
        assert_eq!(topics.len(), 1);
        assert!(topics[0].expanded);
        assert_eq!(topics[0].chapters[0].route, "/intro/what-is-c");
        assert!(topics[0].chapters[0].active);
    }

    #[test]
    fn test_sidebar_lists_chapters_of_expanded_topic_only() {
        let manifest = sample_manifest();
        let state = NavigationState::from_parts(Some(1), false);
        let topics = sidebar(&manifest, &state, "/introduction/what-is-c");
        assert!(topics[0].chapters.is_empty());
        assert_eq!(topics[1].chapters.len(), 2);
        assert!(topics[1].chapters.iter().all(|c| !c.active));
        assert!(topics[2].chapters.is_empty());
    }

    #[test]
    fn test_apply_ignores_page_events() {
        let mut state = NavigationState::from_parts(Some(1), false);
        state.apply(UiEvent::ToggleHint);
        state.apply(UiEvent::ToggleQuizSolution);
        assert_eq!(state, NavigationState::from_parts(Some(1), false));
        state.apply(UiEvent::ToggleTopic(1));
        state.apply(UiEvent::ToggleSidebar);
        assert_eq!(state, NavigationState::from_parts(None, true));
    }
}
