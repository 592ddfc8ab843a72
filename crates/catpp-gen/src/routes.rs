use std::path::Path;

use catpp_core::manifest::TopicManifest;
use catpp_core::page::chapter_file;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteStatus {
    pub route: String,
    pub has_page: bool,
}

/// Every chapter route in manifest order, with whether its page file exists
/// under `content_dir`.
pub fn route_statuses(manifest: &TopicManifest, content_dir: &Path) -> Vec<RouteStatus> {
    manifest
        .chapters()
        .map(|c| RouteStatus {
            route: c.route(),
            has_page: chapter_file(content_dir, &c.topic.category, c.chapter).is_file(),
        })
        .collect()
}
