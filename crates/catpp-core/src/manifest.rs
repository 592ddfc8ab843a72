/// Topic manifest model and loader.
///
/// The manifest is a JSON array of `{category, title, chapters}` objects. Array order
/// is display order, and chapter order defines the `(category, index) -> route` mapping.
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::slug::{chapter_route, format_chapter_path};

/// One curriculum section, e.g. "Memory Allocation" with its chapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// URL-safe slug, unique across the manifest, e.g. "memory-allocation"
    pub category: String,
    /// Display name, e.g. "Memory Allocation"
    pub title: String,
    /// Chapter display titles in display order
    pub chapters: Vec<String>,
}

/// A chapter resolved from a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterRef<'a> {
    pub topic_index: usize,
    pub chapter_index: usize,
    pub topic: &'a Topic,
    pub chapter: &'a str,
}

impl ChapterRef<'_> {
    pub fn slug(&self) -> String {
        format_chapter_path(self.chapter)
    }

    pub fn route(&self) -> String {
        chapter_route(&self.topic.category, self.chapter)
    }
}

/// Ordered, read-only topic list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TopicManifest {
    topics: Vec<Topic>,
}

impl TopicManifest {
    /// Build a manifest, rejecting duplicate categories.
    pub fn new(topics: Vec<Topic>) -> Result<Self, CoreError> {
        let mut seen = HashSet::new();
        for topic in &topics {
            if !seen.insert(topic.category.as_str()) {
                return Err(CoreError::DuplicateCategory(topic.category.clone()));
            }
        }
        Ok(Self { topics })
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let topics: Vec<Topic> = serde_json::from_str(json)?;
        Self::new(topics)
    }

    /// Pretty JSON with two-space indentation, the on-disk format of `topics.json`.
    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(&self.topics)?)
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Topic> {
        self.topics.get(index)
    }

    /// Every chapter in manifest order, then chapter order.
    pub fn chapters(&self) -> impl Iterator<Item = ChapterRef<'_>> {
        self.topics
            .iter()
            .enumerate()
            .flat_map(|(topic_index, topic)| {
                topic
                    .chapters
                    .iter()
                    .enumerate()
                    .map(move |(chapter_index, chapter)| ChapterRef {
                        topic_index,
                        chapter_index,
                        topic,
                        chapter,
                    })
            })
    }

    /// First chapter (in scan order) whose route equals `path` exactly.
    pub fn find_route(&self, path: &str) -> Option<ChapterRef<'_>> {
        self.chapters().find(|c| c.route() == path)
    }

    /// Route of the first chapter of the first topic, the home page's "Get Started" target.
    pub fn first_route(&self) -> Option<String> {
        self.chapters().next().map(|c| c.route())
    }
}

/// Where the manifest is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    File(PathBuf),
    Url(String),
}

impl ManifestSource {
    /// `http://` and `https://` locations are URLs, anything else is a file path.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else {
            Self::File(PathBuf::from(location))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
        }
    }
}

const URL_TIMEOUT: Duration = Duration::from_secs(10);

/// Loads the topic manifest. No retries: one read per call.
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    source: ManifestSource,
    http: reqwest::Client,
}

impl ManifestLoader {
    pub fn new(source: ManifestSource) -> Self {
        Self {
            source,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::new(ManifestSource::File(path.as_ref().to_path_buf()))
    }

    /// Read and parse the manifest, surfacing every failure.
    pub async fn try_load(&self) -> Result<TopicManifest, CoreError> {
        let raw = match &self.source {
            ManifestSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CoreError::Io {
                    path: path.display().to_string(),
                    source,
                })?,
            ManifestSource::Url(url) => {
                let http_err = |source| CoreError::Http {
                    url: url.clone(),
                    source,
                };
                self.http
                    .get(url)
                    .timeout(URL_TIMEOUT)
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map_err(http_err)?
                    .text()
                    .await
                    .map_err(http_err)?
            }
        };
        TopicManifest::from_json(&raw)
    }

    /// Soft-failing load: any error is logged and an empty manifest is returned,
    /// so navigation renders an empty list instead of failing the page.
    pub async fn load(&self) -> TopicManifest {
        match self.try_load().await {
            Ok(manifest) => {
                debug!(
                    source = %self.source.describe(),
                    topics = manifest.len(),
                    "manifest loaded"
                );
                manifest
            }
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "manifest load failed");
                TopicManifest::default()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_manifest() -> TopicManifest {
        TopicManifest::from_json(
            r#"[
  {"category": "introduction", "title": "Introduction", "chapters": ["What is C++?", "Pointers and Addresses"]},
  {"category": "memory-allocation", "title": "Memory Allocation", "chapters": ["Introduction to new and delete", "Allocating Arrays Dynamically"]},
  {"category": "advanced-topics", "title": "Advanced Topics", "chapters": ["Memory-Mapped Files"]}
]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_preserves_order() {
        let manifest = sample_manifest();
        let categories: Vec<&str> = manifest.topics().iter().map(|t| t.category.as_str()).collect();
        assert_eq!(categories, ["introduction", "memory-allocation", "advanced-topics"]);
        assert_eq!(manifest.topics()[1].chapters[1], "Allocating Arrays Dynamically");
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let err = TopicManifest::from_json(
            r#"[{"category":"a","title":"A","chapters":[]},{"category":"a","title":"B","chapters":[]}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateCategory(c) if c == "a"));
    }

    #[test]
    fn test_find_route() {
        let manifest = sample_manifest();
        let found = manifest.find_route("/memory-allocation/allocating-arrays-dynamically").unwrap();
        assert_eq!(found.topic_index, 1);
        assert_eq!(found.chapter_index, 1);
        assert_eq!(found.slug(), "allocating-arrays-dynamically");
        assert!(manifest.find_route("/memory-allocation/").is_none());
        assert!(manifest.find_route("/").is_none());
    }

    #[test]
    fn test_first_route() {
        assert_eq!(sample_manifest().first_route().as_deref(), Some("/introduction/what-is-c"));
        assert_eq!(TopicManifest::default().first_route(), None);
    }

    #[test]
    fn test_pretty_json_round_trips_through_loader_format() {
        let manifest = sample_manifest();
        let json = manifest.to_json_pretty().unwrap();
        assert!(json.starts_with("[\n  {"));
        assert_eq!(TopicManifest::from_json(&json).unwrap(), manifest);
    }

    #[test]
    fn test_source_parse() {
        assert_eq!(
            ManifestSource::parse("https://example.com/topics.json"),
            ManifestSource::Url("https://example.com/topics.json".to_string())
        );
        assert_eq!(
            ManifestSource::parse("public/topics.json"),
            ManifestSource::File(PathBuf::from("public/topics.json"))
        );
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("catpp-manifest-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("topics.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let path = temp_file("ok", r#"[{"category":"intro","title":"Intro","chapters":["What is C++?"]}]"#);
        let manifest = ManifestLoader::from_path(&path).load().await;
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.topics()[0].title, "Intro");
    }

    #[tokio::test]
    async fn test_load_soft_fails_on_malformed_json() {
        let path = temp_file("bad", "[{\"category\": ");
        let loader = ManifestLoader::from_path(&path);
        assert!(loader.try_load().await.is_err());
        assert!(loader.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_soft_fails_on_missing_file() {
        let loader = ManifestLoader::from_path("/nonexistent/catpp/topics.json");
        assert!(matches!(loader.try_load().await, Err(CoreError::Io { .. })));
        assert!(loader.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_from_url() {
        use axum::{routing::get, Router};

        let app = Router::new().route(
            "/topics.json",
            get(|| async { r#"[{"category":"intro","title":"Intro","chapters":["A","B"]}]"# }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let loader = ManifestLoader::new(ManifestSource::Url(format!("http://{addr}/topics.json")));
        let manifest = loader.try_load().await.unwrap();
        assert_eq!(manifest.topics()[0].chapters, ["A", "B"]);

        let missing = ManifestLoader::new(ManifestSource::Url(format!("http://{addr}/missing.json")));
        assert!(matches!(missing.try_load().await, Err(CoreError::Http { .. })));
        assert!(missing.load().await.is_empty());
    }
}
