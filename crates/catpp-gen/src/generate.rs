/// LLM-backed generation of the topic manifest and chapter pages.
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use catpp_core::error::CoreError;
use catpp_core::manifest::{Topic, TopicManifest};
use catpp_core::openai::OpenAiClient;
use catpp_core::page::{chapter_file, ChapterPage};
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::rate_limit::RateLimiter;

const TEMPERATURE: f32 = 0.0;
const MAX_TOKENS: u32 = 8192;

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\n?|\n?```").expect("valid regex"));

/// Remove markdown code fences the model wraps around JSON despite being told not to.
pub fn strip_fences(text: &str) -> String {
    FENCE.replace_all(text, "").trim().to_string()
}

pub const TOPICS_PROMPT: &str = r#"Generate a JSON array representing a C++ curriculum for memory management.
Each object in the array should have the following structure:
{
  "category": "string (lowercase, hyphen-separated, unique)",
  "title": "string",
  "chapters": ["string", "string", ...]
}
Make sure the generated JSON is valid. Do not include any markdown formatting."#;

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn chapter_prompt(topic: &Topic, chapter: &str) -> String {
    let schema = serde_json::to_string_pretty(&schemars::schema_for!(ChapterPage))
        .unwrap_or_default();
    format!(
        r#"Write a C++ tutorial chapter on "{chapter}" within the topic of "{topic}".

Respond with a single JSON object matching this JSON schema:

{schema}

Content guidelines:
- Engaging and conversational: explain the concept as if to a friend, with humor, analogies and real-world examples. Cats are welcome.
- Clear and concise: break complex ideas into small steps and avoid jargon where possible.
- Start with an introduction, then alternate explanations with well-commented C++ code blocks.
- Wrap inline code inside text in backticks, e.g. `std::endl`.
- The task asks the reader to write a small program; the hint nudges without giving it away; the solution is a complete, compiling program.
- The quiz has one solution per question, in the same order.
- starter_code is a minimal compiling program the reader can edit in the playground.
- Use emojis sparingly.

Make sure the generated JSON is valid. Do not include any markdown formatting."#,
        chapter = capitalize(chapter),
        topic = topic.title,
    )
}

pub struct Generator {
    client: OpenAiClient,
    model: String,
    limiter: Option<RateLimiter>,
}

impl Generator {
    pub fn new(client: OpenAiClient, model: impl Into<String>, limiter: Option<RateLimiter>) -> Self {
        Self {
            client,
            model: model.into(),
            limiter,
        }
    }

    async fn ask(&self, prompt: String) -> Result<String, AppError> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }
        let text = self
            .client
            .complete(&self.model, prompt, Some(TEMPERATURE), Some(MAX_TOKENS))
            .await?;
        Ok(strip_fences(&text))
    }

    /// Ask for a curriculum and validate it as a manifest.
    pub async fn topics(&self) -> Result<TopicManifest, AppError> {
        let text = self.ask(TOPICS_PROMPT.to_string()).await?;
        TopicManifest::from_json(&text).map_err(|source| {
            error!(error = %source, raw = %text, "generated topics are not a valid manifest");
            AppError::InvalidOutput {
                what: "topics",
                source,
            }
        })
    }

    pub async fn chapter(&self, topic: &Topic, chapter: &str) -> Result<ChapterPage, AppError> {
        let text = self.ask(chapter_prompt(topic, chapter)).await?;
        ChapterPage::from_json(&text).map_err(|source| {
            debug!(raw = %text, "raw chapter output");
            AppError::InvalidOutput {
                what: "chapter page",
                source,
            }
        })
    }
}

async fn write_file(path: &Path, contents: String) -> Result<(), AppError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| AppError::Write {
            path: path.display().to_string(),
            source,
        })
}

async fn create_dir(path: &Path) -> Result<(), AppError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| AppError::Write {
            path: path.display().to_string(),
            source,
        })
}

/// Generate `topics.json` under `public_dir`. Nothing is written when the model
/// output does not validate.
pub async fn write_topics(generator: &Generator, public_dir: &Path) -> Result<PathBuf, AppError> {
    let manifest = generator.topics().await?;
    create_dir(public_dir).await?;
    let path = public_dir.join("topics.json");
    write_file(&path, manifest.to_json_pretty()?).await?;
    info!(path = %path.display(), topics = manifest.len(), "topics.json generated");
    Ok(path)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContentReport {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Generate a page per chapter. Existing files are kept unless `force`.
/// A failed chapter is logged and skipped; the run continues.
pub async fn write_content(
    generator: &Generator,
    manifest: &TopicManifest,
    content_dir: &Path,
    only_category: Option<&str>,
    force: bool,
) -> Result<ContentReport, AppError> {
    let mut report = ContentReport::default();
    let topics: Vec<&Topic> = manifest
        .topics()
        .iter()
        .filter(|t| only_category.is_none_or(|c| c == t.category))
        .collect();
    if topics.is_empty() {
        warn!(category = ?only_category, "no matching topics");
    }

    for topic in topics {
        create_dir(&content_dir.join(&topic.category)).await?;
        for chapter in &topic.chapters {
            let path = chapter_file(content_dir, &topic.category, chapter);
            if !force && tokio::fs::try_exists(&path).await.unwrap_or(false) {
                debug!(path = %path.display(), "page exists, skipping");
                report.skipped += 1;
                continue;
            }
            match generate_page(generator, topic, chapter, &path).await {
                Ok(()) => {
                    info!(path = %path.display(), "generated");
                    report.written += 1;
                }
                Err(e) => {
                    warn!(
                        category = %topic.category,
                        chapter = %chapter,
                        error = %e,
                        "chapter generation failed, skipping"
                    );
                    report.failed += 1;
                }
            }
        }
    }
    Ok(report)
}

async fn generate_page(
    generator: &Generator,
    topic: &Topic,
    chapter: &str,
    path: &Path,
) -> Result<(), AppError> {
    let page = generator.chapter(topic, chapter).await?;
    let json = serde_json::to_string_pretty(&page).map_err(CoreError::from)?;
    write_file(path, json).await
}
