/// Chapter page documents and per-page view state.
///
/// A chapter is stored as `{content_dir}/{category}/{slug}.json`, produced by the
/// generator and rendered by the site.
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::navigation::UiEvent;
use crate::slug::format_chapter_path;

/// One tutorial chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChapterPage {
    /// Chapter title, e.g. "Pointers and Addresses"
    pub title: String,
    /// Catchy subtitle shown after the title
    pub subtitle: String,
    /// Lesson body in reading order
    pub blocks: Vec<Block>,
    /// Hands-on exercise
    pub task: Task,
    /// Closing quiz
    pub quiz: Quiz,
    /// Code pre-filled into the playground. Empty means an empty editor.
    #[serde(default)]
    pub starter_code: String,
}

/// A piece of lesson content. Inline code inside text is wrapped in backticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading { text: String },
    Paragraph { text: String },
    Code { code: String },
    List { items: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Task {
    pub title: String,
    pub description: String,
    pub hint: String,
    /// Complete C++ program solving the task
    pub solution: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Quiz {
    pub questions: Vec<String>,
    pub solutions: Vec<String>,
}

impl ChapterPage {
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CoreError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&raw)
    }
}

/// On-disk location of a chapter's page document.
pub fn chapter_file(content_dir: &Path, category: &str, chapter_title: &str) -> PathBuf {
    content_dir
        .join(category)
        .join(format!("{}.json", format_chapter_path(chapter_title)))
}

/// Hint / solution / quiz-solution visibility of one page instance.
/// Starts all hidden and is discarded when the page goes away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageViewState {
    pub show_hint: bool,
    pub show_solution: bool,
    pub show_quiz_solution: bool,
}

impl PageViewState {
    pub fn toggle_hint(&mut self) {
        self.show_hint = !self.show_hint;
    }

    pub fn toggle_solution(&mut self) {
        self.show_solution = !self.show_solution;
    }

    pub fn toggle_quiz_solution(&mut self) {
        self.show_quiz_solution = !self.show_quiz_solution;
    }

    /// Apply a page event; navigation events are ignored.
    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::ToggleHint => self.toggle_hint(),
            UiEvent::ToggleSolution => self.toggle_solution(),
            UiEvent::ToggleQuizSolution => self.toggle_quiz_solution(),
            UiEvent::ToggleTopic(_) | UiEvent::ToggleSidebar => {}
        }
    }
}
