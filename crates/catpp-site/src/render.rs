/// HTML rendering. Every page except home is wrapped in the layout
/// (navbar, sidebar, main column).
use catpp_core::compile::{CompileState, ResultView};
use catpp_core::manifest::TopicManifest;
use catpp_core::navigation::{sidebar, NavigationState, UiEvent};
use catpp_core::page::{Block, ChapterPage, PageViewState};
use catpp_core::shortcut::SUBMIT_SHORTCUT;
use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::ui::{event_href, navigate_href};

pub const STYLESHEET: &str = include_str!("../assets/site.css");

/// Everything the layout needs to know about the current request.
pub struct Frame<'a> {
    pub manifest: &'a TopicManifest,
    pub nav: NavigationState,
    pub view: PageViewState,
    pub path: &'a str,
}

impl Frame<'_> {
    fn event_href(&self, event: UiEvent) -> String {
        event_href(self.path, &self.nav, &self.view, event)
    }
}

fn document(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                link rel="stylesheet" href="/site.css";
            }
            body { (body) }
        }
    }
}

pub fn home(manifest: &TopicManifest) -> Markup {
    document(
        "CAT++",
        html! {
            div.home {
                h1 { "Welcome to CAT++" }
                p.tagline { "Learn C++ with memes and cats!" }
                div.mascot { "🐈" }
                @if let Some(route) = manifest.first_route() {
                    a.get-started href=(route) { "Get Started" }
                }
            }
        },
    )
}

fn navbar(frame: &Frame<'_>) -> Markup {
    let open = frame.nav.is_mobile_sidebar_open();
    html! {
        nav.navbar {
            a.brand href="/" {
                span.logo { "🐱" }
                h1 { "Purrfect Code, Purrfect Life" }
            }
            a.hamburger href=(frame.event_href(UiEvent::ToggleSidebar))
                aria-label=(if open { "Close menu" } else { "Open menu" }) {
                @if open { "✕" } @else { "☰" }
            }
        }
    }
}

fn sidebar_nav(frame: &Frame<'_>) -> Markup {
    html! {
        aside.sidebar.open[frame.nav.is_mobile_sidebar_open()] {
            nav {
                @for topic in sidebar(frame.manifest, &frame.nav, frame.path) {
                    div.topic {
                        a.topic-header href=(frame.event_href(UiEvent::ToggleTopic(topic.index))) {
                            h2 { (topic.title) }
                            span.chevron { @if topic.expanded { "▲" } @else { "▼" } }
                        }
                        @if topic.expanded {
                            ul.chapters {
                                @for chapter in &topic.chapters {
                                    li.active[chapter.active] {
                                        a href=(navigate_href(&chapter.route, &frame.nav)) { (chapter.title) }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn layout(frame: &Frame<'_>, title: &str, main: Markup) -> Markup {
    document(
        title,
        html! {
            (navbar(frame))
            div.shell {
                (sidebar_nav(frame))
                main.content { (main) }
            }
        },
    )
}

/// Text with `backtick` spans rendered as inline code.
fn inline_text(text: &str) -> Markup {
    html! {
        @for (i, part) in text.split('`').enumerate() {
            @if i % 2 == 1 { code.inline { (part) } } @else { (part) }
        }
    }
}

fn code_block(source: &str) -> Markup {
    html! { pre.code { code.language-cpp { (source) } } }
}

fn render_block(block: &Block) -> Markup {
    match block {
        Block::Heading { text } => html! { h2 { (text) } },
        Block::Paragraph { text } => html! { p { (inline_text(text)) } },
        Block::Code { code } => code_block(code),
        Block::List { items } => html! {
            ul { @for item in items { li { (inline_text(item)) } } }
        },
    }
}

fn result_region(state: &CompileState) -> Markup {
    let inner = match state.view() {
        ResultView::Idle => html! {},
        ResultView::Loading => html! { p.loading { "Running..." } },
        ResultView::Completed { output, error } => html! {
            @if !output.is_empty() { pre.output { (output) } }
            @if !error.is_empty() { pre.error { (error) } }
        },
        ResultView::Failed { message, timed_out } => html! {
            p.error.timeout[timed_out] { (message) }
        },
    };
    html! { div.result { (inner) } }
}

fn shortcut_script() -> String {
    format!(
        r#"(function () {{
  var form = document.getElementById("playground");
  if (!form) return;
  function onKeyDown(event) {{
    if ({condition}) {{
      event.preventDefault();
      form.requestSubmit();
    }}
  }}
  window.addEventListener("keydown", onKeyDown);
  window.addEventListener("pagehide", function () {{
    window.removeEventListener("keydown", onKeyDown);
  }});
}})();"#,
        condition = SUBMIT_SHORTCUT.js_condition()
    )
}

fn playground(frame: &Frame<'_>, code: &str, compile: &CompileState) -> Markup {
    let action = format!("{}/run", frame.path);
    html! {
        section.playground {
            h2 { "Try it yourself" }
            form id="playground" method="post" action=(action) {
                @if let Some(open) = frame.nav.expanded_topic() {
                    input type="hidden" name="open" value=(open);
                }
                @if frame.nav.is_mobile_sidebar_open() { input type="hidden" name="sidebar" value="1"; }
                @if frame.view.show_hint { input type="hidden" name="hint" value="1"; }
                @if frame.view.show_solution { input type="hidden" name="solution" value="1"; }
                @if frame.view.show_quiz_solution { input type="hidden" name="quiz" value="1"; }
                textarea name="code" rows="14" spellcheck="false" { (code) }
                button type="submit" { "Run (Ctrl+Enter)" }
            }
            (result_region(compile))
            script { (PreEscaped(shortcut_script())) }
        }
    }
}

/// Chapter page. `code` is the playground content: the starter code on first
/// render, the submitted code after a run.
pub fn chapter(frame: &Frame<'_>, page: &ChapterPage, code: &str, compile: &CompileState) -> Markup {
    let heading = format!("{}: {}", page.title, page.subtitle);
    let view = frame.view;
    let body = html! {
        article.chapter {
            h1 { (heading) }
            @for block in &page.blocks { (render_block(block)) }

            h2 { "Task: " (page.task.title) }
            p { (inline_text(&page.task.description)) }
            div.buttons {
                a.button.hint href=(frame.event_href(UiEvent::ToggleHint)) {
                    @if view.show_hint { "Hide Hint" } @else { "Show Hint" }
                }
                a.button.solution href=(frame.event_href(UiEvent::ToggleSolution)) {
                    @if view.show_solution { "Hide Solution" } @else { "Show Solution" }
                }
            }
            @if view.show_hint {
                p.hint { "Hint: " (inline_text(&page.task.hint)) }
            }
            @if view.show_solution { (code_block(&page.task.solution)) }

            h2 { "Quiz Time!" }
            ul.quiz { @for question in &page.quiz.questions { li { (inline_text(question)) } } }
            a.button.solution href=(frame.event_href(UiEvent::ToggleQuizSolution)) {
                @if view.show_quiz_solution { "Hide Solutions" } @else { "Show Solutions" }
            }
            @if view.show_quiz_solution {
                div.quiz-solutions { @for solution in &page.quiz.solutions { p { (inline_text(solution)) } } }
            }
        }
        (playground(frame, code, compile))
    };
    layout(frame, &heading, body)
}

pub fn not_found(frame: &Frame<'_>) -> Markup {
    layout(
        frame,
        "Page not found",
        html! {
            article.chapter {
                h1 { "Page not found" }
                p { "This chapter does not exist (yet). Pick one from the sidebar." }
                a href="/" { "Back home" }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_code_spans() {
        let html = inline_text("use `new` and <b>").into_string();
        assert_eq!(html, "use <code class=\"inline\">new</code> and &lt;b&gt;");
    }

    #[test]
    fn test_idle_result_region_is_empty() {
        let idle = result_region(&CompileState::default()).into_string();
        assert_eq!(idle, "<div class=\"result\"></div>");
    }

    #[test]
    fn test_shortcut_script_uses_submit_combo() {
        let script = shortcut_script();
        assert!(script.contains(r#"event.ctrlKey && event.key === "Enter""#));
        assert!(script.contains("removeEventListener"));
    }

    #[test]
    fn test_home_without_topics_has_no_start_link() {
        let html = home(&TopicManifest::default()).into_string();
        assert!(html.contains("Welcome to CAT++"));
        assert!(!html.contains("Get Started"));
    }
}
