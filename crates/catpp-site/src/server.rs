/// HTTP routes of the tutorial site.
///
/// - `GET /`: home page
/// - `GET /topics.json`: the manifest, with an ETag
/// - `GET /site.css`: stylesheet
/// - `GET /{category}/{chapter}`: chapter page inside the layout
/// - `POST /{category}/{chapter}/run`: submit playground code and re-render
use std::sync::Arc;

use axum::{
    extract::{Form, Path, Query, State},
    http::{
        header::{CONTENT_TYPE, ETAG, IF_NONE_MATCH},
        HeaderMap, StatusCode,
    },
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use catpp_core::compile::{CompileClient, CompileController, CompileState, ResponseOrdering};
use catpp_core::manifest::{ManifestLoader, TopicManifest};
use catpp_core::page::{chapter_file, ChapterPage};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Config;
use crate::error::AppError;
use crate::render::{self, Frame, STYLESHEET};
use crate::ui::UiQuery;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    loader: ManifestLoader,
    compile: Arc<CompileClient>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let compile = CompileClient::new(config.compile_url.clone(), config.compile_timeout)?;
        Ok(Self {
            loader: ManifestLoader::from_path(config.manifest_path()),
            config: Arc::new(config),
            compile: Arc::new(compile),
        })
    }

    /// Chapter document for `path`, or `None` when the path is not a manifest
    /// route or its file is missing or malformed.
    async fn load_page(&self, manifest: &TopicManifest, path: &str) -> Option<ChapterPage> {
        let chapter = manifest.find_route(path)?;
        let file = chapter_file(&self.config.content_dir, &chapter.topic.category, chapter.chapter);
        ChapterPage::load(&file)
            .await
            .inspect_err(|e| warn!(path, error = %e, "chapter page unavailable"))
            .ok()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/topics.json", get(topics_json))
        .route("/site.css", get(stylesheet))
        .route("/{category}/{chapter}", get(chapter))
        .route("/{category}/{chapter}/run", post(run))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home(State(state): State<AppState>) -> Html<String> {
    let manifest = state.loader.load().await;
    Html(render::home(&manifest).into_string())
}

async fn stylesheet() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}

async fn topics_json(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let path = state.config.manifest_path();
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        warn!(path = %path.display(), error = %e, "manifest file unreadable");
        AppError::NotFound("topics.json".to_string())
    })?;

    let etag = format!("\"{:x}\"", Sha256::digest(&bytes));
    let fresh = headers
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| etag_matches(v, &etag));
    if fresh {
        return Ok((StatusCode::NOT_MODIFIED, [(ETAG, etag)]).into_response());
    }
    Ok((
        [
            (CONTENT_TYPE, "application/json".to_string()),
            (ETAG, etag),
        ],
        bytes,
    )
        .into_response())
}

/// `If-None-Match` uses weak comparison: `*` or any listed tag, `W/` ignored.
fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match.split(',').map(str::trim).any(|tag| {
        tag == "*" || tag.strip_prefix("W/").unwrap_or(tag) == etag
    })
}

fn not_found(frame: &Frame<'_>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(render::not_found(frame).into_string()),
    )
        .into_response()
}

async fn chapter(
    State(state): State<AppState>,
    Path((category, chapter)): Path<(String, String)>,
    Query(query): Query<UiQuery>,
) -> Response {
    let path = format!("/{category}/{chapter}");
    let manifest = state.loader.load().await;
    let (nav, view) = query.resolve(&manifest, &path);
    let frame = Frame {
        manifest: &manifest,
        nav,
        view,
        path: &path,
    };

    match state.load_page(&manifest, &path).await {
        Some(page) => Html(
            render::chapter(&frame, &page, &page.starter_code, &CompileState::default()).into_string(),
        )
        .into_response(),
        None => not_found(&frame),
    }
}

/// Playground submission. UI state rides along as hidden fields.
#[derive(Debug, Deserialize)]
pub struct RunForm {
    #[serde(default)]
    code: String,
    open: Option<usize>,
    sidebar: Option<u8>,
    hint: Option<u8>,
    solution: Option<u8>,
    quiz: Option<u8>,
}

async fn run(
    State(state): State<AppState>,
    Path((category, chapter)): Path<(String, String)>,
    Form(form): Form<RunForm>,
) -> Response {
    let path = format!("/{category}/{chapter}");
    let manifest = state.loader.load().await;
    let query = UiQuery {
        open: form.open,
        sidebar: form.sidebar,
        hint: form.hint,
        solution: form.solution,
        quiz: form.quiz,
        stay: Some(1),
    };
    let (nav, view) = query.resolve(&manifest, &path);
    let frame = Frame {
        manifest: &manifest,
        nav,
        view,
        path: &path,
    };

    let Some(page) = state.load_page(&manifest, &path).await else {
        return not_found(&frame);
    };

    // One page instance per request, so ordering between submissions never comes into play.
    let controller = CompileController::new(Arc::clone(&state.compile), ResponseOrdering::default());
    controller.submit(&form.code).await;
    let compile = controller.snapshot().await;

    Html(render::chapter(&frame, &page, &form.code, &compile).into_string()).into_response()
}
