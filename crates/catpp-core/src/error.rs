/// Error types shared by the site server and the content generator.
///
/// Binary crates define their own `AppError` and wrap the core errors they propagate.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("http error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate topic category: {0}")]
    DuplicateCategory(String),
}
