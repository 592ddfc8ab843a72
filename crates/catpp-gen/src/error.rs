use catpp_core::error::CoreError;
use catpp_core::openai::OpenAiClientError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    OpenAi(#[from] OpenAiClientError),

    #[error("model returned invalid {what}: {source}")]
    InvalidOutput {
        what: &'static str,
        #[source]
        source: CoreError,
    },

    #[error("io error writing {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} route(s) have no page file")]
    MissingPages(usize),
}
