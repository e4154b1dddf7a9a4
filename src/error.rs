#[derive(Debug, thiserror::Error)]
pub enum PokePriceError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Upstream {url} returned {status}: {body}")]
    Upstream {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Unexpected response shape from {endpoint}: {detail}")]
    UnexpectedShape { endpoint: String, detail: String },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl PokePriceError {
    /// True for failures caused by the upstream API rather than local state.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            PokePriceError::Http(_)
                | PokePriceError::Upstream { .. }
                | PokePriceError::UnexpectedShape { .. }
                | PokePriceError::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PokePriceError>;
