use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("Cannot run for host type '{0}', expected 'build' or 'release'")]
    HostType(String),

    #[error("No deployment attempts available for release with id {0}")]
    MissingDeployment(u64),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Azure DevOps API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InsightsError>;
