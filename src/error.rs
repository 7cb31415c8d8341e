use thiserror::Error;

#[derive(Error, Debug)]
pub enum CragError {
    /// Essential geographic input is missing; the feature does not apply to this route.
    #[error("Not applicable: {0}")]
    NotApplicable(String),

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl CragError {
    /// Whether retrying the same request could succeed once upstream data recovers.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CragError::DataUnavailable(_) | CragError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, CragError>;
