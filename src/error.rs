use crate::reindex::Stage;
use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum EsgenError {
    #[error("Incomplete {0}")]
    Incomplete(String),

    #[error("Update must carry exactly one of script or doc: {0}")]
    MutuallyExclusive(String),

    #[error("Invalid scroll duration '{0}' (expected <digits> followed by s, m or h)")]
    InvalidScrollDuration(String),

    #[error("Missing index list: {0}")]
    MissingIndexList(String),

    #[error("Index/type expansion of {requested} combinations exceeds max {max}")]
    FanOutTooLarge { requested: usize, max: usize },

    #[error("Engine returned {status}: {body}")]
    Transport { status: StatusCode, body: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task failed: {0}")]
    Task(String),

    #[error("Stage {stage} failed: {source}")]
    StageFailed {
        stage: Stage,
        source: Box<EsgenError>,
    },
}

pub type Result<T> = std::result::Result<T, EsgenError>;

impl From<reqwest::Error> for EsgenError {
    fn from(e: reqwest::Error) -> Self {
        EsgenError::Http(e.to_string())
    }
}

impl From<serde_json::Error> for EsgenError {
    fn from(e: serde_json::Error) -> Self {
        EsgenError::Json(e.to_string())
    }
}

impl From<tokio::task::JoinError> for EsgenError {
    fn from(e: tokio::task::JoinError) -> Self {
        EsgenError::Task(e.to_string())
    }
}

impl EsgenError {
    pub fn incomplete(what: impl Into<String>) -> Self {
        EsgenError::Incomplete(what.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            EsgenError::Incomplete(_) => StatusCode::BAD_REQUEST,
            EsgenError::MutuallyExclusive(_) => StatusCode::BAD_REQUEST,
            EsgenError::InvalidScrollDuration(_) => StatusCode::BAD_REQUEST,
            EsgenError::MissingIndexList(_) => StatusCode::BAD_REQUEST,
            EsgenError::FanOutTooLarge { .. } => StatusCode::BAD_REQUEST,
            EsgenError::Transport { status, .. } => *status,
            EsgenError::Http(_) => StatusCode::BAD_GATEWAY,
            EsgenError::Json(_) => StatusCode::BAD_GATEWAY,
            EsgenError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EsgenError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EsgenError::StageFailed { source, .. } => source.status_code(),
        }
    }

    /// True when the error was raised before any request reached the engine.
    pub fn is_validation(&self) -> bool {
        match self {
            EsgenError::Incomplete(_)
            | EsgenError::MutuallyExclusive(_)
            | EsgenError::InvalidScrollDuration(_)
            | EsgenError::MissingIndexList(_)
            | EsgenError::FanOutTooLarge { .. } => true,
            EsgenError::StageFailed { source, .. } => source.is_validation(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            EsgenError::Transport { status, .. } => *status == StatusCode::NOT_FOUND,
            EsgenError::StageFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}
