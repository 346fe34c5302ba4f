use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    /// The request is malformed and was rejected before any engine call.
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("Unsupported filter operator '{operation}' on field '{field}'")]
    UnsupportedFilterOperator { field: String, operation: String },

    #[error("Highlight marker must not be empty")]
    MissingHighlightMarker,

    /// The engine returned highlight text that does not match the single
    /// whole-field fragment the query asked for.
    #[error("Unexpected highlight fragments: {0}")]
    UnexpectedFragmentCount(String),

    #[error("Invalid mapping: {0}")]
    Mapping(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Engine communication failed: {message}")]
    EngineCommunication {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Engine rejected request{}: {reason}", status_suffix(.status))]
    EngineResponse { status: Option<u16>, reason: String },

    /// A bulk write reported failures. `detail` is the engine's own failure
    /// payload, passed through untouched.
    #[error("Bulk write failed for {failed} of {total} documents")]
    EngineWrite {
        failed: usize,
        total: usize,
        detail: serde_json::Value,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl Error {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Error::Validation(msg.into())
    }

    pub fn mapping<S: Into<String>>(msg: S) -> Self {
        Error::Mapping(msg.into())
    }

    pub fn engine_response<S: Into<String>>(reason: S) -> Self {
        Error::EngineResponse { status: None, reason: reason.into() }
    }

    pub fn engine_status<S: Into<String>>(status: u16, reason: S) -> Self {
        Error::EngineResponse { status: Some(status), reason: reason.into() }
    }

    pub fn communication<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Error::EngineCommunication { message: message.into(), source: Some(source.into()) }
    }

    /// True for the engine's "index does not exist" answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::EngineResponse { status: Some(404), .. })
    }
}
