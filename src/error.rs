use thiserror::Error;

/// Engine error types.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Insufficient data for {context}: need {required} candles, have {available}")]
    InsufficientData {
        context: String,
        required: usize,
        available: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl EngineError {
    /// Shorthand for an insufficient data error.
    pub fn insufficient(context: impl Into<String>, required: usize, available: usize) -> Self {
        EngineError::InsufficientData {
            context: context.into(),
            required,
            available,
        }
    }

    /// Whether the caller can recover by requesting more history.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, EngineError::InsufficientData { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
