use thiserror::Error;

pub type SheetResult<T> = Result<T, SheetError>;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sheet has no header row: {0}")]
    MissingHeader(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Failure raised by a registered function while computing a cell.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("invalid value '{value}' for '{param}': {reason}")]
    InvalidArgument {
        param: String,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Failed(String),
}

impl CallError {
    pub fn invalid(
        param: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CallError::InvalidArgument {
            param: param.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
