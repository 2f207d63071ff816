use thiserror::Error;

#[derive(Error, Debug)]
pub enum RtmError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("{message}")]
    AuthenticationError { message: String },

    #[error("{message}")]
    WorkflowError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

/// 錯誤嚴重程度，決定 CLI 的退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RtmError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RtmError::ApiError(_) => ErrorSeverity::Medium,
            RtmError::AuthenticationError { .. } => ErrorSeverity::Medium,
            RtmError::WorkflowError { .. } | RtmError::ProcessingError { .. } => {
                ErrorSeverity::High
            }
            RtmError::ValidationError { .. } => ErrorSeverity::High,
            RtmError::UrlError(_)
            | RtmError::ConfigError { .. }
            | RtmError::ConfigValidationError { .. }
            | RtmError::InvalidConfigValueError { .. }
            | RtmError::MissingConfigError { .. } => ErrorSeverity::High,
            RtmError::IoError(_) | RtmError::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RtmError::ApiError(_) => "Check that the RTM API is reachable at the configured base_url",
            RtmError::AuthenticationError { .. } => {
                "Verify the login email and password (RTM_EMAIL / RTM_PASSWORD)"
            }
            RtmError::UrlError(_) => "Use a full http(s) URL for api.base_url",
            RtmError::ConfigError { .. }
            | RtmError::ConfigValidationError { .. }
            | RtmError::InvalidConfigValueError { .. }
            | RtmError::MissingConfigError { .. } => "Review the TOML config and CLI flags",
            RtmError::ValidationError { .. } => {
                "Make sure the CSV has a header row and at least one row with a Patient ID"
            }
            RtmError::WorkflowError { .. } | RtmError::ProcessingError { .. } => {
                "Inspect the exported log file for the failing step"
            }
            RtmError::IoError(_) => "Check file paths and permissions",
            RtmError::SerializationError(_) => "The API returned data that could not be encoded",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RtmError::ApiError(e) if e.is_timeout() => "The RTM API did not respond in time".to_string(),
            RtmError::ApiError(e) if e.is_connect() => "Could not connect to the RTM API".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RtmError>;
