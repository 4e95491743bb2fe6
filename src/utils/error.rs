use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("GitHub request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

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

    #[error("Scrape error in '{file}': {reason}")]
    ScrapeError { file: String, reason: String },

    #[error("Pipeline stage '{stage}' failed: {details}")]
    TransformationError { stage: String, details: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Config,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AuditError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuditError::ApiError(_) => ErrorCategory::Network,
            AuditError::CsvError(_)
            | AuditError::SerializationError(_)
            | AuditError::ScrapeError { .. }
            | AuditError::TransformationError { .. }
            | AuditError::ProcessingError { .. } => ErrorCategory::Data,
            AuditError::ConfigValidationError { .. }
            | AuditError::InvalidConfigValueError { .. }
            | AuditError::MissingConfigError { .. } => ErrorCategory::Config,
            AuditError::IoError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路錯誤視為暫時性，下次執行可能成功
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Config => ErrorSeverity::Critical,
            ErrorCategory::Io => ErrorSeverity::High,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AuditError::ApiError(e) => format!("Network request failed: {}", e),
            AuditError::CsvError(e) => format!("The CSV input could not be processed: {}", e),
            AuditError::IoError(e) => format!("File operation failed: {}", e),
            AuditError::SerializationError(e) => format!("JSON data could not be handled: {}", e),
            AuditError::ConfigValidationError { field, message } => {
                format!("Configuration problem in '{}': {}", field, message)
            }
            AuditError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration value for '{}' is invalid: {}", field, reason)
            }
            AuditError::MissingConfigError { field } => {
                format!("Configuration is missing '{}'", field)
            }
            AuditError::ScrapeError { file, reason } => {
                format!("Could not extract data from '{}': {}", file, reason)
            }
            AuditError::TransformationError { stage, details } => {
                format!("Audit stage '{}' failed: {}", stage, details)
            }
            AuditError::ProcessingError { message } => message.clone(),
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self.category() {
            ErrorCategory::Network => {
                "Check your network connection and GitHub's unauthenticated rate limits, then re-run"
                    .to_string()
            }
            ErrorCategory::Data => {
                "Verify the input file matches the expected columns/structure".to_string()
            }
            ErrorCategory::Config => {
                "Fix the configuration file (see configs/audit-example.toml)".to_string()
            }
            ErrorCategory::Io => {
                "Check that the input files exist and the output directory is writable".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_critical() {
        let err = AuditError::MissingConfigError {
            field: "research.targets".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Config);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_data_errors_are_high() {
        let err = AuditError::ProcessingError {
            message: "bad row".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_user_friendly_message_names_field() {
        let err = AuditError::InvalidConfigValueError {
            field: "github.api_base".to_string(),
            value: "not-a-url".to_string(),
            reason: "Invalid URL format".to_string(),
        };
        assert!(err.user_friendly_message().contains("github.api_base"));
    }
}
