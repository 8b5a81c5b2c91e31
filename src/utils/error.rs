use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid version '{value}': {reason}")]
    VersionParseError { value: String, reason: String },

    #[error("Invalid requirement on line {line}: {reason}")]
    RequirementParseError { line: usize, reason: String },

    #[error("Invalid deliverable '{project}': {message}")]
    DeliverableError { project: String, message: String },

    #[error("HTTP {status} while fetching {url}")]
    HttpStatusError { url: String, status: u16 },

    #[error("Task environment '{env}' is invalid: {message}")]
    TaskDefinitionError { env: String, message: String },

    #[error("Command `{command}` in environment '{env}' exited with code {code}")]
    TaskFailedError {
        env: String,
        command: String,
        code: i32,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    Processing,
    Output,
    Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl StatusError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            StatusError::ConfigError { .. }
            | StatusError::ConfigValidationError { .. }
            | StatusError::InvalidConfigValueError { .. }
            | StatusError::MissingConfigError { .. } => ErrorCategory::Configuration,
            StatusError::YamlError(_)
            | StatusError::VersionParseError { .. }
            | StatusError::RequirementParseError { .. }
            | StatusError::DeliverableError { .. } => ErrorCategory::Input,
            StatusError::ApiError(_) | StatusError::HttpStatusError { .. } => {
                ErrorCategory::Network
            }
            StatusError::IoError(_) | StatusError::CsvError(_) => ErrorCategory::Output,
            StatusError::TaskDefinitionError { .. } | StatusError::TaskFailedError { .. } => {
                ErrorCategory::Task
            }
            StatusError::SerializationError(_)
            | StatusError::ProcessingError { .. }
            | StatusError::ValidationError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路錯誤可以重試
            StatusError::ApiError(_) | StatusError::HttpStatusError { .. } => {
                ErrorSeverity::Medium
            }
            StatusError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// 子程序失敗時保留原始退出碼，其餘依嚴重程度決定
    pub fn exit_code(&self) -> i32 {
        if let StatusError::TaskFailedError { code, .. } = self {
            return *code;
        }
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the command line arguments, environment variables and --config file"
            }
            ErrorCategory::Input => {
                "Make sure the releases, requirements and rpm-packaging checkouts are up to date"
            }
            ErrorCategory::Network => {
                "Check the OBS published URL and your network connection, then retry"
            }
            ErrorCategory::Processing => "Re-run with --verbose to see which project failed",
            ErrorCategory::Output => "Check that the output path is writable and the disk is not full",
            ErrorCategory::Task => "Inspect tasks.toml and the failing command's output above",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            StatusError::ConfigError { message } => format!("Configuration problem: {}", message),
            StatusError::MissingConfigError { field } => {
                format!("'{}' is required but was not provided", field)
            }
            StatusError::TaskFailedError { env, code, .. } => {
                format!("Environment '{}' failed (exit code {})", env, code)
            }
            StatusError::HttpStatusError { url, status } => {
                format!("Could not download {} (HTTP {})", url, status)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StatusError>;
