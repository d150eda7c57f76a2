use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Directory scan failed: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("SMTP delivery failed: {0}")]
    SmtpError(#[from] lettre::transport::smtp::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value:?}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("No {pattern} files found in {}", dir.display())]
    NoMatchingFiles { dir: PathBuf, pattern: String },

    #[error("Failed to launch {program} for stage '{stage}': {source}")]
    ScriptLaunchError {
        stage: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stage '{stage}' script {script} exited unsuccessfully ({status})")]
    ScriptFailed {
        stage: String,
        script: String,
        status: String,
    },

    #[error("E-mail composition failed: {message}")]
    EmailComposeError { message: String },

    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: Box<PipelineError>,
    },
}

/// 錯誤分類，對應執行流程中的失敗來源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Subprocess,
    Delivery,
    FileSystem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PipelineError {
    pub fn config(message: impl Into<String>) -> Self {
        PipelineError::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::ConfigError { .. }
            | PipelineError::MissingConfigError { .. }
            | PipelineError::InvalidConfigValueError { .. }
            | PipelineError::NoMatchingFiles { .. } => ErrorCategory::Configuration,
            PipelineError::ScriptLaunchError { .. } | PipelineError::ScriptFailed { .. } => {
                ErrorCategory::Subprocess
            }
            PipelineError::SmtpError(_) | PipelineError::EmailComposeError { .. } => {
                ErrorCategory::Delivery
            }
            PipelineError::ZipError(_) | PipelineError::IoError(_) | PipelineError::WalkError(_) => {
                ErrorCategory::FileSystem
            }
            PipelineError::StageFailed { source, .. } => source.category(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Subprocess => ErrorSeverity::High,
            ErrorCategory::Delivery => ErrorSeverity::Medium,
            ErrorCategory::FileSystem => ErrorSeverity::Critical,
        }
    }

    /// 程序結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    /// 取得最內層的錯誤（略過 StageFailed 包裝）
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PipelineError::StageFailed { stage, source } => {
                format!("Pipeline aborted in stage '{}': {}", stage, source.user_friendly_message())
            }
            PipelineError::MissingConfigError { field } => {
                format!("Required setting '{}' was not provided", field)
            }
            PipelineError::NoMatchingFiles { dir, pattern } => {
                format!("Nothing to send: no {} files in {}", pattern, dir.display())
            }
            PipelineError::ScriptFailed { stage, script, status } => {
                format!("The {} script ({}) failed: {}", stage, script, status)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.root() {
            PipelineError::MissingConfigError { .. } => {
                "Pass the missing option on the command line or set it in the config file"
            }
            PipelineError::InvalidConfigValueError { .. } | PipelineError::ConfigError { .. } => {
                "Check the option values (environment overrides must be KEY=value)"
            }
            PipelineError::NoMatchingFiles { .. } => {
                "Check that the render script wrote figures into the figure directory"
            }
            PipelineError::ScriptLaunchError { .. } => {
                "Check the interpreter path (--python) and that the script exists"
            }
            PipelineError::ScriptFailed { .. } => "Inspect the script output above and rerun",
            PipelineError::SmtpError(_) => {
                "Verify the SMTP host, port and credential"
            }
            PipelineError::EmailComposeError { .. } => "Check sender and recipient addresses",
            _ => "Check file permissions and free disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
