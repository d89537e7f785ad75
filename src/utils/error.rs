use crate::domain::model::ExhibitionId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Remote store rejected the request ({status}): {message}")]
    RemoteError { status: u16, message: String },

    #[error("HTTP transport failed: {0}")]
    TransportError(#[from] reqwest::Error),

    #[error("Authentication required to {action}")]
    AuthRequired { action: String },

    #[error("A bookmark toggle for exhibition {exhibition_id} is already in progress")]
    ToggleInProgress { exhibition_id: ExhibitionId },

    #[error("Discarded response for superseded generation {generation}")]
    StaleResponse { generation: u64 },

    #[error("The feed worker has stopped")]
    WorkerStopped,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

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

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Remote,
    Auth,
    Concurrency,
    Config,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FeedError {
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::RemoteError {
            status,
            message: message.into(),
        }
    }

    pub fn auth_required(action: impl Into<String>) -> Self {
        Self::AuthRequired {
            action: action.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RemoteError { .. } | Self::TransportError(_) | Self::SerializationError(_) => {
                ErrorCategory::Remote
            }
            Self::AuthRequired { .. } => ErrorCategory::Auth,
            Self::ToggleInProgress { .. } | Self::StaleResponse { .. } => {
                ErrorCategory::Concurrency
            }
            Self::UrlError(_)
            | Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Config,
            Self::WorkerStopped | Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Concurrency => ErrorSeverity::Low,
            ErrorCategory::Remote | ErrorCategory::Auth => ErrorSeverity::Medium,
            ErrorCategory::Config => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// True for failures worth retrying later without changing anything locally.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TransportError(_) => true,
            Self::RemoteError { status, .. } => *status >= 500 || *status == 429,
            Self::ToggleInProgress { .. } => true,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::RemoteError { status, .. } if *status == 401 || *status == 403 => {
                "Check the store API key and the session access token"
            }
            Self::RemoteError { .. } => "Check the table names and the store URL, then retry",
            Self::TransportError(_) => "Check network connectivity to the store and retry",
            Self::AuthRequired { .. } => "Sign in (pass --access-token or --user-id) and retry",
            Self::ToggleInProgress { .. } => "Wait for the previous bookmark change to finish",
            Self::StaleResponse { .. } => "No action needed",
            Self::WorkerStopped => "Restart the feed",
            Self::IoError(_) => "Check file permissions and paths",
            Self::SerializationError(_) => "The store returned an unexpected payload shape",
            Self::UrlError(_) => "Use an absolute http(s) URL",
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "Fix the configuration file or CLI flags",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::RemoteError { .. } | Self::TransportError(_) => {
                "Could not reach the exhibition store".to_string()
            }
            Self::AuthRequired { .. } => "You need to sign in to manage bookmarks".to_string(),
            Self::ToggleInProgress { .. } => "That bookmark is still being updated".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_and_severity() {
        let err = FeedError::remote(500, "boom");
        assert_eq!(err.category(), ErrorCategory::Remote);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.is_transient());

        let err = FeedError::auth_required("bookmark an exhibition");
        assert_eq!(err.category(), ErrorCategory::Auth);
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "Authentication required to bookmark an exhibition"
        );

        let err = FeedError::MissingConfigError {
            field: "store.url".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_unauthorized_remote_error_suggests_credentials() {
        let err = FeedError::remote(401, "JWT expired");
        assert!(err.recovery_suggestion().contains("API key"));
        assert!(!err.is_transient());
    }
}
