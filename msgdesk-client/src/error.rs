//! Client-level error type and the user-facing messages derived from it

use msgdesk_core::{DeskError, ProblemDetail};

use crate::validation::FieldError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Coarse classification used for diagnostics and user messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    BadRequest,
    Server,
    Transport,
    Other,
}

impl ErrorCategory {
    /// Category for an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorCategory::BadRequest,
            401 => ErrorCategory::Unauthorized,
            403 => ErrorCategory::Forbidden,
            404 => ErrorCategory::NotFound,
            409 => ErrorCategory::Conflict,
            500..=599 => ErrorCategory::Server,
            _ => ErrorCategory::Other,
        }
    }
}

/// Errors surfaced by the API client
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Login rejected; never carries server detail
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The session is gone and could not be recovered by a refresh
    #[error("Session expired: {}", problem_text(.problem))]
    SessionExpired { problem: Option<ProblemDetail> },

    #[error("HTTP {status}: {}", problem_text(.problem))]
    Http {
        status: u16,
        problem: Option<ProblemDetail>,
    },

    /// Rejected locally before any request was sent
    #[error("Invalid input: {}", field_errors_text(.errors))]
    InvalidInput { errors: Vec<FieldError> },

    #[error("No response from server: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Core error: {0}")]
    Core(#[from] DeskError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// Create a transport error from any underlying cause
    pub fn transport<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::InvalidCredentials | ApiError::SessionExpired { .. } => {
                ErrorCategory::Unauthorized
            }
            ApiError::Http { status, .. } => ErrorCategory::from_status(*status),
            ApiError::InvalidInput { .. } => ErrorCategory::BadRequest,
            ApiError::Transport { .. } => ErrorCategory::Transport,
            ApiError::Core(DeskError::Network { .. }) => ErrorCategory::Transport,
            ApiError::Core(_) | ApiError::Serialization(_) => ErrorCategory::Other,
        }
    }

    /// HTTP status, when the error came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::InvalidCredentials | ApiError::SessionExpired { .. } => Some(401),
            _ => None,
        }
    }

    pub fn problem(&self) -> Option<&ProblemDetail> {
        match self {
            ApiError::Http { problem, .. } | ApiError::SessionExpired { problem } => {
                problem.as_ref()
            }
            _ => None,
        }
    }

    /// Text suitable for showing to the person at the keyboard
    pub fn user_message(&self) -> String {
        let server_text = self.problem().and_then(|p| p.message()).map(str::to_string);

        match self {
            ApiError::InvalidCredentials => "Invalid username or password.".to_string(),
            ApiError::SessionExpired { .. } => {
                "Your session has expired. Please log in again.".to_string()
            }
            ApiError::InvalidInput { errors } => errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            _ => match self.category() {
                ErrorCategory::Conflict => {
                    "A message with this code already exists. Please use a different code."
                        .to_string()
                }
                ErrorCategory::NotFound => "Message not found. It may have been deleted.".to_string(),
                ErrorCategory::BadRequest => server_text
                    .unwrap_or_else(|| "Invalid input. Please check your data.".to_string()),
                ErrorCategory::Server => "Server error. Please try again later.".to_string(),
                ErrorCategory::Transport => {
                    "Network error. Please check your connection and try again.".to_string()
                }
                ErrorCategory::Forbidden => server_text.unwrap_or_else(|| {
                    "You do not have permission to perform this action.".to_string()
                }),
                ErrorCategory::Unauthorized => {
                    "Your session has expired. Please log in again.".to_string()
                }
                ErrorCategory::Other => server_text.unwrap_or_else(|| {
                    "An unexpected error occurred. Please try again.".to_string()
                }),
            },
        }
    }
}

fn problem_text(problem: &Option<ProblemDetail>) -> &str {
    problem
        .as_ref()
        .and_then(|p| p.message())
        .unwrap_or("no detail")
}

fn field_errors_text(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}
