use crate::api::ApiResponse;
use axum::{http::StatusCode, response::Json};
use tracing::{error, info, warn};

/// Model output that could not be read as JSON after fence stripping.
#[derive(Debug, thiserror::Error)]
#[error("model output is not valid JSON: {source}")]
pub struct ParseError {
    pub extracted: String,
    #[source]
    pub source: serde_json::Error,
}

/// Failures of the quiz pipeline, before they are mapped to HTTP.
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("Unsupported quiz format: '{0}'")]
    UnsupportedFormat(String),

    #[error("{0}")]
    Validation(String),

    #[error("LLM request failed: {0}")]
    Generation(#[source] anyhow::Error),

    #[error("LLM returned malformed output: {0}")]
    MalformedOutput(#[from] ParseError),

    #[error("Quiz history storage failed: {0}")]
    Storage(#[source] anyhow::Error),
}

/// Centralized error types for consistent API error handling
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] anyhow::Error),

    #[error("LLM service error: {0}")]
    LLMError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
    pub user_friendly_message: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
            user_friendly_message: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn with_user_message(mut self, message: &str) -> Self {
        self.user_friendly_message = Some(message.to_string());
        self
    }
}

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::UnsupportedFormat(_) => ApiError::BadRequest(err.to_string()),
            QuizError::Validation(message) => ApiError::ValidationError(message),
            QuizError::Generation(_) => ApiError::LLMError(err.to_string()),
            QuizError::MalformedOutput(_) => ApiError::InternalError(err.to_string()),
            QuizError::Storage(source) => ApiError::DatabaseError(source),
        }
    }
}

impl ApiError {
    /// Convert API error to HTTP response with consistent structure and logging
    pub fn to_response_with_context(
        self,
        context: ErrorContext,
    ) -> (StatusCode, Json<ApiResponse<()>>) {
        match &self {
            ApiError::NotFound(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Resource not found"
                );
                (
                    StatusCode::NOT_FOUND,
                    Json(ApiResponse::error(
                        context
                            .user_friendly_message
                            .unwrap_or_else(|| format!("{} not found", context.resource_type)),
                    )),
                )
            }
            ApiError::ValidationError(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Validation error"
                );
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::BadRequest(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Bad request"
                );
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::LLMError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "LLM service error"
                );
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(ApiResponse::error(
                        context.user_friendly_message.unwrap_or_else(|| {
                            "AI service temporarily unavailable. Please try again.".to_string()
                        }),
                    )),
                )
            }
            ApiError::DatabaseError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Database error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(
                        "Database operation failed. Please try again.".to_string(),
                    )),
                )
            }
            ApiError::InternalError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Internal server error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(
                        context.user_friendly_message.unwrap_or_else(|| {
                            "An internal error occurred. Please try again.".to_string()
                        }),
                    )),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_error() -> ParseError {
        let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        ParseError {
            extracted: "not json".to_string(),
            source,
        }
    }

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("generate_quiz", "quiz")
            .with_id("42")
            .with_user_message("Custom message");

        assert_eq!(context.operation, "generate_quiz");
        assert_eq!(context.resource_type, "quiz");
        assert_eq!(context.resource_id, Some("42".to_string()));
        assert_eq!(
            context.user_friendly_message,
            Some("Custom message".to_string())
        );
    }

    #[test]
    fn test_quiz_error_status_mapping() {
        let cases = vec![
            (QuizError::UnsupportedFormat("essay".to_string()), StatusCode::BAD_REQUEST),
            (QuizError::Validation("missing question".to_string()), StatusCode::BAD_REQUEST),
            (
                QuizError::Generation(anyhow::anyhow!("connection reset")),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (QuizError::MalformedOutput(parse_error()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                QuizError::Storage(anyhow::anyhow!("database is locked")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (quiz_error, expected) in cases {
            let context = ErrorContext::new("generate_quiz", "quiz");
            let (status, _) = ApiError::from(quiz_error).to_response_with_context(context);
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_api_error_responses() {
        let error = ApiError::NotFound("Quiz not found".to_string());
        let context = ErrorContext::new("get_quiz", "quiz").with_id("7");
        let (status, _response) = error.to_response_with_context(context);
        assert_eq!(status, StatusCode::NOT_FOUND);

        let error = ApiError::DatabaseError(anyhow::anyhow!("disk I/O error"));
        let (status, _) = error.to_response_with_context(ErrorContext::new("get_quiz_history", "quiz"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unsupported_format_message_names_the_format() {
        let message = QuizError::UnsupportedFormat("essay".to_string()).to_string();
        assert!(message.contains("'essay'"));
    }
}
