use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use stylecoach_services::ai::AiError;
use stylecoach_services::coordinator::AnalyzeError;
use stylecoach_services::dao::base::DaoError;
use stylecoach_services::diarization::DiarizationError;
use stylecoach_services::reporting::ReportError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Conflict(String),
    InvalidState(String),
    Validation(String),
    AiUnavailable(String),
    AiParse(String),
    DiarizationFailed(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::InvalidState(msg) => (StatusCode::CONFLICT, "invalid_state", msg),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "validation", msg),
            ApiError::AiUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "ai_unavailable", msg)
            }
            ApiError::AiParse(msg) => (StatusCode::BAD_GATEWAY, "ai_parse", msg),
            ApiError::DiarizationFailed(msg) => {
                (StatusCode::BAD_GATEWAY, "diarization_failed", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DaoError> for ApiError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            DaoError::DuplicateKey(msg) => ApiError::Conflict(msg),
            DaoError::Validation(msg) => ApiError::Validation(msg),
            DaoError::InvalidState(msg) => ApiError::InvalidState(msg),
            DaoError::Mongo(e) => ApiError::Internal(e.to_string()),
            DaoError::BsonSer(e) => ApiError::Internal(e.to_string()),
            DaoError::BsonDe(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::NotConfigured => ApiError::AiUnavailable(err.to_string()),
            AiError::Parse(msg) => ApiError::AiParse(msg),
            AiError::Request(_) | AiError::Api { .. } | AiError::EmptyResponse => {
                ApiError::AiUnavailable(err.to_string())
            }
        }
    }
}

impl From<AnalyzeError> for ApiError {
    fn from(err: AnalyzeError) -> Self {
        match err {
            AnalyzeError::Dao(e) => e.into(),
            AnalyzeError::Ai(e) => e.into(),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Dao(e) => e.into(),
            ReportError::NoAnalyzableData => ApiError::InvalidState(err.to_string()),
        }
    }
}

impl From<DiarizationError> for ApiError {
    fn from(err: DiarizationError) -> Self {
        match err {
            DiarizationError::NotConfigured => ApiError::AiUnavailable(err.to_string()),
            _ => ApiError::DiarizationFailed(err.to_string()),
        }
    }
}
