use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{models::BanInfo, ports::PostServiceError, DomainError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Vec<ValidationDetail>,
    },

    /// Login refused because of an active ban.
    #[error("Account banned")]
    Banned(BanInfo),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ban_info: Option<BanInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Unauthorized(_) | DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::InvalidState(_)
        | DomainError::Conflict(_)
        | DomainError::AlreadyBanned
        | DomainError::NoActiveBan => StatusCode::CONFLICT,
        DomainError::SelfReference(_) => StatusCode::BAD_REQUEST,
        DomainError::TransientStore(_) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::Crypto(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut details = None;
        let mut ban_info = None;

        let (status, error_code, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::Validation {
                message,
                details: fields,
            } => {
                if !fields.is_empty() {
                    details = Some(fields);
                }
                (StatusCode::BAD_REQUEST, "validation_error", message)
            }
            ApiError::Banned(info) => {
                let message = format!("Your account has been banned: {}", info.reason);
                ban_info = Some(info);
                (StatusCode::FORBIDDEN, "banned", message)
            }
            ApiError::Domain(err) => {
                let status = domain_status(&err);
                let message = match &err {
                    DomainError::TransientStore(detail) => {
                        tracing::warn!(error = %detail, "Store unavailable");
                        "The service is temporarily unavailable. Please retry.".to_string()
                    }
                    DomainError::Crypto(detail) => {
                        tracing::error!(error = %detail, "Secure random source failed");
                        "An internal error occurred".to_string()
                    }
                    other => other.to_string(),
                };
                (status, err.code(), message)
            }
            ApiError::BadGateway(msg) => {
                tracing::warn!(error = %msg, "Upstream post service failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "bad_gateway",
                    "The post service could not complete the request".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
            ban_info,
        };

        (status, Json(body)).into_response()
    }
}

impl From<PostServiceError> for ApiError {
    fn from(err: PostServiceError) -> Self {
        ApiError::BadGateway(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        let message = if details.len() == 1 {
            details[0].message.clone()
        } else {
            format!("{} validation errors", details.len())
        };

        ApiError::Validation { message, details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use validator::Validate;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_domain_status_mapping() {
        let cases = [
            (DomainError::not_found("x"), StatusCode::NOT_FOUND),
            (DomainError::Unauthorized("x".into()), StatusCode::FORBIDDEN),
            (DomainError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (DomainError::InvalidState("x".into()), StatusCode::CONFLICT),
            (DomainError::Conflict("x".into()), StatusCode::CONFLICT),
            (DomainError::AlreadyBanned, StatusCode::CONFLICT),
            (DomainError::NoActiveBan, StatusCode::CONFLICT),
            (DomainError::SelfReference("x".into()), StatusCode::BAD_REQUEST),
            (DomainError::TransientStore("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (DomainError::Crypto("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_missing_session_is_401() {
        let response = ApiError::Unauthorized("no session".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_domain_error_body_uses_code() {
        let response = ApiError::from(DomainError::AlreadyBanned).into_response();
        let body = body_json(response).await;
        assert_eq!(body["error"], "already_banned");
    }

    #[tokio::test]
    async fn test_banned_body_carries_ban_info() {
        let response = ApiError::Banned(BanInfo {
            reason: "spam".to_string(),
            banned_at: Utc::now(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_json(response).await;
        assert_eq!(body["error"], "banned");
        assert_eq!(body["ban_info"]["reason"], "spam");
    }

    #[tokio::test]
    async fn test_transient_store_hides_detail() {
        let response = ApiError::from(DomainError::TransientStore("pool timed out".into())).into_response();
        let body = body_json(response).await;
        assert!(!body["message"].as_str().unwrap().contains("pool"));
    }

    #[test]
    fn test_post_service_error_is_bad_gateway() {
        let err: ApiError = PostServiceError::Unreachable("connection refused".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[derive(Validate)]
    struct Probe {
        #[validate(email(message = "Invalid email format"))]
        email: String,
    }

    #[tokio::test]
    async fn test_validation_errors_carry_field_details() {
        let errors = Probe {
            email: "nope".to_string(),
        }
        .validate()
        .unwrap_err();
        let response = ApiError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Invalid email format");
        assert_eq!(body["details"][0]["field"], "email");
    }
}
