use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use campusmart_core::errors::{ApplicationError, InterfaceError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub correlation_id: String,
}

/// Handler error. Every variant renders as `{message, correlation_id}`.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

impl ApiError {
    pub fn application(error: ApplicationError, correlation_id: &str) -> Self {
        let interface = error.into_interface(correlation_id);
        match &interface {
            InterfaceError::Internal { message, .. } => error!(
                event_name = "http.request.failed",
                correlation_id = %correlation_id,
                error = %message,
                "request failed with an internal error"
            ),
            other => warn!(
                event_name = "http.request.rejected",
                correlation_id = %correlation_id,
                reason = %other.user_message(),
                "request rejected"
            ),
        }
        Self(interface)
    }

    pub fn bad_request(message: impl Into<String>, correlation_id: &str) -> Self {
        Self(InterfaceError::BadRequest {
            message: message.into(),
            correlation_id: correlation_id.to_owned(),
        })
    }

    pub fn unauthorized(message: impl Into<String>, correlation_id: &str) -> Self {
        Self(InterfaceError::Unauthorized {
            message: message.into(),
            correlation_id: correlation_id.to_owned(),
        })
    }

    pub fn not_found(message: impl Into<String>, correlation_id: &str) -> Self {
        Self(InterfaceError::NotFound {
            message: message.into(),
            correlation_id: correlation_id.to_owned(),
        })
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.0.user_message().to_owned(),
            correlation_id: self.0.correlation_id().to_owned(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = format!("Invalid request data: {}", rejection.body_text());
        Self::bad_request(message, &new_correlation_id())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        let message = format!("Invalid request data: {}", rejection.body_text());
        Self::bad_request(message, &new_correlation_id())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        let message = format!("Invalid request data: {}", rejection.body_text());
        Self::bad_request(message, &new_correlation_id())
    }
}

/// Renders missing field names the way clients of this API already parse them:
/// `Missing required fields: ['item_id', 'buyer_id']`.
pub fn missing_fields(fields: &[&str]) -> String {
    let quoted: Vec<String> = fields.iter().map(|field| format!("'{field}'")).collect();
    format!("Missing required fields: [{}]", quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};
    use campusmart_core::errors::{ApplicationError, DomainError};

    use super::{missing_fields, ApiError};

    async fn render(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn forbidden_domain_error_renders_403_with_correlation_id() {
        let error = ApiError::application(
            ApplicationError::from(DomainError::Forbidden("not yours".to_owned())),
            "corr-1",
        );

        let (status, body) = render(error).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "not yours");
        assert_eq!(body["correlation_id"], "corr-1");
    }

    #[tokio::test]
    async fn persistence_failure_is_redacted() {
        let error = ApiError::application(
            ApplicationError::Persistence("database is locked".to_owned()),
            "corr-2",
        );

        let (status, body) = render(error).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An unexpected internal error occurred.");
    }

    #[test]
    fn missing_fields_lists_names_in_order() {
        assert_eq!(
            missing_fields(&["item_id", "buyer_id"]),
            "Missing required fields: ['item_id', 'buyer_id']"
        );
    }
}
