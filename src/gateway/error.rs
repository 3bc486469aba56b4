use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use crate::broker::broker_errors;
use crate::error::Error;

pub const NO_TOKEN_MESSAGE: &str = "no token provided";
pub const NOT_ALLOWED_MESSAGE: &str = "not allowed to read secret with this token";

impl Error {
    /// Status and caller-facing message for this error kind.
    pub fn public_parts(&self) -> (StatusCode, String) {
        match self {
            Error::MissingToken => (StatusCode::BAD_REQUEST, NO_TOKEN_MESSAGE.to_string()),
            Error::Unauthorized => (StatusCode::FORBIDDEN, NOT_ALLOWED_MESSAGE.to_string()),
            Error::NotFound { .. } => (StatusCode::NOT_FOUND, "secret not found".to_string()),
            Error::BrokerRejected { body, .. } => {
                let message = match broker_errors(body) {
                    Some(reason) => format!("credential rejected by broker: {reason}"),
                    None => "credential rejected by broker".to_string(),
                };
                (StatusCode::FORBIDDEN, message)
            }
            Error::MalformedCredential(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "malformed identity credential".to_string(),
            ),
            Error::Io { .. } => (
                StatusCode::NOT_FOUND,
                "identity credential unavailable".to_string(),
            ),
            Error::Network(_) => (
                StatusCode::BAD_GATEWAY,
                "secret broker unavailable".to_string(),
            ),
            Error::Protocol(_) => (
                StatusCode::BAD_GATEWAY,
                "unexpected response from secret broker".to_string(),
            ),
            Error::TrustBundle { .. } | Error::ClientBuild(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "gateway is misconfigured".to_string(),
            ),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = self.public_parts();

        // Details stay in the log; callers only see the public message.
        match &self {
            Error::Io { .. }
            | Error::MalformedCredential(_)
            | Error::Protocol(_)
            | Error::TrustBundle { .. }
            | Error::ClientBuild(_) => {
                error!(error = %self, status = status.as_u16(), "Request failed")
            }
            _ => warn!(error = %self, status = status.as_u16(), "Request failed"),
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_kind_has_distinct_message() {
        let errors = [
            Error::MissingToken,
            Error::Unauthorized,
            Error::NotFound { path: "p".into() },
            Error::BrokerRejected {
                status: StatusCode::FORBIDDEN,
                body: String::new(),
            },
            Error::MalformedCredential("x".into()),
            Error::io("/t", std::io::Error::from(std::io::ErrorKind::NotFound)),
            Error::Network("x".into()),
            Error::Protocol("x".into()),
            Error::TrustBundle {
                path: "/ca.crt".into(),
                reason: "x".into(),
            },
        ];
        let mut messages: Vec<String> = errors.iter().map(|e| e.public_parts().1).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), errors.len());
    }

    #[test]
    fn test_rejection_surfaces_broker_reason() {
        let err = Error::BrokerRejected {
            status: StatusCode::BAD_REQUEST,
            body: r#"{"errors":["invalid role name \"demo\""]}"#.into(),
        };
        let (status, message) = err.public_parts();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(message, "credential rejected by broker: invalid role name \"demo\"");
    }

    #[test]
    fn test_network_detail_not_exposed() {
        let err = Error::Network("dial tcp 10.0.0.7:8200: connection refused".into());
        let (status, message) = err.public_parts();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!message.contains("10.0.0.7"));
    }
}
