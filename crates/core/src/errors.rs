use thiserror::Error;

use crate::lifecycle::gateway::GatewayError;
use crate::lifecycle::DUPLICATE_REQUEST;

/// Rule violations. The payload is the message shown to the caller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    /// Text that is safe to hand back to a client.
    pub fn user_message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Unauthorized { message, .. }
            | Self::Forbidden { message, .. }
            | Self::NotFound { message, .. } => message,
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Unauthorized { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Unauthorized { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            // Self-purchase and duplicate requests are reported as bad requests, not 409s.
            ApplicationError::Domain(DomainError::InvalidInput(message))
            | ApplicationError::Domain(DomainError::Conflict(message)) => {
                Self::BadRequest { message, correlation_id }
            }
            ApplicationError::Domain(DomainError::Unauthorized(message)) => {
                Self::Unauthorized { message, correlation_id }
            }
            ApplicationError::Domain(DomainError::Forbidden(message)) => {
                Self::Forbidden { message, correlation_id }
            }
            ApplicationError::Domain(DomainError::NotFound(message)) => {
                Self::NotFound { message, correlation_id }
            }
            ApplicationError::Persistence(message) | ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id }
            }
        }
    }
}

impl From<GatewayError> for ApplicationError {
    fn from(value: GatewayError) -> Self {
        match value {
            GatewayError::DuplicateOpenRequest => {
                Self::Domain(DomainError::Conflict(DUPLICATE_REQUEST.to_owned()))
            }
            GatewayError::Backend(message) => Self::Persistence(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};
    use crate::lifecycle::gateway::GatewayError;

    #[test]
    fn conflict_maps_to_bad_request_with_caller_message() {
        let interface = ApplicationError::from(DomainError::Conflict(
            "You cannot request your own item".to_owned(),
        ))
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref correlation_id, .. } if correlation_id == "req-1"
        ));
        assert_eq!(interface.user_message(), "You cannot request your own item");
    }

    #[test]
    fn forbidden_and_not_found_keep_their_kind() {
        let forbidden =
            ApplicationError::from(DomainError::Forbidden("nope".to_owned())).into_interface("a");
        let missing =
            ApplicationError::from(DomainError::NotFound("gone".to_owned())).into_interface("b");

        assert!(matches!(forbidden, InterfaceError::Forbidden { .. }));
        assert!(matches!(missing, InterfaceError::NotFound { .. }));
        assert_eq!(missing.correlation_id(), "b");
    }

    #[test]
    fn persistence_error_is_redacted_for_callers() {
        let interface = ApplicationError::Persistence("disk I/O error at page 7".to_owned())
            .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
        assert!(interface.to_string().contains("disk I/O error"));
    }

    #[test]
    fn duplicate_gateway_error_becomes_conflict() {
        let error = ApplicationError::from(GatewayError::DuplicateOpenRequest);

        assert_eq!(
            error,
            ApplicationError::Domain(DomainError::Conflict(
                "You already have a pending request for this item".to_owned()
            ))
        );
    }

    #[test]
    fn backend_gateway_error_becomes_persistence_failure() {
        let error = ApplicationError::from(GatewayError::Backend("locked".to_owned()));

        assert_eq!(error, ApplicationError::Persistence("locked".to_owned()));
    }
}
