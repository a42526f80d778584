use thiserror::Error;

use crate::flow::FlowTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failures of the return workflow proper. Ineligibility is not an error:
/// rejected returns are expected business outcomes carried in the verdict.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("order {0} was not found")]
    OrderNotFound(String),
    #[error("item `{item_name}` is not part of order {order_id}")]
    ItemNotFound {
        order_id: String,
        item_name: String,
        available: Vec<String>,
    },
    #[error("order directory lookup timed out")]
    LookupTimeout,
    #[error("order directory unavailable: {0}")]
    Directory(String),
    #[error("label issuance failed: {0}")]
    LabelIssuance(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(_)
            | ApplicationError::Workflow(WorkflowError::OrderNotFound(_))
            | ApplicationError::Workflow(WorkflowError::ItemNotFound { .. }) => Self::BadRequest {
                message: "request validation failed".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Workflow(WorkflowError::LookupTimeout)
            | ApplicationError::Workflow(WorkflowError::Directory(_))
            | ApplicationError::Persistence(_)
            | ApplicationError::Integration(_) => Self::ServiceUnavailable {
                message: "a dependent service did not respond".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Workflow(WorkflowError::LabelIssuance(message))
            | ApplicationError::Configuration(message) => Self::Internal {
                message,
                correlation_id: "unassigned".to_owned(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, InterfaceError, WorkflowError};

    #[test]
    fn order_not_found_maps_to_bad_request() {
        let interface = ApplicationError::from(WorkflowError::OrderNotFound("99999".to_owned()))
            .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref correlation_id, .. } if correlation_id == "req-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn lookup_timeout_maps_to_service_unavailable() {
        let interface =
            ApplicationError::from(WorkflowError::LookupTimeout).into_interface("req-2");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn label_issuance_failure_maps_to_internal() {
        let interface = ApplicationError::from(WorkflowError::LabelIssuance(
            "issued without a matching verdict".to_owned(),
        ))
        .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
    }
}
